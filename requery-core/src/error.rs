//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum RequeryError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// An action index outside of the catalogue.
    #[error("Action index {index} is out of range for {count} actions")]
    InvalidAction {
        /// The offending index.
        index: usize,
        /// The number of actions in the catalogue.
        count: usize,
    },

    /// `step()` was called before `reset()`.
    #[error("The environment has not been reset")]
    NotReset,

    /// `step()` was called after the episode ended.
    #[error("The episode already ended at step {0}")]
    EpisodeDone(usize),

    /// The catalogue has no identity action.
    #[error("The action catalogue has no no-op action")]
    MissingIdentityAction,

    /// A corpus without any document.
    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),
}
