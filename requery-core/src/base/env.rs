//! Environment.
use super::Step;
use crate::{record::Record, EpisodeState};
use anyhow::Result;

/// Represents an episodic query rewriting environment.
///
/// An episode starts with [`Env::reset`] on a user query and ends when the returned
/// [`Step`] reports `is_done`. Calling [`Env::step`] after that is an error.
pub trait Env {
    /// Information in the [`Step`] object.
    type Info: super::Info;

    /// Starts an episode from `query` and returns the initial state.
    fn reset(&mut self, query: &str) -> Result<EpisodeState>;

    /// Applies the action with index `act` to `state.current_query`.
    ///
    /// The returned [`Record`] holds values useful for logging, e.g. reward terms.
    fn step(&mut self, state: &EpisodeState, act: usize) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// The number of steps after which an episode ends.
    fn max_steps(&self) -> usize;
}
