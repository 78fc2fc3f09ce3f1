#![warn(missing_docs)]
//! Core traits and types for learning query rewrites with reinforcement learning.
//!
//! An episode starts from a user query. At each step an [`Agent`] picks one entry of a
//! fixed [`ActionCatalogue`], an [`Env`] applies it, asks a retrieval engine how the
//! rewritten query ranks, and returns a shaped reward together with the next
//! [`EpisodeState`]. The [`Trainer`] drives these episodes, hands every [`Trajectory`]
//! to the agent and checkpoints the learned parameters.
pub mod action;
pub mod error;
pub mod record;
pub mod util;

mod base;
pub use base::{ActionSample, Agent, Configurable, Env, Info, Policy, Step};

mod state;
pub use state::{word_count, EpisodeState, RetrievalResult, ScoredDoc, FEATURE_DIM};

mod trajectory;
pub use trajectory::{Trajectory, Transition};

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};

mod trainer;
pub use trainer::{Trainer, TrainerConfig};

pub use action::{ActionCatalogue, RewriteAction};
