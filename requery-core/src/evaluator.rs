//! Evaluate [`Agent`].
use crate::{record::Record, Agent};
use anyhow::Result;
mod default_evaluator;
pub use default_evaluator::DefaultEvaluator;

/// Evaluate [`Agent`].
pub trait Evaluator<A: Agent> {
    /// Evaluate [`Agent`].
    ///
    /// The returned record holds the average return under the key `"eval_return"`.
    /// The caller of this method needs to handle the training/evaluation mode of `agent`.
    fn evaluate(&mut self, agent: &mut A) -> Result<Record>;
}
