//! Default implementation of the [`Evaluator`] trait.
use super::Evaluator;
use crate::{record::Record, util::rollout, Agent, Env};
use anyhow::Result;

/// Runs one episode per evaluation query and averages the returns.
///
/// The evaluator owns its environment, so that evaluation never disturbs the episode
/// state of the training environment.
pub struct DefaultEvaluator<E: Env> {
    /// Queries each evaluation episode starts from.
    queries: Vec<String>,

    /// The environment instance used for evaluation.
    env: E,
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs a new [`DefaultEvaluator`].
    pub fn new(env: E, queries: Vec<String>) -> Self {
        Self { queries, env }
    }
}

impl<A: Agent, E: Env> Evaluator<A> for DefaultEvaluator<E> {
    fn evaluate(&mut self, agent: &mut A) -> Result<Record> {
        let mut r_total = 0f32;

        for query in self.queries.iter() {
            r_total += rollout(agent, &mut self.env, query)?.total_reward();
        }

        let n = self.queries.len().max(1);
        Ok(Record::from_scalar("eval_return", r_total / n as f32))
    }
}
