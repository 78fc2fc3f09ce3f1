//! Episodic query rewriting environment.
use crate::{RewardConfig, RewardModel, Retriever};
use anyhow::Result;
use log::{debug, trace};
use requery_core::{
    error::RequeryError,
    record::{Record, RecordValue},
    ActionCatalogue, Env, EpisodeState, Info, RetrievalResult, Step,
};
use serde::{Deserialize, Serialize};

/// Configuration of [`QueryRewriteEnv`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// The number of rewrites in an episode.
    pub max_steps: usize,

    /// The number of documents retrieved per query.
    pub top_k: usize,

    /// Reward weights.
    pub reward: RewardConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_steps: 3,
            top_k: 3,
            reward: RewardConfig::default(),
        }
    }
}

impl EnvConfig {
    /// Sets the number of steps in an episode.
    pub fn max_steps(mut self, v: usize) -> Self {
        self.max_steps = v;
        self
    }

    /// Sets the number of retrieved documents.
    pub fn top_k(mut self, v: usize) -> Self {
        self.top_k = v;
        self
    }

    /// Sets the reward weights.
    pub fn reward(mut self, v: RewardConfig) -> Self {
        self.reward = v;
        self
    }
}

/// Phase of the episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No episode has been started.
    Uninitialized,

    /// Reset, no step taken yet.
    Ready,

    /// The given number of steps has been taken, fewer than `max_steps`.
    Stepped(usize),

    /// `max_steps` steps have been taken.
    Done,
}

/// Diagnostics of a step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Retrieval result of the query before the rewrite.
    pub before: RetrievalResult,

    /// Retrieval result of the rewritten query.
    pub after: RetrievalResult,

    /// The rewritten query.
    pub rewritten_query: String,
}

impl Info for StepInfo {}

/// Environment in which an agent rewrites a query for up to `max_steps` steps.
///
/// The environment never modifies the retriever. The reward of every step compares the
/// rewrite with the query the episode was reset with.
pub struct QueryRewriteEnv<R: Retriever> {
    retriever: R,
    catalogue: ActionCatalogue,
    reward_model: RewardModel,
    config: EnvConfig,
    original_query: String,
    step_index: usize,
    phase: Phase,
}

impl<R: Retriever> QueryRewriteEnv<R> {
    /// Constructs the environment.
    pub fn new(retriever: R, catalogue: ActionCatalogue, config: EnvConfig) -> Self {
        let reward_model = RewardModel::new(config.reward.clone());
        Self {
            retriever,
            catalogue,
            reward_model,
            config,
            original_query: String::new(),
            step_index: 0,
            phase: Phase::Uninitialized,
        }
    }

    /// Replaces the reward model, e.g. to plug in another similarity.
    pub fn with_reward_model(mut self, reward_model: RewardModel) -> Self {
        self.reward_model = reward_model;
        self
    }

    /// The retriever.
    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    /// The action catalogue.
    pub fn catalogue(&self) -> &ActionCatalogue {
        &self.catalogue
    }

    /// The configuration.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// The phase of the current episode.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Retrieves documents for `query` with the configured `top_k`.
    pub fn retrieve(&self, query: &str) -> RetrievalResult {
        self.retriever.retrieve(query, self.config.top_k)
    }
}

impl<R: Retriever> Env for QueryRewriteEnv<R> {
    type Info = StepInfo;

    fn reset(&mut self, query: &str) -> Result<EpisodeState> {
        trace!("QueryRewriteEnv::reset({:?})", query);
        self.step_index = 0;
        self.original_query = query.to_string();
        self.phase = Phase::Ready;
        let results = self.retrieve(query);
        Ok(EpisodeState::new(query, &results, 0))
    }

    fn step(&mut self, state: &EpisodeState, act: usize) -> Result<(Step<Self>, Record)> {
        match self.phase {
            Phase::Uninitialized => return Err(RequeryError::NotReset.into()),
            Phase::Done => return Err(RequeryError::EpisodeDone(self.step_index).into()),
            Phase::Ready | Phase::Stepped(_) => {}
        }
        let action = self.catalogue.get(act)?;

        self.step_index += 1;
        let rewritten_query = action.apply(&state.current_query);
        let before = self.retrieve(&state.current_query);
        let after = self.retrieve(&rewritten_query);

        let breakdown =
            self.reward_model
                .breakdown(&before, &after, &self.original_query, &rewritten_query);
        let reward = breakdown.map(|b| b.reward).unwrap_or(0.0);

        let next_state = EpisodeState::new(rewritten_query.clone(), &after, self.step_index);
        let is_done = self.step_index >= self.config.max_steps;
        self.phase = match is_done {
            true => Phase::Done,
            false => Phase::Stepped(self.step_index),
        };
        debug!(
            "step {} {} -> {:?} reward {:.3}",
            self.step_index,
            action.name(),
            rewritten_query,
            reward
        );

        let mut record = Record::from_slice(&[
            ("reward", RecordValue::Scalar(reward)),
            ("action", RecordValue::String(action.name().to_string())),
            ("query", RecordValue::String(rewritten_query.clone())),
        ]);
        if let Some(b) = breakdown {
            record.insert("rank_gain", RecordValue::Scalar(b.rank_gain));
            record.insert("semantic_sim", RecordValue::Scalar(b.semantic_sim));
            record.insert("grounding", RecordValue::Scalar(b.grounding));
            record.insert("length_penalty", RecordValue::Scalar(b.length_penalty));
        }

        let info = StepInfo {
            before,
            after,
            rewritten_query,
        };
        Ok((Step::new(next_state, act, reward, is_done, info), record))
    }

    fn max_steps(&self) -> usize {
        self.config.max_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bm25Retriever;
    use requery_core::RewriteAction;

    const DOC: &str = "Metformin is the first line treatment for type 2 diabetes.";

    fn env(max_steps: usize) -> QueryRewriteEnv<Bm25Retriever> {
        let retriever = Bm25Retriever::new(vec![DOC.to_string()]).unwrap();
        let config = EnvConfig::default().max_steps(max_steps);
        QueryRewriteEnv::new(retriever, ActionCatalogue::default(), config)
    }

    #[test]
    fn test_reset() -> Result<()> {
        let mut env = env(3);
        assert_eq!(env.phase(), Phase::Uninitialized);
        for query in ["treatment for diabetes", "", "dm"] {
            let state = env.reset(query)?;
            assert_eq!(state.step_index, 0);
            assert_eq!(state.features.len(), 4);
            assert_eq!(state.features[3], 0.0);
            assert_eq!(env.phase(), Phase::Ready);
        }
        Ok(())
    }

    #[test]
    fn test_done_exactly_at_max_steps() -> Result<()> {
        for max_steps in 1..5 {
            for act in 0..4 {
                let mut env = env(max_steps);
                let mut state = env.reset("treatment for diabetes")?;
                for i in 1..=max_steps {
                    let (step, _) = env.step(&state, act)?;
                    assert_eq!(step.obs.step_index, i);
                    assert_eq!(step.is_done(), i == max_steps);
                    state = step.obs;
                }
                assert_eq!(env.phase(), Phase::Done);
            }
        }
        Ok(())
    }

    #[test]
    fn test_appending_unmatched_terms_lowers_grounding() -> Result<()> {
        let mut env = env(3);
        let query = "treatment for diabetes";

        let state = env.reset(query)?;
        let (_, identity) = env.step(&state, 3)?;
        let state = env.reset(query)?;
        let (step, append) = env.step(&state, 1)?;
        assert_eq!(
            step.info.rewritten_query,
            "treatment for diabetes clinical guideline recommended therapy"
        );

        let identity = identity.get_scalar("grounding")?;
        let append = append.get_scalar("grounding")?;
        assert!((identity - 2.0 / 3.0).abs() < 1e-6);
        assert!((append - 2.0 / 7.0).abs() < 1e-6);
        assert!(append < identity);
        Ok(())
    }

    #[test]
    fn test_step_after_done_fails() -> Result<()> {
        let mut env = env(1);
        let state = env.reset("treatment for diabetes")?;
        let (step, _) = env.step(&state, 3)?;
        assert!(step.is_done());
        let err = env.step(&step.obs, 3).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<RequeryError>(),
            Some(RequeryError::EpisodeDone(1))
        ));
        Ok(())
    }

    #[test]
    fn test_step_before_reset_fails() {
        let mut env = env(3);
        let state = EpisodeState::new("q", &[], 0);
        let err = env.step(&state, 0).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<RequeryError>(),
            Some(RequeryError::NotReset)
        ));
    }

    #[test]
    fn test_invalid_action_fails_without_stepping() -> Result<()> {
        let mut env = env(3);
        let state = env.reset("treatment for diabetes")?;
        let err = env.step(&state, 4).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<RequeryError>(),
            Some(RequeryError::InvalidAction { index: 4, count: 4 })
        ));
        let (step, _) = env.step(&state, 3)?;
        assert_eq!(step.obs.step_index, 1);
        Ok(())
    }

    #[test]
    fn test_identity_step() -> Result<()> {
        let mut env = env(3);
        let state = env.reset("treatment for diabetes")?;
        let (step, record) = env.step(&state, 3)?;

        assert_eq!(step.info.rewritten_query, "treatment for diabetes");
        assert_eq!(step.info.before, step.info.after);
        assert_eq!(record.get_scalar("rank_gain")?, 0.0);
        assert_eq!(record.get_scalar("semantic_sim")?, 1.0);
        assert_eq!(record.get_scalar("length_penalty")?, 0.0);
        assert_eq!(record.get_string("action")?, "no_op");
        Ok(())
    }

    #[test]
    fn test_empty_retrieval_gives_zero_reward() -> Result<()> {
        struct Nothing;
        impl Retriever for Nothing {
            fn retrieve(&self, _query: &str, _top_k: usize) -> RetrievalResult {
                vec![]
            }
        }

        let catalogue =
            ActionCatalogue::new(vec![RewriteAction::append("more", "x y z"), RewriteAction::NoOp])?;
        let mut env = QueryRewriteEnv::new(Nothing, catalogue, EnvConfig::default());
        let state = env.reset("q")?;
        let (step, record) = env.step(&state, 0)?;
        assert_eq!(step.reward, 0.0);
        assert!(record.get("grounding").is_none());
        assert_eq!(step.obs.features, [0.0, 0.0, 4.0, 1.0]);
        Ok(())
    }
}
