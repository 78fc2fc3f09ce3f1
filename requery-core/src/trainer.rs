//! Train [`Agent`].
mod config;
use crate::{
    record::{
        NullRecorder, Record,
        RecordValue::{DateTime, Scalar},
        Recorder,
    },
    util::rollout_with_recorder,
    Agent, Env, Evaluator,
};
use anyhow::{Context, Result};
use chrono::Local;
pub use config::TrainerConfig;
use log::info;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the training loop.
///
/// # Training loop
///
/// 0. Given an agent implementing [`Agent`], an environment implementing [`Env`] and a
///    recorder implementing [`Recorder`].
/// 1. For each of `num_episodes` episodes:
///     1. Reset the environment with `seed_query`.
///     2. Sample an action, apply it to the environment and push the transition to the
///        episode's [`Trajectory`](crate::Trajectory), until the step reports `is_done`.
///     3. Hand the trajectory to [`Agent::update`].
///     4. Store `episode`, `episode_return`, `episode_len`, a `timestamp` and the
///        agent's record. If `record_step_interval > 0`, the step records of every
///        `record_step_interval`-th episode are written to the recorder as they occur.
///     5. If `eval_interval > 0` and an evaluator is given, evaluate the agent every
///        `eval_interval` episodes and save the best parameters to `<checkpoint>.best`.
///     6. If `save_interval > 0`, save the parameters to `<checkpoint>.ep<n>` every
///        `save_interval` episodes.
/// 2. Save the parameters to `checkpoint_path`.
///
/// With `num_episodes == 0` the agent is never updated and the checkpoint holds its
/// initial parameters. To resume training, load a checkpoint with
/// [`Agent::load_params`] before calling [`Trainer::train`].
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|action index|B[Env]
///     B -->|EpisodeState|A
///     B -->|Step|C[Trajectory]
///     C -->|update|A
/// ```
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    fn save_model<A: Agent>(agent: &A, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
        }
        agent.save_params(path)?;
        info!("Saved the model in {:?}.", path);
        Ok(())
    }

    fn checkpoint_with_suffix(&self, suffix: &str) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.config.checkpoint_path, suffix))
    }

    /// Runs one training episode and updates the agent.
    ///
    /// Step records are written to `step_recorder`. Returns the record of the episode,
    /// including the return before the update.
    pub fn train_episode<A, E>(
        &mut self,
        agent: &mut A,
        env: &mut E,
        step_recorder: &mut dyn Recorder,
    ) -> Result<Record>
    where
        A: Agent,
        E: Env,
    {
        let trajectory =
            rollout_with_recorder(agent, env, &self.config.seed_query, step_recorder)?;
        let episode_return = trajectory.total_reward();
        let episode_len = trajectory.len();
        let record_agent = agent.update(trajectory)?;

        let mut record = Record::empty();
        record.insert("episode_return", Scalar(episode_return));
        record.insert("episode_len", Scalar(episode_len as f32));
        record.insert("timestamp", DateTime(Local::now()));
        Ok(record.merge(record_agent))
    }

    /// Train the agent.
    pub fn train<A, E>(
        &mut self,
        agent: &mut A,
        env: &mut E,
        recorder: &mut dyn Recorder,
        mut evaluator: Option<&mut dyn Evaluator<A>>,
    ) -> Result<()>
    where
        A: Agent,
        E: Env,
    {
        let mut max_eval_return = f32::MIN;
        agent.train();

        let mut null_recorder = NullRecorder::new();

        for episode in 0..self.config.num_episodes {
            let interval = self.config.record_step_interval;
            let mut record = match interval > 0 && episode % interval == 0 {
                true => self.train_episode(agent, env, recorder)?,
                false => self.train_episode(agent, env, &mut null_recorder)?,
            };
            let n = episode + 1;
            info!(
                "Episode {:02} | Total reward: {:.3}",
                episode,
                record.get_scalar("episode_return")?
            );
            record.insert("episode", Scalar(episode as f32));

            // Evaluation
            if self.config.eval_interval > 0 && n % self.config.eval_interval == 0 {
                if let Some(evaluator) = evaluator.as_mut() {
                    info!("Starts evaluation of the trained model");
                    agent.eval();
                    let eval_return = evaluator.evaluate(agent)?.get_scalar("eval_return")?;
                    agent.train();
                    record.insert("eval_return", Scalar(eval_return));

                    // Save the best model up to the current episode
                    if eval_return > max_eval_return {
                        max_eval_return = eval_return;
                        Self::save_model(agent, &self.checkpoint_with_suffix("best"))?;
                    }
                }
            }

            // Save the current model
            if self.config.save_interval > 0 && n % self.config.save_interval == 0 {
                Self::save_model(agent, &self.checkpoint_with_suffix(&format!("ep{}", n)))?;
            }

            recorder.store(record);

            if n % self.config.flush_record_interval.max(1) == 0 {
                recorder.flush(n as _);
            }
        }

        recorder.flush(self.config.num_episodes as _);
        Self::save_model(agent, Path::new(&self.config.checkpoint_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        record::BufferedRecorder, ActionSample, EpisodeState, Policy, ScoredDoc, Step,
        Trajectory,
    };
    use tempdir::TempDir;

    /// Rewards 1.0 at every step, episodes last `max_steps`.
    struct CountingEnv {
        max_steps: usize,
        step_index: usize,
    }

    impl Env for CountingEnv {
        type Info = ();

        fn reset(&mut self, query: &str) -> Result<EpisodeState> {
            self.step_index = 0;
            Ok(EpisodeState::new(query, &[ScoredDoc::new(1.0, "doc")], 0))
        }

        fn step(&mut self, state: &EpisodeState, act: usize) -> Result<(Step<Self>, Record)> {
            self.step_index += 1;
            let obs = EpisodeState::new(state.current_query.clone(), &[], self.step_index);
            let is_done = self.step_index >= self.max_steps;
            Ok((Step::new(obs, act, 1.0, is_done, ()), Record::empty()))
        }

        fn max_steps(&self) -> usize {
            self.max_steps
        }
    }

    #[derive(Default)]
    struct CountingAgent {
        n_updates: usize,
        n_transitions: usize,
    }

    impl Policy for CountingAgent {
        fn sample(&mut self, _state: &EpisodeState) -> Result<ActionSample> {
            Ok(ActionSample {
                index: 0,
                log_prob: None,
            })
        }
    }

    impl Agent for CountingAgent {
        fn train(&mut self) {}

        fn eval(&mut self) {}

        fn is_train(&self) -> bool {
            true
        }

        fn update(&mut self, trajectory: Trajectory) -> Result<Record> {
            self.n_updates += 1;
            self.n_transitions += trajectory.len();
            Ok(Record::empty())
        }

        fn save_params(&self, path: &Path) -> Result<()> {
            fs::write(path, format!("{}", self.n_updates))?;
            Ok(())
        }

        fn load_params(&mut self, path: &Path) -> Result<()> {
            self.n_updates = fs::read_to_string(path)?.parse()?;
            Ok(())
        }
    }

    #[test]
    fn test_train_episodes() -> Result<()> {
        let dir = TempDir::new("trainer")?;
        let path = dir.path().join("models").join("policy");
        let config = TrainerConfig::default()
            .num_episodes(4)
            .flush_record_interval(1)
            .checkpoint_path(path.to_str().unwrap());
        let mut trainer = Trainer::build(config);
        let mut env = CountingEnv {
            max_steps: 3,
            step_index: 0,
        };
        let mut agent = CountingAgent::default();
        let mut recorder = BufferedRecorder::new();

        trainer.train(&mut agent, &mut env, &mut recorder, None)?;

        assert_eq!(agent.n_updates, 4);
        assert_eq!(agent.n_transitions, 12);
        assert_eq!(recorder.len(), 4);
        for record in recorder.iter() {
            assert_eq!(record.get_scalar("episode_return")?, 3.0);
            assert_eq!(record.get_scalar("episode_len")?, 3.0);
        }
        assert_eq!(fs::read_to_string(&path)?, "4");
        Ok(())
    }

    #[test]
    fn test_step_records_are_written() -> Result<()> {
        let dir = TempDir::new("trainer")?;
        let path = dir.path().join("policy");
        let config = TrainerConfig::default()
            .num_episodes(4)
            .flush_record_interval(1)
            .record_step_interval(2)
            .checkpoint_path(path.to_str().unwrap());
        let mut env = CountingEnv {
            max_steps: 3,
            step_index: 0,
        };
        let mut agent = CountingAgent::default();
        let mut recorder = BufferedRecorder::new();

        Trainer::build(config).train(&mut agent, &mut env, &mut recorder, None)?;

        // episodes 0 and 2 write 3 step records each, every episode stores one record
        assert_eq!(recorder.len(), 4 + 2 * 3);
        let steps: Vec<_> = recorder
            .iter()
            .filter_map(|r| r.get_scalar("step_index").ok())
            .collect();
        assert_eq!(steps, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
        let episodes = recorder.iter().filter(|r| r.get("episode").is_some());
        for record in episodes {
            assert!(matches!(record.get("timestamp"), Some(DateTime(_))));
        }
        Ok(())
    }

    #[test]
    fn test_zero_episodes_saves_initial_params() -> Result<()> {
        let dir = TempDir::new("trainer")?;
        let path = dir.path().join("policy");
        let config = TrainerConfig::default()
            .num_episodes(0)
            .checkpoint_path(path.to_str().unwrap());
        let mut env = CountingEnv {
            max_steps: 3,
            step_index: 0,
        };
        let mut agent = CountingAgent::default();

        Trainer::build(config).train(&mut agent, &mut env, &mut BufferedRecorder::new(), None)?;

        assert_eq!(agent.n_updates, 0);
        assert_eq!(fs::read_to_string(&path)?, "0");
        Ok(())
    }
}
