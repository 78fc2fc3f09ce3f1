//! Configuration of a training or evaluation run.
use anyhow::{bail, Result};
use clap::ValueEnum;
use requery_candle_agent::{actor_critic::ActorCriticConfig, mlp::MlpConfig};
use requery_core::{ActionCatalogue, TrainerConfig, FEATURE_DIM};
use requery_env::{EnvConfig, RewardConfig};
use requery_tabular_agent::{QTableConfig, ReinforceConfig};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Agent trained or evaluated in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// [`ReinforcePolicy`](requery_tabular_agent::ReinforcePolicy).
    Reinforce,

    /// [`ActorCritic`](requery_candle_agent::actor_critic::ActorCritic).
    ActorCritic,

    /// [`QTableAgent`](requery_tabular_agent::QTableAgent).
    QTable,
}

/// Configuration of a run, usually read from a YAML file.
///
/// Agent-specific configurations are derived from these values, so that a run is fully
/// described by one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequeryConfig {
    /// Dimension of the state features.
    pub state_dim: usize,

    /// Number of actions, must match the catalogue.
    pub action_dim: usize,

    /// Number of training episodes.
    pub num_episodes: usize,

    /// Discount factor of the actor-critic and Q-table agents.
    pub discount_factor: f64,

    /// Number of rewrites per episode.
    pub max_steps: usize,

    /// Number of retrieved documents.
    pub top_k: usize,

    /// Reward weights.
    pub reward: RewardConfig,

    /// Where parameters are saved after training and loaded for evaluation.
    pub checkpoint_path: String,

    /// CSV file metrics are appended to.
    pub metrics_path: String,

    /// Directory holding `<domain>/corpus.txt`.
    pub data_dir: String,

    /// Domain of the corpus.
    pub domain: String,

    /// Query every training episode starts from.
    pub seed_query: String,

    /// JSON map from query to gold document for evaluation, the built-in query if `None`.
    pub queries_path: Option<String>,

    /// Agent to train.
    pub agent: AgentKind,

    /// Seed of the agent and the random baseline.
    pub seed: u64,

    /// Hidden layer size of the actor-critic networks.
    pub hidden_dim: usize,

    /// Learning rate, the agent default if `None`.
    pub lr: Option<f64>,

    /// Exploration probability of the Q-table agent.
    pub epsilon: f32,

    /// Load the checkpoint before training if it exists.
    pub resume: bool,

    /// Interval of intermediate checkpoints in episodes, disabled if 0.
    pub save_interval: usize,

    /// Interval of evaluation on the query set in episodes, disabled if 0. The best
    /// parameters are kept in `<checkpoint_path>.best`.
    pub eval_interval: usize,

    /// Interval of training episodes whose step records are logged, disabled if 0.
    pub record_step_interval: usize,

    /// Rewrite actions.
    pub catalogue: ActionCatalogue,
}

impl Default for RequeryConfig {
    fn default() -> Self {
        Self {
            state_dim: FEATURE_DIM,
            action_dim: 4,
            num_episodes: 30,
            discount_factor: 0.99,
            max_steps: 3,
            top_k: 3,
            reward: RewardConfig::default(),
            checkpoint_path: "models/policy".to_string(),
            metrics_path: "results/metrics.csv".to_string(),
            data_dir: "data".to_string(),
            domain: "medical".to_string(),
            seed_query: "treatment for diabetes".to_string(),
            queries_path: None,
            agent: AgentKind::Reinforce,
            seed: 42,
            hidden_dim: 64,
            lr: None,
            epsilon: 0.2,
            resume: false,
            save_interval: 0,
            eval_interval: 0,
            record_step_interval: 0,
            catalogue: ActionCatalogue::default(),
        }
    }
}

impl RequeryConfig {
    /// Sets the number of training episodes.
    pub fn num_episodes(mut self, v: usize) -> Self {
        self.num_episodes = v;
        self
    }

    /// Sets the agent.
    pub fn agent(mut self, v: AgentKind) -> Self {
        self.agent = v;
        self
    }

    /// Sets the checkpoint path.
    pub fn checkpoint_path(mut self, v: impl Into<String>) -> Self {
        self.checkpoint_path = v.into();
        self
    }

    /// Sets the metrics path.
    pub fn metrics_path(mut self, v: impl Into<String>) -> Self {
        self.metrics_path = v.into();
        self
    }

    /// Sets the data directory.
    pub fn data_dir(mut self, v: impl Into<String>) -> Self {
        self.data_dir = v.into();
        self
    }

    /// Sets the domain.
    pub fn domain(mut self, v: impl Into<String>) -> Self {
        self.domain = v.into();
        self
    }

    /// Sets the seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets whether training resumes from the checkpoint.
    pub fn resume(mut self, v: bool) -> Self {
        self.resume = v;
        self
    }

    /// Sets the interval of intermediate checkpoints.
    pub fn save_interval(mut self, v: usize) -> Self {
        self.save_interval = v;
        self
    }

    /// Sets the evaluation interval.
    pub fn eval_interval(mut self, v: usize) -> Self {
        self.eval_interval = v;
        self
    }

    /// Checks that the dimensions agree with the features and the catalogue.
    pub fn validate(&self) -> Result<()> {
        if self.state_dim != FEATURE_DIM {
            bail!(
                "state_dim is {}, the environment produces {} features",
                self.state_dim,
                FEATURE_DIM
            );
        }
        if self.max_steps == 0 {
            bail!("max_steps must be at least 1");
        }
        if self.top_k == 0 {
            bail!("top_k must be at least 1");
        }
        if self.action_dim != self.catalogue.len() {
            bail!(
                "action_dim is {}, the catalogue has {} actions",
                self.action_dim,
                self.catalogue.len()
            );
        }
        Ok(())
    }

    /// Path of the checkpoint.
    pub fn checkpoint(&self) -> PathBuf {
        PathBuf::from(&self.checkpoint_path)
    }

    /// Configuration of the trainer.
    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig::default()
            .num_episodes(self.num_episodes)
            .seed_query(self.seed_query.clone())
            .checkpoint_path(self.checkpoint_path.clone())
            .save_interval(self.save_interval)
            .eval_interval(self.eval_interval)
            .record_step_interval(self.record_step_interval)
    }

    /// Configuration of the environment.
    pub fn env_config(&self) -> EnvConfig {
        EnvConfig::default()
            .max_steps(self.max_steps)
            .top_k(self.top_k)
            .reward(self.reward.clone())
    }

    /// Configuration of [`ReinforcePolicy`](requery_tabular_agent::ReinforcePolicy).
    pub fn reinforce_config(&self) -> ReinforceConfig {
        let config = ReinforceConfig::default().seed(self.seed);
        match self.lr {
            Some(lr) => config.lr(lr as f32),
            None => config,
        }
    }

    /// Configuration of [`QTableAgent`](requery_tabular_agent::QTableAgent).
    pub fn qtable_config(&self) -> QTableConfig {
        let config = QTableConfig::default()
            .discount_factor(self.discount_factor as f32)
            .epsilon(self.epsilon)
            .seed(self.seed);
        match self.lr {
            Some(lr) => config.lr(lr as f32),
            None => config,
        }
    }

    /// Configuration of [`ActorCritic`](requery_candle_agent::actor_critic::ActorCritic).
    pub fn actor_critic_config(&self) -> ActorCriticConfig {
        let config = ActorCriticConfig::default()
            .policy_config(MlpConfig::new(
                self.state_dim,
                vec![self.hidden_dim],
                self.action_dim,
            ))
            .value_config(MlpConfig::new(self.state_dim, vec![self.hidden_dim], 1))
            .discount_factor(self.discount_factor)
            .seed(self.seed);
        match self.lr {
            Some(lr) => {
                let opt_config = config.opt_config.clone().learning_rate(lr);
                config.opt_config(opt_config)
            }
            None => config,
        }
    }

    /// Loads [`RequeryConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`RequeryConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use requery_core::RewriteAction;
    use tempdir::TempDir;

    #[test]
    fn test_serde_requery_config() -> Result<()> {
        let config = RequeryConfig::default()
            .agent(AgentKind::ActorCritic)
            .num_episodes(5)
            .resume(true);
        let dir = TempDir::new("requery_config")?;
        let path = dir.path().join("requery.yaml");
        config.save(&path)?;
        assert_eq!(config, RequeryConfig::load(&path)?);
        Ok(())
    }

    #[test]
    fn test_partial_yaml_uses_defaults() -> Result<()> {
        let dir = TempDir::new("requery_config")?;
        let path = dir.path().join("requery.yaml");
        std::fs::write(&path, "num_episodes: 3\nagent: q_table\n")?;
        let config = RequeryConfig::load(&path)?;
        assert_eq!(config.num_episodes, 3);
        assert_eq!(config.agent, AgentKind::QTable);
        assert_eq!(config.top_k, 3);
        Ok(())
    }

    #[test]
    fn test_validate() -> Result<()> {
        RequeryConfig::default().validate()?;

        let mut config = RequeryConfig::default();
        config.catalogue = ActionCatalogue::new(vec![RewriteAction::NoOp])?;
        assert!(config.validate().is_err());
        config.action_dim = 1;
        config.validate()?;

        config.state_dim = 5;
        assert!(config.validate().is_err());

        let config = RequeryConfig {
            max_steps: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = RequeryConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        Ok(())
    }
}
