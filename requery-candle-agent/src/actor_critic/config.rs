//! Configuration of [`ActorCritic`](super::ActorCritic).
use crate::{mlp::MlpConfig, opt::OptimizerConfig, Device};
use anyhow::Result;
use requery_core::FEATURE_DIM;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ActorCritic`](super::ActorCritic).
///
/// The output dimension of `policy_config` is overwritten with the size of the action
/// catalogue when the agent is built.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ActorCriticConfig {
    /// Policy network, state features to action logits.
    pub policy_config: MlpConfig,

    /// Value network, state features to a scalar.
    pub value_config: MlpConfig,

    /// Optimizer of both networks.
    pub opt_config: OptimizerConfig,

    /// Discount factor of returns.
    pub discount_factor: f64,

    /// Seed of the parameter initialization and the action sampler.
    pub seed: u64,

    /// Device of the networks.
    pub device: Device,

    /// Whether the agent starts in training mode.
    pub train: bool,
}

impl Default for ActorCriticConfig {
    fn default() -> Self {
        Self {
            policy_config: MlpConfig::new(FEATURE_DIM, vec![64], 4),
            value_config: MlpConfig::new(FEATURE_DIM, vec![64], 1),
            opt_config: OptimizerConfig::default(),
            discount_factor: 0.99,
            seed: 42,
            device: Device::Cpu,
            train: true,
        }
    }
}

impl ActorCriticConfig {
    /// Sets the size of the hidden layer of both networks.
    pub fn hidden_dim(mut self, v: usize) -> Self {
        self.policy_config = MlpConfig::new(FEATURE_DIM, vec![v], 4);
        self.value_config = MlpConfig::new(FEATURE_DIM, vec![v], 1);
        self
    }

    /// Sets the policy network.
    pub fn policy_config(mut self, v: MlpConfig) -> Self {
        self.policy_config = v;
        self
    }

    /// Sets the value network.
    pub fn value_config(mut self, v: MlpConfig) -> Self {
        self.value_config = v;
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = v;
        self
    }

    /// Loads [`ActorCriticConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ActorCriticConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
