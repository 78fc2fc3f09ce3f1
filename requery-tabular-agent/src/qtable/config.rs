//! Configuration of [`QTableAgent`](super::QTableAgent).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`QTableAgent`](super::QTableAgent).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct QTableConfig {
    /// Step size of the Q-learning update.
    pub lr: f32,

    /// Discount factor.
    pub discount_factor: f32,

    /// Probability of a uniformly random action in training mode.
    pub epsilon: f32,

    /// Seed of the explorer.
    pub seed: u64,

    /// Whether the agent starts in training mode.
    pub train: bool,
}

impl Default for QTableConfig {
    fn default() -> Self {
        Self {
            lr: 0.1,
            discount_factor: 0.95,
            epsilon: 0.2,
            seed: 42,
            train: true,
        }
    }
}

impl QTableConfig {
    /// Sets the learning rate.
    pub fn lr(mut self, v: f32) -> Self {
        self.lr = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f32) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the exploration probability.
    pub fn epsilon(mut self, v: f32) -> Self {
        self.epsilon = v;
        self
    }

    /// Sets the seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`QTableConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`QTableConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
