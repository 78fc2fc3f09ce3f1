//! Configuration of [`ReinforcePolicy`](super::ReinforcePolicy).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ReinforcePolicy`](super::ReinforcePolicy).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReinforceConfig {
    /// Amount added to the probability of a rewarded action before renormalization.
    pub lr: f32,

    /// Seed of the sampler.
    pub seed: u64,

    /// Whether the agent starts in training mode.
    pub train: bool,
}

impl Default for ReinforceConfig {
    fn default() -> Self {
        Self {
            lr: 0.05,
            seed: 42,
            train: true,
        }
    }
}

impl ReinforceConfig {
    /// Sets the learning rate.
    pub fn lr(mut self, v: f32) -> Self {
        self.lr = v;
        self
    }

    /// Sets the seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`ReinforceConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ReinforceConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
