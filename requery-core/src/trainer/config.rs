//! Configuration of [`Trainer`](super::Trainer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// The number of training episodes.
    pub num_episodes: usize,

    /// Query every training episode starts from.
    pub seed_query: String,

    /// Where the learned parameters are saved after training.
    pub checkpoint_path: String,

    /// Interval of evaluation in episodes, `0` disables evaluation.
    pub eval_interval: usize,

    /// Interval of saving intermediate parameters in episodes, `0` disables it.
    pub save_interval: usize,

    /// Interval of flushing records in episodes.
    pub flush_record_interval: usize,

    /// Interval of episodes whose step records are written, `0` disables it.
    pub record_step_interval: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            num_episodes: 30,
            seed_query: "treatment for diabetes".to_string(),
            checkpoint_path: "models/policy".to_string(),
            eval_interval: 0,
            save_interval: 0,
            flush_record_interval: 10,
            record_step_interval: 0,
        }
    }
}

impl TrainerConfig {
    /// Sets the number of episodes.
    pub fn num_episodes(mut self, v: usize) -> Self {
        self.num_episodes = v;
        self
    }

    /// Sets the query episodes start from.
    pub fn seed_query(mut self, v: impl Into<String>) -> Self {
        self.seed_query = v.into();
        self
    }

    /// Sets the checkpoint path.
    pub fn checkpoint_path(mut self, v: impl Into<String>) -> Self {
        self.checkpoint_path = v.into();
        self
    }

    /// Sets the interval of evaluation in episodes.
    pub fn eval_interval(mut self, v: usize) -> Self {
        self.eval_interval = v;
        self
    }

    /// Sets the interval of saving in episodes.
    pub fn save_interval(mut self, v: usize) -> Self {
        self.save_interval = v;
        self
    }

    /// Sets the interval of flushing records in episodes.
    pub fn flush_record_interval(mut self, v: usize) -> Self {
        self.flush_record_interval = v.max(1);
        self
    }

    /// Sets the interval of episodes whose step records are written.
    pub fn record_step_interval(mut self, v: usize) -> Self {
        self.record_step_interval = v;
        self
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_trainer_config() -> Result<()> {
        let config = TrainerConfig::default()
            .num_episodes(100)
            .eval_interval(10)
            .record_step_interval(5)
            .checkpoint_path("some/directory/policy.json");

        let dir = TempDir::new("trainer_config")?;
        let path = dir.path().join("trainer_config.yaml");

        config.save(&path)?;
        let config_ = TrainerConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
