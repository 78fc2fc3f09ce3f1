//! Policy.
use crate::{ActionCatalogue, EpisodeState};
use anyhow::Result;
use serde::de::DeserializeOwned;
use std::path::Path;

/// An action drawn by a [`Policy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionSample {
    /// Index into the action catalogue.
    pub index: usize,

    /// Log-probability of the draw, for stochastic policies that have one.
    pub log_prob: Option<f32>,
}

/// A policy over the action catalogue.
///
/// Policy is a mapping from a state to an action index.
/// The mapping can be either of deterministic or stochastic.
pub trait Policy {
    /// Sample an action given a state.
    fn sample(&mut self, state: &EpisodeState) -> Result<ActionSample>;
}

/// A configurable object.
pub trait Configurable {
    /// Configuration.
    type Config: Clone + DeserializeOwned;

    /// Builds the object acting on the actions of `catalogue`.
    fn build(config: Self::Config, catalogue: ActionCatalogue) -> Result<Self>
    where
        Self: Sized;

    /// Build the object with the configuration in the yaml file of the given path.
    fn build_from_path(path: impl AsRef<Path>, catalogue: ActionCatalogue) -> Result<Self>
    where
        Self: Sized,
    {
        let file = std::fs::File::open(path)?;
        let rdr = std::io::BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Self::build(config, catalogue)
    }
}
