//! Agent.
use super::Policy;
use crate::{record::Record, Trajectory};
use anyhow::Result;
use std::path::Path;

/// Represents a trainable policy.
pub trait Agent: Policy {
    /// Set the policy to training mode.
    fn train(&mut self);

    /// Set the policy to evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Updates the parameters from the transitions of one episode.
    ///
    /// The trajectory is consumed; the returned [`Record`] holds values like losses.
    fn update(&mut self, trajectory: Trajectory) -> Result<Record>;

    /// Save the parameters of the agent to the file at `path`.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the agent from the file at `path`.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
