//! Positive-only REINFORCE agent.
use super::ReinforceConfig;
use anyhow::{bail, Context, Result};
use log::info;
use rand::{distributions::WeightedIndex, rngs::SmallRng, Rng, SeedableRng};
use requery_core::{
    error::RequeryError,
    record::{Record, RecordValue},
    ActionCatalogue, ActionSample, Agent, Configurable, EpisodeState, Policy, Trajectory,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Serialize, Deserialize)]
struct Params {
    action_probs: Vec<f32>,
}

/// Stateless stochastic policy over the action catalogue.
///
/// Sampling ignores the state. Each sampled index is remembered in training mode and
/// paired with the rewards passed to [`ReinforcePolicy::update_policy`].
/// [`Agent::update`] replaces the history with the actions of the trajectory, so that
/// rewards always meet the actions that earned them.
pub struct ReinforcePolicy {
    catalogue: ActionCatalogue,
    action_probs: Vec<f32>,
    action_history: Vec<usize>,
    lr: f32,
    train: bool,
    rng: SmallRng,
}

impl ReinforcePolicy {
    /// Current action probabilities in catalogue order.
    pub fn action_probs(&self) -> &[f32] {
        &self.action_probs
    }

    /// Indices sampled since the last update.
    pub fn action_history(&self) -> &[usize] {
        &self.action_history
    }

    /// The actions of the policy.
    pub fn catalogue(&self) -> &ActionCatalogue {
        &self.catalogue
    }

    /// Adds `lr` to the probability of every remembered action whose paired reward is
    /// positive, renormalizes and clears the history.
    ///
    /// Pairs are formed in order; extra rewards or extra history entries are ignored.
    /// Non-positive rewards leave the probabilities untouched.
    pub fn update_policy(&mut self, rewards: &[f32], lr: f32) {
        for (&index, &reward) in self.action_history.iter().zip(rewards.iter()) {
            if reward > 0.0 {
                self.action_probs[index] += lr;
            }
        }

        let total: f32 = self.action_probs.iter().sum();
        self.action_probs.iter_mut().for_each(|p| *p /= total);
        self.action_history.clear();
    }
}

impl Policy for ReinforcePolicy {
    fn sample(&mut self, _state: &EpisodeState) -> Result<ActionSample> {
        let dist = WeightedIndex::new(&self.action_probs)?;
        let index = self.rng.sample(dist);
        if self.train {
            self.action_history.push(index);
        }
        Ok(ActionSample {
            index,
            log_prob: Some(self.action_probs[index].ln()),
        })
    }
}

impl Configurable for ReinforcePolicy {
    type Config = ReinforceConfig;

    fn build(config: Self::Config, catalogue: ActionCatalogue) -> Result<Self> {
        let n = catalogue.len();
        Ok(Self {
            catalogue,
            action_probs: vec![1.0 / n as f32; n],
            action_history: vec![],
            lr: config.lr,
            train: config.train,
            rng: SmallRng::seed_from_u64(config.seed),
        })
    }
}

impl Agent for ReinforcePolicy {
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn update(&mut self, trajectory: Trajectory) -> Result<Record> {
        self.action_history.clear();
        for t in trajectory.iter() {
            if t.action_index >= self.catalogue.len() {
                return Err(RequeryError::InvalidAction {
                    index: t.action_index,
                    count: self.catalogue.len(),
                }
                .into());
            }
        }
        self.action_history = trajectory.iter().map(|t| t.action_index).collect();

        let rewards = trajectory.rewards();
        let n_positive = rewards.iter().filter(|&&r| r > 0.0).count();
        self.update_policy(&rewards, self.lr);

        Ok(Record::from_slice(&[
            ("n_positive", RecordValue::Scalar(n_positive as f32)),
            ("action_probs", RecordValue::Array1(self.action_probs.clone())),
        ]))
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        let params = Params {
            action_probs: self.action_probs.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&params)?)
            .with_context(|| format!("Failed to save parameters to {:?}", path))?;
        info!("Saved action probabilities to {:?}", path);
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to load parameters from {:?}", path))?;
        let params: Params = serde_json::from_str(&text)?;
        if params.action_probs.len() != self.catalogue.len() {
            bail!(
                "{} action probabilities in {:?}, expected {}",
                params.action_probs.len(),
                path,
                self.catalogue.len()
            );
        }
        self.action_probs = params.action_probs;
        self.action_history.clear();
        info!("Loaded action probabilities from {:?}", path);
        Ok(())
    }
}
