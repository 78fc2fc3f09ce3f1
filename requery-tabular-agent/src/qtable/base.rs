//! Tabular Q-learning agent.
use super::QTableConfig;
use anyhow::{bail, Context, Result};
use log::{info, trace};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use requery_core::{
    error::RequeryError,
    record::{Record, RecordValue},
    ActionCatalogue, ActionSample, Agent, Configurable, EpisodeState, Policy, Trajectory,
    FEATURE_DIM,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};

type StateKey = [i64; FEATURE_DIM];

#[derive(Serialize, Deserialize)]
struct Entry {
    state: StateKey,
    values: Vec<f32>,
}

fn state_key(features: &[f32; FEATURE_DIM]) -> StateKey {
    (*features).map(|x| (x * 100.0).round() as i64)
}

/// Index of the largest value, the first one among ties.
fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max {
                (i, v)
            } else {
                (best, max)
            }
        })
        .0
}

/// Epsilon-greedy agent with a table of action values.
///
/// States are keyed by their features rounded to two decimals. Keys seen for the first
/// time get zero values for every action.
pub struct QTableAgent {
    catalogue: ActionCatalogue,
    q_table: HashMap<StateKey, Vec<f32>>,
    lr: f32,
    discount_factor: f32,
    epsilon: f32,
    train: bool,
    rng: SmallRng,
}

impl QTableAgent {
    /// Action values of `features`, `None` if the state has not been seen.
    pub fn q_values(&self, features: &[f32; FEATURE_DIM]) -> Option<&[f32]> {
        self.q_table.get(&state_key(features)).map(Vec::as_slice)
    }

    /// The number of states in the table.
    pub fn n_states(&self) -> usize {
        self.q_table.len()
    }

    /// The actions of the agent.
    pub fn catalogue(&self) -> &ActionCatalogue {
        &self.catalogue
    }

    fn values_mut(&mut self, key: StateKey) -> &mut Vec<f32> {
        let n = self.catalogue.len();
        self.q_table.entry(key).or_insert_with(|| vec![0.0; n])
    }

    /// Applies `Q[s][a] += lr * (r + gamma * max Q[s'] - Q[s][a])`.
    ///
    /// Returns the temporal difference error.
    pub fn update_step(
        &mut self,
        state: &[f32; FEATURE_DIM],
        action_index: usize,
        reward: f32,
        next_state: &[f32; FEATURE_DIM],
    ) -> Result<f32> {
        if action_index >= self.catalogue.len() {
            return Err(RequeryError::InvalidAction {
                index: action_index,
                count: self.catalogue.len(),
            }
            .into());
        }

        let q_next = self
            .values_mut(state_key(next_state))
            .iter()
            .cloned()
            .fold(f32::NEG_INFINITY, f32::max);
        let (lr, gamma) = (self.lr, self.discount_factor);
        let q = &mut self.values_mut(state_key(state))[action_index];
        let td_err = reward + gamma * q_next - *q;
        *q += lr * td_err;

        Ok(td_err)
    }
}

impl Policy for QTableAgent {
    fn sample(&mut self, state: &EpisodeState) -> Result<ActionSample> {
        let n = self.catalogue.len();
        let explore = self.train && self.rng.gen::<f32>() < self.epsilon;
        let index = if explore {
            self.rng.gen_range(0..n)
        } else {
            argmax(self.values_mut(state_key(&state.features)))
        };
        trace!("QTableAgent::sample: {} (explore = {})", index, explore);

        Ok(ActionSample {
            index,
            log_prob: None,
        })
    }
}

impl Configurable for QTableAgent {
    type Config = QTableConfig;

    fn build(config: Self::Config, catalogue: ActionCatalogue) -> Result<Self> {
        Ok(Self {
            catalogue,
            q_table: HashMap::new(),
            lr: config.lr,
            discount_factor: config.discount_factor,
            epsilon: config.epsilon,
            train: config.train,
            rng: SmallRng::seed_from_u64(config.seed),
        })
    }
}

impl Agent for QTableAgent {
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
        let n = trajectory.len().max(1) as f32;
        let mut abs_td_err = 0f32;
        for t in trajectory {
            abs_td_err += self
                .update_step(&t.state, t.action_index, t.reward, &t.next_state)?
                .abs();
        }

        Ok(Record::from_slice(&[
            ("td_error", RecordValue::Scalar(abs_td_err / n)),
            ("n_states", RecordValue::Scalar(self.q_table.len() as f32)),
        ]))
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        let mut entries: Vec<Entry> = self
            .q_table
            .iter()
            .map(|(state, values)| Entry {
                state: *state,
                values: values.clone(),
            })
            .collect();
        entries.sort_by_key(|e| e.state);
        fs::write(path, serde_json::to_string(&entries)?)
            .with_context(|| format!("Failed to save Q-table to {:?}", path))?;
        info!("Saved Q-table with {} states to {:?}", entries.len(), path);
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to load Q-table from {:?}", path))?;
        let entries: Vec<Entry> = serde_json::from_str(&text)?;
        let mut q_table = HashMap::with_capacity(entries.len());
        for e in entries {
            if e.values.len() != self.catalogue.len() {
                bail!(
                    "{} action values in {:?}, expected {}",
                    e.values.len(),
                    path,
                    self.catalogue.len()
                );
            }
            q_table.insert(e.state, e.values);
        }
        self.q_table = q_table;
        info!("Loaded Q-table with {} states from {:?}", self.q_table.len(), path);
        Ok(())
    }
}
