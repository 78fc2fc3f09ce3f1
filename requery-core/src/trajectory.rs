//! Transitions collected in an episode.
use crate::FEATURE_DIM;
use serde::{Deserialize, Serialize};

/// A transition `(s_t, a_t, log pi(a_t|s_t), r_t, s_t+1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Features of the state the action was taken in.
    pub state: [f32; FEATURE_DIM],

    /// Index of the action.
    pub action_index: usize,

    /// Log-probability of the action when the policy provides one.
    pub log_prob: Option<f32>,

    /// Reward.
    pub reward: f32,

    /// Features of the next state.
    pub next_state: [f32; FEATURE_DIM],
}

/// Ordered transitions of a single episode.
///
/// A trajectory is moved into [`Agent::update`](crate::Agent::update) and not used
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory(Vec<Transition>);

impl Trajectory {
    /// Creates an empty trajectory.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a transition.
    pub fn push(&mut self, transition: Transition) {
        self.0.push(transition);
    }

    /// The number of transitions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no transition has been pushed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the transitions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Transition> {
        self.0.iter()
    }

    /// Rewards in order.
    pub fn rewards(&self) -> Vec<f32> {
        self.0.iter().map(|t| t.reward).collect()
    }

    /// Undiscounted sum of rewards.
    pub fn total_reward(&self) -> f32 {
        self.0.iter().map(|t| t.reward).sum()
    }

    /// Discounted returns `G_t = r_t + discount_factor * G_t+1` with `G_T = 0`.
    pub fn discounted_returns(&self, discount_factor: f64) -> Vec<f32> {
        let mut returns = vec![0f32; self.0.len()];
        let mut g = 0f64;
        for (i, t) in self.0.iter().enumerate().rev() {
            g = t.reward as f64 + discount_factor * g;
            returns[i] = g as f32;
        }
        returns
    }
}

impl IntoIterator for Trajectory {
    type Item = Transition;
    type IntoIter = std::vec::IntoIter<Transition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<Vec<Transition>> for Trajectory {
    fn from(transitions: Vec<Transition>) -> Self {
        Self(transitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(reward: f32) -> Transition {
        Transition {
            state: [0.0; FEATURE_DIM],
            action_index: 0,
            log_prob: None,
            reward,
            next_state: [0.0; FEATURE_DIM],
        }
    }

    #[test]
    fn test_discounted_returns() {
        let trajectory: Trajectory = vec![transition(1.0), transition(0.0), transition(2.0)].into();
        let returns = trajectory.discounted_returns(0.5);
        assert_eq!(returns, vec![1.5, 1.0, 2.0]);
        assert_eq!(trajectory.total_reward(), 3.0);
    }

    #[test]
    fn test_empty() {
        let trajectory = Trajectory::new();
        assert!(trajectory.discounted_returns(0.99).is_empty());
        assert_eq!(trajectory.total_reward(), 0.0);
    }
}
