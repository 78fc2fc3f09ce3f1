//! Environment step.
use super::Env;
use crate::EpisodeState;

/// Additional information to [`EpisodeState`] and reward.
pub trait Info {}

impl Info for () {}

/// Represents an action, next state and reward tuple `(a_t, s_t+1, r_t)`
/// with some additional information.
///
/// An environment emits a [`Step`] object at every interaction step.
/// Together with the state the action was taken in, it forms a
/// [`Transition`](crate::Transition).
pub struct Step<E: Env> {
    /// Index of the action taken.
    pub act: usize,

    /// State after the action.
    pub obs: EpisodeState,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if the episode ended with this step.
    pub is_done: bool,

    /// Information defined by the environment.
    pub info: E::Info,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(obs: EpisodeState, act: usize, reward: f32, is_done: bool, info: E::Info) -> Self {
        Step {
            act,
            obs,
            reward,
            is_done,
            info,
        }
    }

    #[inline]
    /// Returns `true` if the episode ended.
    pub fn is_done(&self) -> bool {
        self.is_done
    }
}
