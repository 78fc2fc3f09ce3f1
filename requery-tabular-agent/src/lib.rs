//! Tabular query rewriting agents.
//!
//! These agents keep their parameters in plain vectors and maps, so they need no tensor
//! backend and their checkpoints are small JSON files.
//!
//! * [`ReinforcePolicy`] keeps a probability per action and reinforces actions that
//!   received a positive reward.
//! * [`QTableAgent`] learns action values per discretized state with one-step
//!   Q-learning and acts epsilon-greedily.
mod qtable;
mod reinforce;
pub use qtable::{QTableAgent, QTableConfig};
pub use reinforce::{ReinforceConfig, ReinforcePolicy};
