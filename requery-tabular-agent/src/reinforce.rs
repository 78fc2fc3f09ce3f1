//! Positive-only REINFORCE over action probabilities.
mod base;
mod config;
pub use base::ReinforcePolicy;
pub use config::ReinforceConfig;
