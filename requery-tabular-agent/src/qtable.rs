//! Tabular Q-learning.
mod base;
mod config;
pub use base::QTableAgent;
pub use config::QTableConfig;
