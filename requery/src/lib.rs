//! Learning search query rewrites with reinforcement learning.
//!
//! requery consists of the following crates:
//!
//! * [requery-core](requery_core) provides the traits shared by environments and agents,
//!   the action catalogue, trajectories, records and the [`Trainer`](requery_core::Trainer).
//! * [requery-env](requery_env) implements the query rewriting environment on top of a
//!   BM25 retriever, the reward model and the evaluation of rewriting methods.
//! * [requery-tabular-agent](requery_tabular_agent) includes agents without a tensor
//!   backend: a positive-only REINFORCE policy and a tabular Q-learning baseline.
//! * [requery-candle-agent](requery_candle_agent) includes an actor-critic agent based on
//!   [candle](https://crates.io/crates/candle-core).
//!
//! This crate ties them together with a YAML configuration ([`RequeryConfig`]) and the
//! functions behind the `requery` binary: [`train`], [`evaluate`] and [`rewrite`].
mod config;
pub mod run;
pub use config::{AgentKind, RequeryConfig};
pub use run::{evaluate, rewrite, train, RewriteOutcome};
