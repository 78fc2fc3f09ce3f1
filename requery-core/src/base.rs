//! Core functionalities.
mod agent;
mod env;
mod policy;
mod step;
pub use agent::Agent;
pub use env::Env;
pub use policy::{ActionSample, Configurable, Policy};
pub use step::{Info, Step};
