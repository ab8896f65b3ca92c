//! Bounded-concurrency task dispatch against the agent service.
//!
//! [`runner::Orchestrator`] owns the event loop that moves a [`crate::queue::TaskQueue`]
//! to quiescence; [`state`] persists run snapshots so interrupted runs can be
//! inspected.

pub mod runner;
pub mod state;

pub use runner::{Orchestrator, OrchestratorConfig, RunReport};
pub use state::{JsonStateStore, RunSnapshot, StateStore};
