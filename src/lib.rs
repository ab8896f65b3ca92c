//! Conductor drives multi-task development work through an external agent
//! service: it schedules a dependency graph of tasks, dispatches each as a
//! remote job under a concurrency ceiling, then loops execution through
//! validation gates until they pass or the cycle budget runs out.

pub mod agent;
pub mod breakpoint;
pub mod config;
pub mod errors;
pub mod gates;
pub mod git;
pub mod issues;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod queue;
pub mod report;
pub mod task;
pub mod template;
pub mod ui;
