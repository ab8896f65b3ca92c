//! Dependency-aware task queue.
//!
//! Two pieces:
//!
//! 1. **Builder**: validates a task set into a [`TaskGraph`] (duplicate ids,
//!    unknown dependencies, and cycles are rejected before anything runs)
//! 2. **Scheduler**: the [`TaskQueue`] state machine that owns every task
//!    record, computes which tasks are unblocked, and is the single source of
//!    truth for "is everything done"
//!
//! ## Example
//!
//! ```no_run
//! use conductor::queue::TaskQueue;
//! use conductor::task::{TaskInput, TaskResult};
//!
//! # fn example() -> Result<(), conductor::errors::GraphError> {
//! let mut queue = TaskQueue::from_inputs(vec![
//!     TaskInput::new("schema", "Schema", "Design the schema"),
//!     TaskInput::new("api", "API", "Build the API")
//!         .with_depends_on(vec!["schema".to_string()]),
//! ])?;
//!
//! // Only "schema" is ready; "api" unblocks once it completes.
//! let ready = queue.ready_tasks();
//! assert_eq!(ready[0].id(), "schema");
//!
//! queue.mark_running("schema", "job-1");
//! queue.mark_completed("schema", TaskResult::new(None, None));
//! assert_eq!(queue.ready_tasks()[0].id(), "api");
//! # Ok(())
//! # }
//! ```

mod builder;
mod scheduler;

pub use builder::{GraphBuilder, TaskGraph, TaskIndex};
pub use scheduler::TaskQueue;
