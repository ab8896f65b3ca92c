//! Typed error hierarchy for the Conductor core.
//!
//! Two enums cover the failures that must abort a run before or during
//! construction:
//! - `GraphError`: task-set validation failures (duplicates, unknown
//!   dependencies, cycles), always fatal and always raised before any job starts
//! - `TemplateError`: template file loading and validation failures
//!
//! Everything downstream of a validated task set uses `anyhow::Result` with
//! context, since per-task failures are recorded against the task rather than
//! propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from task-graph validation.
///
/// All variants are raised at queue construction time, before any external
/// job is created.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Duplicate task id: {id}")]
    DuplicateTask { id: String },

    #[error("Unknown dependency '{dependency}' in task '{task}': no task with that id exists")]
    UnknownDependency { task: String, dependency: String },

    #[error("Cycle detected in task dependencies. Involved tasks: {involved:?}")]
    CycleDetected { involved: Vec<String> },
}

/// Errors from template loading and validation.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse template at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid template: {0}")]
    Invalid(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
