//! Template loading: the declared task set, validation gates, and pipeline
//! settings for one run.
//!
//! Templates are YAML files:
//!
//! ```yaml
//! name: checkout-flow
//! repository: acme/storefront
//! base_branch: main
//! max_cycles: 3
//! context: |
//!   The storefront is a Next.js app; follow the existing service patterns.
//! scope:
//!   - Do not touch the payments service
//! tasks:
//!   - id: schema
//!     name: Cart schema
//!     prompt: Add the cart tables and migrations
//!   - id: api
//!     name: Cart API
//!     prompt: Implement the cart endpoints
//!     depends_on: [schema]
//!     breakpoint: true
//! gates:
//!   - name: typecheck
//!     command: npm run typecheck
//!   - name: unit
//!     command: npm test
//! ```

use crate::errors::TemplateError;
use crate::gates::Gate;
use crate::queue::GraphBuilder;
use crate::task::TaskInput;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_max_cycles() -> usize {
    3
}

/// A declared run: tasks, gates, and pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    /// Default target repository for all tasks.
    #[serde(default)]
    pub repository: Option<String>,
    /// Integration branch completed work is merged into before validation.
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    /// Global context prepended to every task prompt.
    #[serde(default)]
    pub context: String,
    /// Scope constraints repeated in retry prompts.
    #[serde(default)]
    pub scope: Vec<String>,
    /// QA cycle ceiling before escalation.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: usize,
    pub tasks: Vec<TaskInput>,
    #[serde(default)]
    pub gates: Vec<Gate>,
}

impl Template {
    /// Load and validate a template from a YAML file.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let template: Template =
            serde_yaml::from_str(&content).map_err(|source| TemplateError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        template.validate()?;
        Ok(template)
    }

    /// Validate structure: non-empty name and task set, well-formed gates, and
    /// a valid dependency graph.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::Invalid("template name is empty".into()));
        }
        if self.tasks.is_empty() {
            return Err(TemplateError::Invalid("template declares no tasks".into()));
        }
        for task in &self.tasks {
            if task.id.trim().is_empty() {
                return Err(TemplateError::Invalid(format!(
                    "task '{}' has an empty id",
                    task.name
                )));
            }
        }
        for gate in &self.gates {
            if gate.manual == gate.command.is_some() {
                return Err(TemplateError::Invalid(format!(
                    "gate '{}' must have exactly one of 'command' or 'manual: true'",
                    gate.name
                )));
            }
        }

        // Full graph validation (duplicates, unknown deps, cycles) up front,
        // so `check` reports the same errors a run would.
        GraphBuilder::new(self.tasks.clone()).build()?;

        Ok(())
    }

    /// The repository a task targets, honoring the per-task override.
    pub fn repository_for(&self, task: &TaskInput) -> Option<String> {
        task.repository.clone().or_else(|| self.repository.clone())
    }
}
