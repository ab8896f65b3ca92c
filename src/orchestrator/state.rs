//! Run snapshot persistence.
//!
//! A snapshot of the run is written whenever the task set changes shape (run
//! start, job spawn, terminal events) so a crashed run leaves enough on disk
//! to inspect or resume from. The file is removed when the run completes.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::task::Task;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Stable identifier for this run across snapshot updates.
    pub run_id: Uuid,
    pub template: String,
    pub repository: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tasks: Vec<Task>,
    /// task id -> agent job id, for jobs in flight at snapshot time.
    pub active_agents: HashMap<String, String>,
}

impl RunSnapshot {
    pub fn new(template: impl Into<String>, repository: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            template: template.into(),
            repository,
            started_at: now,
            updated_at: now,
            tasks: Vec::new(),
            active_agents: HashMap::new(),
        }
    }
}

pub trait StateStore: Send + Sync {
    fn save(&self, snapshot: &RunSnapshot) -> Result<()>;
    fn load(&self) -> Result<Option<RunSnapshot>>;
    fn clear(&self) -> Result<()>;
}

/// Pretty-printed JSON file under the project state directory.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for JsonStateStore {
    fn save(&self, snapshot: &RunSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "saved run snapshot");
        Ok(())
    }

    fn load(&self) -> Result<Option<RunSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&json)
            .with_context(|| format!("corrupt snapshot at {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}
