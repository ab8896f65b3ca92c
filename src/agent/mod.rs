//! Remote agent service interface.
//!
//! The orchestrator treats agent execution as an external collaborator with a
//! minimal surface: create a job, poll its status, request a stop. The default
//! implementation is the REST client in [`http`]; tests substitute scripted
//! mocks through the same trait.

pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpAgentService;

/// Opaque handle to an in-flight external job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub String);

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status reported by the agent service for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Creating,
    Running,
    Finished,
    Failed,
    Stopped,
    Expired,
}

impl JobState {
    /// Whether the job will never produce further status changes.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Failed | Self::Stopped | Self::Expired
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Creating => "creating",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// One poll response from the agent service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPoll {
    pub state: JobState,
    /// Reference to the job output once finished (artifact id or URL).
    #[serde(default)]
    pub result_ref: Option<String>,
    /// Failure detail reported by the service.
    #[serde(default)]
    pub error: Option<String>,
}

/// Everything the agent service needs to execute one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub task_id: String,
    pub name: String,
    /// Fully composed prompt (global context, dependency summaries, task
    /// instructions).
    pub prompt: String,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// External long-running agent execution service.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Request creation of a job. Returns the handle used for polling and
    /// cancellation.
    async fn create_job(&self, payload: &JobPayload) -> Result<JobHandle>;

    /// Poll a job's current status.
    async fn poll_job(&self, handle: &JobHandle) -> Result<JobPoll>;

    /// Request cancellation. Callers treat errors as best-effort only.
    async fn stop_job(&self, handle: &JobHandle) -> Result<()>;
}
