//! Core task model: definitions, lifecycle status, and results.
//!
//! A [`TaskInput`] is the immutable definition of a unit of work as declared in
//! a template. A [`Task`] wraps the input with the runtime fields that are
//! mutated exclusively by the queue during a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Definition of a unit of work, as declared in a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInput {
    /// Unique identifier, stable across the run.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Instructions sent to the agent for this task.
    #[serde(default)]
    pub prompt: String,
    /// Ids of tasks that must complete before this one becomes eligible.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Higher priority is dispatched first among ready tasks.
    #[serde(default)]
    pub priority: i32,
    /// Target working branch for the agent job.
    #[serde(default)]
    pub branch: Option<String>,
    /// Per-task timeout override, in minutes.
    #[serde(default)]
    pub timeout_minutes: Option<u64>,
    /// Per-task max attempts override.
    #[serde(default)]
    pub retries: Option<u32>,
    /// Execution model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Target repository override.
    #[serde(default)]
    pub repository: Option<String>,
    /// Files the task will likely touch, included in the payload context.
    #[serde(default)]
    pub files: Vec<String>,
    /// Pause for human review after this task completes, before unblocking
    /// dependents.
    #[serde(default)]
    pub breakpoint: bool,
    /// Seed flag: treat as already satisfied without execution.
    #[serde(default)]
    pub complete: bool,
}

impl TaskInput {
    /// Create a task definition with the given id, name and prompt.
    pub fn new(id: &str, name: &str, prompt: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            prompt: prompt.to_string(),
            depends_on: Vec::new(),
            priority: 0,
            branch: None,
            timeout_minutes: None,
            retries: None,
            model: None,
            repository: None,
            files: Vec::new(),
            breakpoint: false,
            complete: false,
        }
    }

    /// Add dependencies on other task ids.
    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// Set the scheduling priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the target working branch.
    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    /// Set the max-attempts override.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Mark as a breakpoint task.
    pub fn with_breakpoint(mut self, breakpoint: bool) -> Self {
        self.breakpoint = breakpoint;
        self
    }

    /// Mark as already satisfied (seed-complete).
    pub fn seeded_complete(mut self) -> Self {
        self.complete = true;
        self
    }
}

/// Lifecycle status of a task.
///
/// Transitions: `Pending → Ready → Running → {Completed | Failed}`, with the
/// retry path `Running → Ready` while attempts remain, and the breakpoint path
/// `Running → PausedAtBreakpoint → Completed`. `Completed` and `Failed` are
/// absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for dependencies.
    #[default]
    Pending,
    /// All dependencies completed; eligible for dispatch.
    Ready,
    /// An external job is in flight for this task.
    Running,
    /// Completed, but awaiting a human decision before unblocking dependents.
    PausedAtBreakpoint,
    /// Terminal success.
    Completed,
    /// Terminal failure (retry budget exhausted or dependency failed).
    Failed,
}

impl TaskStatus {
    /// Terminal means the task will never run again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::PausedAtBreakpoint)
    }
}

/// Outcome recorded when a task reaches `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Branch the work landed on, if any.
    pub branch: Option<String>,
    /// External reference to the job output (agent-side artifact id or URL).
    pub output_ref: Option<String>,
    /// When the task completed.
    pub completed_at: DateTime<Utc>,
}

impl TaskResult {
    /// Result for a finished external job.
    pub fn new(branch: Option<String>, output_ref: Option<String>) -> Self {
        Self {
            branch,
            output_ref,
            completed_at: Utc::now(),
        }
    }

    /// Synthetic result for seed-complete tasks that never executed.
    pub fn synthetic() -> Self {
        Self {
            branch: None,
            output_ref: None,
            completed_at: Utc::now(),
        }
    }
}

/// A task with its runtime state.
///
/// Runtime fields are mutated only through `TaskQueue` methods; the
/// orchestrator never writes them directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(flatten)]
    pub input: TaskInput,
    /// Current lifecycle status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Handle of the external job currently or last bound to this task.
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Count of execution starts.
    #[serde(default)]
    pub attempts: u32,
    /// Last failure message.
    #[serde(default)]
    pub error: Option<String>,
    /// Completion result, once reached.
    #[serde(default)]
    pub result: Option<TaskResult>,
}

impl Task {
    /// Wrap a definition in its initial runtime state.
    pub fn new(input: TaskInput) -> Self {
        Self {
            input,
            status: TaskStatus::Pending,
            agent_id: None,
            attempts: 0,
            error: None,
            result: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.input.id
    }

    /// Max attempts for this task, falling back to the run default.
    pub fn retry_budget(&self, default_max_retries: u32) -> u32 {
        self.input.retries.unwrap_or(default_max_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_input_builder() {
        let input = TaskInput::new("api", "API layer", "Build the API")
            .with_depends_on(vec!["schema".to_string()])
            .with_priority(5)
            .with_branch("feat/api")
            .with_retries(3)
            .with_breakpoint(true);

        assert_eq!(input.id, "api");
        assert_eq!(input.depends_on, vec!["schema"]);
        assert_eq!(input.priority, 5);
        assert_eq!(input.branch.as_deref(), Some("feat/api"));
        assert_eq!(input.retries, Some(3));
        assert!(input.breakpoint);
        assert!(!input.complete);
    }

    #[test]
    fn test_status_predicates() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::PausedAtBreakpoint.is_terminal());
        assert!(TaskStatus::PausedAtBreakpoint.is_paused());
        assert!(!TaskStatus::Pending.is_ready());
        assert!(TaskStatus::Ready.is_ready());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::PausedAtBreakpoint).unwrap();
        assert_eq!(json, "\"paused_at_breakpoint\"");
    }

    #[test]
    fn test_retry_budget_prefers_task_override() {
        let mut task = Task::new(TaskInput::new("a", "A", ""));
        assert_eq!(task.retry_budget(2), 2);
        task.input.retries = Some(5);
        assert_eq!(task.retry_budget(2), 5);
    }

    #[test]
    fn test_task_serialization_flattens_input() {
        let task = Task::new(TaskInput::new("a", "A", "do a"));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], "a");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["attempts"], 0);
    }

    #[test]
    fn test_input_defaults_from_minimal_yaml() {
        let input: TaskInput = serde_yaml::from_str("id: a\nname: A\n").unwrap();
        assert_eq!(input.id, "a");
        assert!(input.prompt.is_empty());
        assert!(input.depends_on.is_empty());
        assert_eq!(input.priority, 0);
        assert!(!input.breakpoint);
        assert!(!input.complete);
    }
}
