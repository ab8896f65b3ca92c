//! The task queue: single source of truth for task state.
//!
//! The queue owns every task record and the completed-id set, and exposes
//! exactly which tasks are runnable right now. All status transitions go
//! through its methods; the orchestrator never mutates a task directly.
//!
//! Transition rules worth calling out:
//! - A retried task is re-readied, not reset to pending: its dependencies were
//!   already satisfied to get it running, so the dependency check is skipped.
//! - A paused-at-breakpoint task is *not* added to the completed set until it
//!   is explicitly resumed, which is what holds its dependents back.
//! - When a task exhausts its retry budget, every pending task that
//!   transitively depends on it is failed as well; otherwise the run could
//!   never reach `all_complete`.

use crate::errors::GraphError;
use crate::queue::builder::{GraphBuilder, TaskGraph, TaskIndex};
use crate::task::{Task, TaskInput, TaskResult, TaskStatus};
use std::cmp::Reverse;
use std::collections::HashSet;

/// Dependency-aware task queue.
#[derive(Debug)]
pub struct TaskQueue {
    graph: TaskGraph,
    tasks: Vec<Task>,
    completed: HashSet<TaskIndex>,
}

impl TaskQueue {
    /// Build a queue from task definitions.
    ///
    /// Validates the graph (duplicates, unknown dependencies, cycles) before
    /// anything runs. Tasks flagged `complete` are immediately marked completed
    /// with a synthetic result and zero attempts; their presence unblocks
    /// dependents but they are never offered for dispatch. A final pass
    /// promotes every pending task whose dependencies are all satisfied.
    pub fn from_inputs(inputs: Vec<TaskInput>) -> Result<Self, GraphError> {
        let graph = GraphBuilder::new(inputs).build()?;
        let tasks: Vec<Task> = graph.inputs().iter().cloned().map(Task::new).collect();

        let mut queue = Self {
            graph,
            tasks,
            completed: HashSet::new(),
        };

        for idx in 0..queue.tasks.len() {
            if queue.tasks[idx].input.complete {
                queue.tasks[idx].status = TaskStatus::Completed;
                queue.tasks[idx].result = Some(TaskResult::synthetic());
                queue.completed.insert(idx);
            }
        }
        queue.refresh_ready();

        Ok(queue)
    }

    /// Promote pending tasks whose dependencies are all completed.
    fn refresh_ready(&mut self) {
        for idx in 0..self.tasks.len() {
            if self.tasks[idx].status == TaskStatus::Pending
                && self.graph.dependencies_satisfied(idx, &self.completed)
            {
                self.tasks[idx].status = TaskStatus::Ready;
            }
        }
    }

    /// All ready tasks, sorted by descending priority; ties keep declaration
    /// order (stable sort). Does not mutate state; callers claim a task via
    /// [`mark_running`](Self::mark_running).
    pub fn ready_tasks(&self) -> Vec<&Task> {
        let mut ready: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.status.is_ready())
            .collect();
        ready.sort_by_key(|t| Reverse(t.input.priority));
        ready
    }

    /// Look up a task by id.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.graph.index_of(id).and_then(|i| self.tasks.get(i))
    }

    /// All task records.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Completed records of the given task's dependencies, in declaration
    /// order. Used to assemble dependency summaries for the execution payload.
    pub fn completed_dependencies(&self, id: &str) -> Vec<&Task> {
        let Some(idx) = self.graph.index_of(id) else {
            return Vec::new();
        };
        self.graph
            .dependencies(idx)
            .iter()
            .filter_map(|&dep| self.tasks.get(dep))
            .filter(|t| t.status == TaskStatus::Completed)
            .collect()
    }

    /// `Ready → Running`: claim a task for execution, record the external job
    /// handle, and count the attempt. Unknown or non-ready ids are a no-op.
    pub fn mark_running(&mut self, id: &str, agent_id: &str) {
        if let Some(idx) = self.graph.index_of(id)
            && self.tasks[idx].status.is_ready()
        {
            let task = &mut self.tasks[idx];
            task.status = TaskStatus::Running;
            task.attempts += 1;
            task.agent_id = Some(agent_id.to_string());
        }
    }

    /// `Running → Completed`: record the result, add to the completed set, and
    /// recompute readiness for pending tasks.
    pub fn mark_completed(&mut self, id: &str, result: TaskResult) {
        if let Some(idx) = self.graph.index_of(id)
            && self.tasks[idx].status.is_running()
        {
            self.tasks[idx].status = TaskStatus::Completed;
            self.tasks[idx].result = Some(result);
            self.tasks[idx].agent_id = None;
            self.completed.insert(idx);
            self.refresh_ready();
        }
    }

    /// `Running → Ready` while the retry budget holds, `Running → Failed` once
    /// it is spent. The re-ready path deliberately bypasses the dependency
    /// recheck: dependencies were already satisfied to get here.
    pub fn mark_failed(&mut self, id: &str, error: &str, default_max_retries: u32) {
        if let Some(idx) = self.graph.index_of(id)
            && self.tasks[idx].status.is_running()
        {
            self.tasks[idx].error = Some(error.to_string());
            self.tasks[idx].agent_id = None;
            let budget = self.tasks[idx].retry_budget(default_max_retries);
            if self.tasks[idx].attempts < budget {
                self.tasks[idx].status = TaskStatus::Ready;
            } else {
                self.tasks[idx].status = TaskStatus::Failed;
                self.fail_dependents(idx);
            }
        }
    }

    /// Record a job-creation failure for a still-ready task.
    ///
    /// Creation failures consume the same retry budget as execution failures:
    /// the attempt is counted even though the task never left `Ready`.
    pub fn mark_spawn_failed(&mut self, id: &str, error: &str, default_max_retries: u32) {
        if let Some(idx) = self.graph.index_of(id)
            && self.tasks[idx].status.is_ready()
        {
            self.tasks[idx].attempts += 1;
            self.tasks[idx].error = Some(error.to_string());
            let budget = self.tasks[idx].retry_budget(default_max_retries);
            if self.tasks[idx].attempts >= budget {
                self.tasks[idx].status = TaskStatus::Failed;
                self.fail_dependents(idx);
            }
        }
    }

    /// `Running → PausedAtBreakpoint`: the result is recorded but the task is
    /// *not* added to the completed set and dependents are *not* recomputed;
    /// that is what blocks downstream work while awaiting human review.
    pub fn mark_paused_at_breakpoint(&mut self, id: &str, result: TaskResult) {
        if let Some(idx) = self.graph.index_of(id)
            && self.tasks[idx].status.is_running()
        {
            self.tasks[idx].status = TaskStatus::PausedAtBreakpoint;
            self.tasks[idx].result = Some(result);
            self.tasks[idx].agent_id = None;
        }
    }

    /// `PausedAtBreakpoint → Completed`: deferred completion. Adds to the
    /// completed set and recomputes dependents, same effect as a normal
    /// completion.
    pub fn resume_from_breakpoint(&mut self, id: &str) {
        if let Some(idx) = self.graph.index_of(id)
            && self.tasks[idx].status.is_paused()
        {
            self.tasks[idx].status = TaskStatus::Completed;
            self.completed.insert(idx);
            self.refresh_ready();
        }
    }

    /// Fail every pending task that transitively depends on a terminally
    /// failed task.
    fn fail_dependents(&mut self, failed_idx: TaskIndex) {
        let failed_id = self.tasks[failed_idx].input.id.clone();
        let dependents: Vec<TaskIndex> = self.graph.dependents(failed_idx).to_vec();
        for dep_idx in dependents {
            if self.tasks[dep_idx].status == TaskStatus::Pending {
                self.tasks[dep_idx].status = TaskStatus::Failed;
                self.tasks[dep_idx].error = Some(format!("dependency {failed_id} failed"));
                self.fail_dependents(dep_idx);
            }
        }
    }

    /// The run is complete only when every task is terminal and none remains
    /// paused at a breakpoint. A paused task always suppresses this signal
    /// until it is resumed or the run is aborted.
    pub fn all_complete(&self) -> bool {
        self.tasks.iter().all(|t| t.status.is_terminal())
    }

    /// Completed task records.
    pub fn completed_tasks(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .cloned()
            .collect()
    }

    /// Terminally failed task records.
    pub fn failed_tasks(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, deps: Vec<&str>) -> TaskInput {
        TaskInput::new(id, &format!("Task {id}"), &format!("do {id}"))
            .with_depends_on(deps.into_iter().map(String::from).collect())
    }

    fn queue(inputs: Vec<TaskInput>) -> TaskQueue {
        TaskQueue::from_inputs(inputs).unwrap()
    }

    #[test]
    fn test_no_dependency_tasks_ready_on_insert() {
        let q = queue(vec![task("a", vec![]), task("b", vec!["a"])]);
        let ready = q.ready_tasks();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id(), "a");
        assert_eq!(q.get("b").unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn test_ready_order_priority_then_declaration() {
        let q = queue(vec![
            task("low", vec![]).with_priority(1),
            task("high", vec![]).with_priority(10),
            task("mid-first", vec![]).with_priority(5),
            task("mid-second", vec![]).with_priority(5),
        ]);
        let ids: Vec<&str> = q.ready_tasks().iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["high", "mid-first", "mid-second", "low"]);
    }

    #[test]
    fn test_seed_complete_unblocks_dependents_without_dispatch() {
        let q = queue(vec![
            task("seed", vec![]).seeded_complete(),
            task("b", vec!["seed"]),
        ]);
        let seed = q.get("seed").unwrap();
        assert_eq!(seed.status, TaskStatus::Completed);
        assert_eq!(seed.attempts, 0);
        assert!(seed.result.is_some());

        let ready = q.ready_tasks();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id(), "b");
    }

    #[test]
    fn test_multi_dependency_unblocks_only_when_all_satisfied() {
        let mut q = queue(vec![
            task("a", vec![]),
            task("b", vec![]),
            task("c", vec!["a", "b"]),
        ]);
        q.mark_running("a", "job-a");
        q.mark_completed("a", TaskResult::new(None, None));
        assert_eq!(q.get("c").unwrap().status, TaskStatus::Pending);

        q.mark_running("b", "job-b");
        q.mark_completed("b", TaskResult::new(None, None));
        assert_eq!(q.get("c").unwrap().status, TaskStatus::Ready);
    }

    #[test]
    fn test_mark_running_counts_attempt_and_records_handle() {
        let mut q = queue(vec![task("a", vec![])]);
        q.mark_running("a", "job-1");
        let a = q.get("a").unwrap();
        assert_eq!(a.status, TaskStatus::Running);
        assert_eq!(a.attempts, 1);
        assert_eq!(a.agent_id.as_deref(), Some("job-1"));
    }

    #[test]
    fn test_failure_re_readies_within_budget() {
        let mut q = queue(vec![task("a", vec![]).with_retries(2)]);
        q.mark_running("a", "job-1");
        q.mark_failed("a", "boom", 1);
        let a = q.get("a").unwrap();
        assert_eq!(a.status, TaskStatus::Ready);
        assert_eq!(a.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_retry_exhaustion_exact_boundary() {
        // retries = n: failed n times ends terminal.
        let mut q = queue(vec![task("a", vec![]).with_retries(2)]);
        q.mark_running("a", "j1");
        q.mark_failed("a", "e1", 0);
        assert_eq!(q.get("a").unwrap().status, TaskStatus::Ready);
        q.mark_running("a", "j2");
        q.mark_failed("a", "e2", 0);
        assert_eq!(q.get("a").unwrap().status, TaskStatus::Failed);

        // retries = n + 1: one more retry before terminal.
        let mut q = queue(vec![task("a", vec![]).with_retries(3)]);
        q.mark_running("a", "j1");
        q.mark_failed("a", "e1", 0);
        q.mark_running("a", "j2");
        q.mark_failed("a", "e2", 0);
        assert_eq!(q.get("a").unwrap().status, TaskStatus::Ready);
    }

    #[test]
    fn test_terminal_failure_cascades_to_pending_dependents() {
        let mut q = queue(vec![
            task("a", vec![]).with_retries(1),
            task("b", vec!["a"]),
            task("c", vec!["b"]),
            task("d", vec![]),
        ]);
        q.mark_running("a", "j1");
        q.mark_failed("a", "boom", 0);

        assert_eq!(q.get("a").unwrap().status, TaskStatus::Failed);
        assert_eq!(q.get("b").unwrap().status, TaskStatus::Failed);
        assert_eq!(q.get("c").unwrap().status, TaskStatus::Failed);
        assert!(q.get("b").unwrap().error.as_deref().unwrap().contains("a"));
        // Unrelated task is untouched.
        assert_eq!(q.get("d").unwrap().status, TaskStatus::Ready);
    }

    #[test]
    fn test_spawn_failure_consumes_retry_budget() {
        let mut q = queue(vec![task("a", vec![]).with_retries(2)]);
        q.mark_spawn_failed("a", "connect refused", 0);
        let a = q.get("a").unwrap();
        assert_eq!(a.status, TaskStatus::Ready);
        assert_eq!(a.attempts, 1);

        q.mark_spawn_failed("a", "connect refused", 0);
        assert_eq!(q.get("a").unwrap().status, TaskStatus::Failed);
    }

    #[test]
    fn test_breakpoint_blocks_dependents_until_resume() {
        let mut q = queue(vec![
            task("a", vec![]).with_breakpoint(true),
            task("b", vec!["a"]),
        ]);
        q.mark_running("a", "j1");
        q.mark_paused_at_breakpoint("a", TaskResult::new(Some("feat/a".into()), None));

        assert_eq!(q.get("a").unwrap().status, TaskStatus::PausedAtBreakpoint);
        assert_eq!(q.get("b").unwrap().status, TaskStatus::Pending);
        assert!(!q.all_complete());

        q.resume_from_breakpoint("a");
        assert_eq!(q.get("a").unwrap().status, TaskStatus::Completed);
        assert_eq!(q.get("b").unwrap().status, TaskStatus::Ready);
    }

    #[test]
    fn test_paused_task_suppresses_all_complete() {
        let mut q = queue(vec![task("a", vec![]).with_breakpoint(true)]);
        q.mark_running("a", "j1");
        q.mark_paused_at_breakpoint("a", TaskResult::new(None, None));
        assert!(!q.all_complete());
        q.resume_from_breakpoint("a");
        assert!(q.all_complete());
    }

    #[test]
    fn test_all_complete_with_mixed_outcomes() {
        let mut q = queue(vec![task("a", vec![]), task("b", vec![]).with_retries(1)]);
        q.mark_running("a", "j1");
        q.mark_completed("a", TaskResult::new(None, None));
        assert!(!q.all_complete());

        q.mark_running("b", "j2");
        q.mark_failed("b", "boom", 0);
        assert!(q.all_complete());
        assert_eq!(q.completed_tasks().len(), 1);
        assert_eq!(q.failed_tasks().len(), 1);
    }

    #[test]
    fn test_no_transition_out_of_terminal_states() {
        let mut q = queue(vec![task("a", vec![])]);
        q.mark_running("a", "j1");
        q.mark_completed("a", TaskResult::new(None, None));

        q.mark_running("a", "j2");
        assert_eq!(q.get("a").unwrap().status, TaskStatus::Completed);
        assert_eq!(q.get("a").unwrap().attempts, 1);

        q.mark_failed("a", "late callback", 0);
        assert_eq!(q.get("a").unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn test_unknown_id_operations_are_no_ops() {
        let mut q = queue(vec![task("a", vec![])]);
        q.mark_running("ghost", "j1");
        q.mark_completed("ghost", TaskResult::new(None, None));
        q.mark_failed("ghost", "e", 0);
        q.resume_from_breakpoint("ghost");
        assert_eq!(q.get("a").unwrap().status, TaskStatus::Ready);
    }

    #[test]
    fn test_retry_skips_dependency_recheck() {
        let mut q = queue(vec![task("a", vec![]), task("b", vec!["a"])]);
        q.mark_running("a", "j1");
        q.mark_completed("a", TaskResult::new(None, None));
        q.mark_running("b", "j2");
        q.mark_failed("b", "flaky", 2);
        // Re-readied directly, not re-pended.
        assert_eq!(q.get("b").unwrap().status, TaskStatus::Ready);
    }

    #[test]
    fn test_completed_dependencies_for_payload() {
        let mut q = queue(vec![
            task("a", vec![]),
            task("b", vec![]),
            task("c", vec!["a", "b"]),
        ]);
        q.mark_running("a", "j1");
        q.mark_completed("a", TaskResult::new(Some("feat/a".into()), None));
        assert_eq!(q.completed_dependencies("c").len(), 1);

        q.mark_running("b", "j2");
        q.mark_completed("b", TaskResult::new(None, None));
        let deps = q.completed_dependencies("c");
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].id(), "a");
    }

    #[test]
    fn test_graph_validation_rejects_cycle_before_execution() {
        let result = TaskQueue::from_inputs(vec![
            task("a", vec!["b"]),
            task("b", vec!["a"]),
        ]);
        assert!(matches!(result, Err(GraphError::CycleDetected { .. })));
    }
}
