//! Bounded-concurrency dispatch of ready tasks to the agent service.
//!
//! The orchestrator is a single event loop over one mpsc channel. All queue
//! mutation happens in the loop; spawned helpers (job creation, polling,
//! timeouts, breakpoint prompts) only send events back. A task counts toward
//! the concurrency ceiling from the moment its job creation is requested, so
//! slow creations can never over-commit the ceiling.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::agent::{AgentService, JobHandle, JobState};
use crate::breakpoint::{BreakpointDecision, BreakpointHandler, BreakpointPrompt};
use crate::orchestrator::state::{RunSnapshot, StateStore};
use crate::prompts::build_job_payload;
use crate::queue::TaskQueue;
use crate::task::{Task, TaskResult};
use crate::template::Template;

/// Runtime knobs for one orchestrator run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_concurrent: usize,
    pub default_timeout: Duration,
    pub default_retries: u32,
    pub poll_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            default_timeout: Duration::from_secs(30 * 60),
            default_retries: 2,
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_default_retries(mut self, retries: u32) -> Self {
        self.default_retries = retries;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Final state of one orchestrator run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub completed: Vec<Task>,
    pub failed: Vec<Task>,
    /// All tasks in their final state, definition order.
    pub tasks: Vec<Task>,
    /// True when an operator aborted at a breakpoint.
    pub aborted: bool,
}

enum JobOutcome {
    Finished { result_ref: Option<String> },
    Failed { error: String },
    Cancelled { reason: String },
}

enum Event {
    JobCreated { task_id: String, handle: JobHandle },
    JobCreateFailed { task_id: String, error: String },
    JobTerminal { task_id: String, outcome: JobOutcome },
    JobTimedOut { task_id: String },
    BreakpointResolved { task_id: String, decision: BreakpointDecision },
}

struct ActiveJob {
    handle: JobHandle,
    poll_task: JoinHandle<()>,
    timeout_task: JoinHandle<()>,
}

impl ActiveJob {
    fn cancel(&self) {
        self.poll_task.abort();
        self.timeout_task.abort();
    }
}

pub struct Orchestrator {
    agent: Arc<dyn AgentService>,
    breakpoints: Arc<dyn BreakpointHandler>,
    store: Arc<dyn StateStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        agent: Arc<dyn AgentService>,
        breakpoints: Arc<dyn BreakpointHandler>,
        store: Arc<dyn StateStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            agent,
            breakpoints,
            store,
            config,
        }
    }

    /// Drive the queue to quiescence: every task terminal, or the run aborted.
    pub async fn run(&self, template: &Template, mut queue: TaskQueue) -> Result<RunReport> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut snapshot = RunSnapshot::new(&template.name, template.repository.clone());
        let mut starting: HashSet<String> = HashSet::new();
        let mut active: HashMap<String, ActiveJob> = HashMap::new();
        let mut aborted = false;

        self.persist(&mut snapshot, &queue, &active);

        loop {
            if !aborted {
                self.fill_slots(template, &queue, &mut starting, &active, &tx);
            }

            let quiescent = starting.is_empty() && active.is_empty();
            if quiescent && (aborted || queue.all_complete()) {
                break;
            }

            let Some(event) = rx.recv().await else { break };
            match event {
                Event::JobCreated { task_id, handle } => {
                    starting.remove(&task_id);
                    if aborted {
                        self.stop_job_in_background(handle);
                        continue;
                    }
                    info!(task = %task_id, job = %handle, "job created");
                    queue.mark_running(&task_id, &handle.0);
                    let timeout = self.timeout_for(queue.get(&task_id));
                    let job = ActiveJob {
                        handle: handle.clone(),
                        poll_task: self.spawn_poll(task_id.clone(), handle.clone(), tx.clone()),
                        timeout_task: self.spawn_timeout(task_id.clone(), timeout, tx.clone()),
                    };
                    active.insert(task_id, job);
                    self.persist(&mut snapshot, &queue, &active);
                }
                Event::JobCreateFailed { task_id, error } => {
                    starting.remove(&task_id);
                    if aborted {
                        continue;
                    }
                    warn!(task = %task_id, error = %error, "job creation failed");
                    queue.mark_spawn_failed(&task_id, &error, self.config.default_retries);
                    self.persist(&mut snapshot, &queue, &active);
                }
                Event::JobTerminal { task_id, outcome } => {
                    let Some(job) = active.remove(&task_id) else {
                        continue;
                    };
                    job.cancel();
                    match outcome {
                        JobOutcome::Finished { result_ref } => {
                            info!(task = %task_id, "task finished");
                            let branch = queue
                                .get(&task_id)
                                .and_then(|t| t.input.branch.clone());
                            let result = TaskResult::new(branch, result_ref);
                            let at_breakpoint = queue
                                .get(&task_id)
                                .is_some_and(|t| t.input.breakpoint);
                            if at_breakpoint {
                                queue.mark_paused_at_breakpoint(&task_id, result);
                                self.spawn_breakpoint(&queue, task_id, tx.clone());
                            } else {
                                queue.mark_completed(&task_id, result);
                            }
                        }
                        JobOutcome::Failed { error } => {
                            warn!(task = %task_id, error = %error, "task failed");
                            queue.mark_failed(&task_id, &error, self.config.default_retries);
                        }
                        JobOutcome::Cancelled { reason } => {
                            warn!(task = %task_id, reason = %reason, "job cancelled");
                            queue.mark_failed(&task_id, &reason, self.config.default_retries);
                        }
                    }
                    self.persist(&mut snapshot, &queue, &active);
                }
                Event::JobTimedOut { task_id } => {
                    let Some(job) = active.remove(&task_id) else {
                        continue;
                    };
                    warn!(task = %task_id, "task timed out");
                    job.cancel();
                    self.stop_job_in_background(job.handle);
                    queue.mark_failed(&task_id, "timeout exceeded", self.config.default_retries);
                    self.persist(&mut snapshot, &queue, &active);
                }
                Event::BreakpointResolved { task_id, decision } => match decision {
                    BreakpointDecision::Continue => {
                        info!(task = %task_id, "breakpoint released");
                        queue.resume_from_breakpoint(&task_id);
                        self.persist(&mut snapshot, &queue, &active);
                    }
                    BreakpointDecision::Abort => {
                        warn!(task = %task_id, "run aborted at breakpoint");
                        aborted = true;
                        for (_, job) in active.drain() {
                            job.cancel();
                            self.stop_job_in_background(job.handle);
                        }
                        self.persist(&mut snapshot, &queue, &active);
                    }
                },
            }
        }

        Ok(RunReport {
            completed: queue.completed_tasks(),
            failed: queue.failed_tasks(),
            tasks: queue.tasks().to_vec(),
            aborted,
        })
    }

    /// Request job creation for ready tasks while slots remain. Selected
    /// tasks enter `starting` immediately so a slow creation still holds its
    /// slot.
    fn fill_slots(
        &self,
        template: &Template,
        queue: &TaskQueue,
        starting: &mut HashSet<String>,
        active: &HashMap<String, ActiveJob>,
        tx: &mpsc::UnboundedSender<Event>,
    ) {
        let slots = self
            .config
            .max_concurrent
            .saturating_sub(starting.len() + active.len());
        let selected: Vec<String> = queue
            .ready_tasks()
            .into_iter()
            .filter(|t| !starting.contains(t.id()))
            .take(slots)
            .map(|t| t.id().to_string())
            .collect();

        for task_id in selected {
            let Some(task) = queue.get(&task_id) else { continue };
            let payload =
                build_job_payload(template, task, &queue.completed_dependencies(&task_id));
            debug!(task = %task_id, "requesting job creation");
            starting.insert(task_id.clone());
            let agent = Arc::clone(&self.agent);
            let tx = tx.clone();
            tokio::spawn(async move {
                let event = match agent.create_job(&payload).await {
                    Ok(handle) => Event::JobCreated { task_id, handle },
                    Err(err) => Event::JobCreateFailed {
                        task_id,
                        error: err.to_string(),
                    },
                };
                let _ = tx.send(event);
            });
        }
    }

    fn timeout_for(&self, task: Option<&Task>) -> Duration {
        task.and_then(|t| t.input.timeout_minutes)
            .map(|m| Duration::from_secs(m * 60))
            .unwrap_or(self.config.default_timeout)
    }

    fn spawn_poll(
        &self,
        task_id: String,
        handle: JobHandle,
        tx: mpsc::UnboundedSender<Event>,
    ) -> JoinHandle<()> {
        let agent = Arc::clone(&self.agent);
        let interval = self.config.poll_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick fires immediately; skip it so the job gets a full
            // interval before the first poll.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let poll = match agent.poll_job(&handle).await {
                    Ok(poll) => poll,
                    Err(err) => {
                        warn!(task = %task_id, error = %err, "poll failed, retrying");
                        continue;
                    }
                };
                let outcome = match poll.state {
                    JobState::Creating | JobState::Running => continue,
                    JobState::Finished => JobOutcome::Finished {
                        result_ref: poll.result_ref,
                    },
                    JobState::Failed => JobOutcome::Failed {
                        error: poll
                            .error
                            .unwrap_or_else(|| "agent reported failure".to_string()),
                    },
                    JobState::Stopped | JobState::Expired => JobOutcome::Cancelled {
                        reason: format!("job {}", poll.state),
                    },
                };
                let _ = tx.send(Event::JobTerminal { task_id, outcome });
                break;
            }
        })
    }

    fn spawn_timeout(
        &self,
        task_id: String,
        timeout: Duration,
        tx: mpsc::UnboundedSender<Event>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(Event::JobTimedOut { task_id });
        })
    }

    fn spawn_breakpoint(&self, queue: &TaskQueue, task_id: String, tx: mpsc::UnboundedSender<Event>) {
        let prompt = BreakpointPrompt {
            task_id: task_id.clone(),
            task_name: queue
                .get(&task_id)
                .map(|t| t.input.name.clone())
                .unwrap_or_else(|| task_id.clone()),
            branch: queue
                .get(&task_id)
                .and_then(|t| t.result.as_ref())
                .and_then(|r| r.branch.clone()),
        };
        let handler = Arc::clone(&self.breakpoints);
        tokio::spawn(async move {
            let decision = match handler.resolve(prompt).await {
                Ok(decision) => decision,
                Err(err) => {
                    warn!(task = %task_id, error = %err, "breakpoint prompt failed, aborting");
                    BreakpointDecision::Abort
                }
            };
            let _ = tx.send(Event::BreakpointResolved { task_id, decision });
        });
    }

    fn stop_job_in_background(&self, handle: JobHandle) {
        let agent = Arc::clone(&self.agent);
        tokio::spawn(async move {
            if let Err(err) = agent.stop_job(&handle).await {
                debug!(job = %handle, error = %err, "stop request failed");
            }
        });
    }

    fn persist(&self, snapshot: &mut RunSnapshot, queue: &TaskQueue, active: &HashMap<String, ActiveJob>) {
        snapshot.updated_at = chrono::Utc::now();
        snapshot.tasks = queue.tasks().to_vec();
        snapshot.active_agents = active
            .iter()
            .map(|(id, job)| (id.clone(), job.handle.0.clone()))
            .collect();
        if let Err(err) = self.store.save(snapshot) {
            warn!(error = %err, "failed to persist run snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;

    use crate::agent::JobPayload;
    use crate::agent::JobPoll;
    use crate::orchestrator::state::RunSnapshot;
    use crate::task::TaskInput;

    #[derive(Clone)]
    enum Plan {
        Finish,
        Fail(&'static str),
        RunForever,
        RefuseCreate(&'static str),
    }

    /// Scripted agent: each `create_job` for a task consumes the next plan
    /// for that task id (defaulting to `Finish`).
    struct MockAgent {
        plans: Mutex<HashMap<String, VecDeque<Plan>>>,
        jobs: Mutex<HashMap<String, Plan>>,
        created_order: Mutex<Vec<String>>,
        stopped: Mutex<Vec<String>>,
        live: AtomicUsize,
        peak: AtomicUsize,
        counter: AtomicUsize,
    }

    impl MockAgent {
        fn new() -> Self {
            Self {
                plans: Mutex::new(HashMap::new()),
                jobs: Mutex::new(HashMap::new()),
                created_order: Mutex::new(Vec::new()),
                stopped: Mutex::new(Vec::new()),
                live: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                counter: AtomicUsize::new(0),
            }
        }

        fn script(self, task_id: &str, plans: Vec<Plan>) -> Self {
            self.plans
                .lock()
                .unwrap()
                .insert(task_id.to_string(), plans.into());
            self
        }

        fn created_order(&self) -> Vec<String> {
            self.created_order.lock().unwrap().clone()
        }

        fn stopped(&self) -> Vec<String> {
            self.stopped.lock().unwrap().clone()
        }

        fn peak_concurrency(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AgentService for MockAgent {
        async fn create_job(&self, payload: &JobPayload) -> Result<JobHandle> {
            let plan = self
                .plans
                .lock()
                .unwrap()
                .get_mut(&payload.task_id)
                .and_then(|q| q.pop_front())
                .unwrap_or(Plan::Finish);
            if let Plan::RefuseCreate(message) = plan {
                return Err(anyhow!(message));
            }

            let id = format!("job-{}", self.counter.fetch_add(1, Ordering::SeqCst));
            self.jobs.lock().unwrap().insert(id.clone(), plan);
            self.created_order
                .lock()
                .unwrap()
                .push(payload.task_id.clone());
            let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(live, Ordering::SeqCst);
            Ok(JobHandle(id))
        }

        async fn poll_job(&self, handle: &JobHandle) -> Result<JobPoll> {
            let plan = self
                .jobs
                .lock()
                .unwrap()
                .get(&handle.0)
                .cloned()
                .ok_or_else(|| anyhow!("unknown job {handle}"))?;
            let poll = match plan {
                Plan::Finish => JobPoll {
                    state: JobState::Finished,
                    result_ref: Some(format!("artifact:{handle}")),
                    error: None,
                },
                Plan::Fail(message) => JobPoll {
                    state: JobState::Failed,
                    result_ref: None,
                    error: Some(message.to_string()),
                },
                Plan::RunForever => JobPoll {
                    state: JobState::Running,
                    result_ref: None,
                    error: None,
                },
                Plan::RefuseCreate(_) => unreachable!(),
            };
            if poll.state.is_terminal() {
                // Drop the job so a duplicate terminal poll cannot double-count.
                if self.jobs.lock().unwrap().remove(&handle.0).is_some() {
                    self.live.fetch_sub(1, Ordering::SeqCst);
                }
            }
            Ok(poll)
        }

        async fn stop_job(&self, handle: &JobHandle) -> Result<()> {
            if self.jobs.lock().unwrap().remove(&handle.0).is_some() {
                self.live.fetch_sub(1, Ordering::SeqCst);
            }
            self.stopped.lock().unwrap().push(handle.0.clone());
            Ok(())
        }
    }

    struct NullStore;

    impl StateStore for NullStore {
        fn save(&self, _snapshot: &RunSnapshot) -> Result<()> {
            Ok(())
        }
        fn load(&self) -> Result<Option<RunSnapshot>> {
            Ok(None)
        }
        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    struct ScriptedBreakpoint(BreakpointDecision);

    #[async_trait]
    impl BreakpointHandler for ScriptedBreakpoint {
        async fn resolve(&self, _prompt: BreakpointPrompt) -> Result<BreakpointDecision> {
            Ok(self.0)
        }
    }

    fn template() -> Template {
        serde_yaml::from_str(
            "\
name: run-test
tasks:
  - id: placeholder
    name: Placeholder
    prompt: p
",
        )
        .unwrap()
    }

    fn orchestrator(agent: Arc<MockAgent>, config: OrchestratorConfig) -> Orchestrator {
        Orchestrator::new(
            agent,
            Arc::new(ScriptedBreakpoint(BreakpointDecision::Continue)),
            Arc::new(NullStore),
            config,
        )
    }

    fn queue(inputs: Vec<TaskInput>) -> TaskQueue {
        TaskQueue::from_inputs(inputs).unwrap()
    }

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_poll_interval(Duration::from_millis(100))
            .with_default_timeout(Duration::from_secs(600))
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_tasks_bounded_by_concurrency_ceiling() {
        let agent = Arc::new(MockAgent::new());
        let orch = orchestrator(Arc::clone(&agent), fast_config().with_max_concurrent(2));
        let inputs = (0..4)
            .map(|i| TaskInput::new(&format!("t{i}"), &format!("T{i}"), "p"))
            .collect();

        let report = orch.run(&template(), queue(inputs)).await.unwrap();

        assert!(!report.aborted);
        assert_eq!(report.completed.len(), 4);
        assert!(report.failed.is_empty());
        assert!(agent.peak_concurrency() <= 2);
        assert_eq!(agent.created_order().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dependent_task_starts_after_dependency() {
        let agent = Arc::new(MockAgent::new());
        let orch = orchestrator(Arc::clone(&agent), fast_config());
        let inputs = vec![
            TaskInput::new("api", "API", "p").with_depends_on(vec!["schema".to_string()]),
            TaskInput::new("schema", "Schema", "p"),
        ];

        let report = orch.run(&template(), queue(inputs)).await.unwrap();

        assert_eq!(report.completed.len(), 2);
        assert_eq!(agent.created_order(), vec!["schema", "api"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_orders_dispatch_of_ready_tasks() {
        let agent = Arc::new(MockAgent::new());
        let orch = orchestrator(Arc::clone(&agent), fast_config().with_max_concurrent(1));
        let inputs = vec![
            TaskInput::new("low", "Low", "p").with_priority(1),
            TaskInput::new("high", "High", "p").with_priority(10),
        ];

        orch.run(&template(), queue(inputs)).await.unwrap();

        assert_eq!(agent.created_order(), vec!["high", "low"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_is_retried_then_succeeds() {
        let agent = Arc::new(
            MockAgent::new().script("flaky", vec![Plan::Fail("transient"), Plan::Finish]),
        );
        let orch = orchestrator(Arc::clone(&agent), fast_config().with_default_retries(2));
        let inputs = vec![TaskInput::new("flaky", "Flaky", "p")];

        let report = orch.run(&template(), queue(inputs)).await.unwrap();

        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.completed[0].attempts, 2);
        assert_eq!(agent.created_order(), vec!["flaky", "flaky"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fail_task_and_dependents() {
        let agent = Arc::new(MockAgent::new().script(
            "broken",
            vec![Plan::Fail("boom"), Plan::Fail("boom again")],
        ));
        let orch = orchestrator(Arc::clone(&agent), fast_config().with_default_retries(2));
        let inputs = vec![
            TaskInput::new("broken", "Broken", "p"),
            TaskInput::new("blocked", "Blocked", "p")
                .with_depends_on(vec!["broken".to_string()]),
        ];

        let report = orch.run(&template(), queue(inputs)).await.unwrap();

        assert!(report.completed.is_empty());
        assert_eq!(report.failed.len(), 2);
        let broken = report.failed.iter().find(|t| t.id() == "broken").unwrap();
        assert_eq!(broken.error.as_deref(), Some("boom again"));
        let blocked = report.failed.iter().find(|t| t.id() == "blocked").unwrap();
        assert_eq!(blocked.error.as_deref(), Some("dependency broken failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_creation_failure_consumes_retry_budget() {
        let agent = Arc::new(MockAgent::new().script(
            "stuck",
            vec![Plan::RefuseCreate("service unavailable"), Plan::Finish],
        ));
        let orch = orchestrator(Arc::clone(&agent), fast_config().with_default_retries(2));
        let inputs = vec![TaskInput::new("stuck", "Stuck", "p")];

        let report = orch.run(&template(), queue(inputs)).await.unwrap();

        assert_eq!(report.completed.len(), 1);
        // One refused creation plus the successful attempt.
        assert_eq!(report.completed[0].attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_job_is_stopped_and_failed() {
        let agent = Arc::new(MockAgent::new().script("slow", vec![Plan::RunForever]));
        let orch = orchestrator(
            Arc::clone(&agent),
            fast_config().with_default_retries(0),
        );
        let inputs = vec![{
            let mut input = TaskInput::new("slow", "Slow", "p");
            input.timeout_minutes = Some(1);
            input
        }];

        let report = orch.run(&template(), queue(inputs)).await.unwrap();
        // Let the background stop request run to completion.
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].error.as_deref(), Some("timeout exceeded"));
        assert_eq!(agent.stopped().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breakpoint_continue_unblocks_dependents() {
        let agent = Arc::new(MockAgent::new());
        let orch = orchestrator(Arc::clone(&agent), fast_config());
        let inputs = vec![
            TaskInput::new("gate", "Gate", "p").with_breakpoint(true),
            TaskInput::new("after", "After", "p").with_depends_on(vec!["gate".to_string()]),
        ];

        let report = orch.run(&template(), queue(inputs)).await.unwrap();

        assert!(!report.aborted);
        assert_eq!(report.completed.len(), 2);
        assert_eq!(agent.created_order(), vec!["gate", "after"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breakpoint_abort_cancels_in_flight_jobs() {
        let agent = Arc::new(MockAgent::new().script("background", vec![Plan::RunForever]));
        let orch = Orchestrator::new(
            Arc::clone(&agent) as Arc<dyn AgentService>,
            Arc::new(ScriptedBreakpoint(BreakpointDecision::Abort)),
            Arc::new(NullStore),
            fast_config().with_max_concurrent(2),
        );
        let inputs = vec![
            TaskInput::new("checkpoint", "Checkpoint", "p").with_breakpoint(true),
            TaskInput::new("background", "Background", "p"),
        ];

        let report = orch.run(&template(), queue(inputs)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(report.aborted);
        // The paused task never completed and dependent work never ran.
        assert!(report.completed.is_empty());
        assert_eq!(agent.stopped().len(), 1);
        let checkpoint = report
            .tasks
            .iter()
            .find(|t| t.id() == "checkpoint")
            .unwrap();
        assert!(checkpoint.status.is_paused());
    }
}
