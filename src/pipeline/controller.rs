//! Execute → validate → fix cycle control.
//!
//! Each cycle runs a fresh queue through the orchestrator, merges the
//! resulting branches into the validation checkout, and runs the template's
//! gates. Failing gates produce tracker issues and a single aggregated fix
//! task for the next cycle; running out of cycles escalates to the operator.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::agent::AgentService;
use crate::breakpoint::BreakpointHandler;
use crate::gates::{CycleReport, GateRunner};
use crate::git::Workspace;
use crate::issues::IssueMapper;
use crate::orchestrator::{Orchestrator, OrchestratorConfig, StateStore};
use crate::prompts::build_retry_task;
use crate::queue::TaskQueue;
use crate::report::{ArtifactGenerator, Report, ReportRequest};
use crate::task::Task;
use crate::template::Template;
use crate::ui;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on execute/validate cycles.
    pub max_cycles: usize,
    /// Produce an end-of-run artifact (pull request) after the loop.
    pub generate_report: bool,
    pub orchestrator: OrchestratorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_cycles: 3,
            generate_report: true,
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

/// Outcome of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// All tasks terminal (or paused then released) and the final cycle's
    /// gates all passed.
    pub success: bool,
    /// Cycles were exhausted with gates still failing.
    pub escalated: bool,
    /// Operator aborted at a breakpoint.
    pub aborted: bool,
    pub completed: Vec<Task>,
    pub failed: Vec<Task>,
    pub history: Vec<CycleReport>,
    pub report: Option<Report>,
}

pub struct PipelineController {
    agent: Arc<dyn AgentService>,
    gates: Arc<dyn GateRunner>,
    issues: Arc<dyn IssueMapper>,
    reporter: Arc<dyn ArtifactGenerator>,
    workspace: Arc<dyn Workspace>,
    store: Arc<dyn StateStore>,
    breakpoints: Arc<dyn BreakpointHandler>,
    config: PipelineConfig,
}

impl PipelineController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent: Arc<dyn AgentService>,
        gates: Arc<dyn GateRunner>,
        issues: Arc<dyn IssueMapper>,
        reporter: Arc<dyn ArtifactGenerator>,
        workspace: Arc<dyn Workspace>,
        store: Arc<dyn StateStore>,
        breakpoints: Arc<dyn BreakpointHandler>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            agent,
            gates,
            issues,
            reporter,
            workspace,
            store,
            breakpoints,
            config,
        }
    }

    pub async fn run(&self, template: &Template) -> Result<PipelineResult> {
        let max_cycles = self.config.max_cycles.max(1);
        let mut inputs = template.tasks.clone();
        let mut history: Vec<CycleReport> = Vec::new();
        let mut all_tasks: Vec<Task> = Vec::new();
        let mut completed: Vec<Task> = Vec::new();
        let mut failed: Vec<Task> = Vec::new();
        let mut merged_branches: Vec<String> = Vec::new();
        let mut aborted = false;
        let mut escalated = false;

        for cycle in 0..max_cycles {
            ui::cycle_header(cycle, max_cycles, inputs.len());

            let queue = TaskQueue::from_inputs(inputs.clone())
                .context("invalid task set for cycle")?;
            let orchestrator = Orchestrator::new(
                Arc::clone(&self.agent),
                Arc::clone(&self.breakpoints),
                Arc::clone(&self.store),
                self.config.orchestrator.clone(),
            );
            let run = orchestrator.run(template, queue).await?;
            ui::task_summary(&run.tasks);

            completed.extend(run.completed.iter().cloned());
            failed.extend(run.failed.iter().cloned());
            all_tasks.extend(run.tasks.iter().cloned());

            if run.aborted {
                aborted = true;
                break;
            }

            if template.gates.is_empty() {
                info!("no validation gates configured, skipping QA cycles");
                break;
            }

            self.merge_cycle_branches(&run.completed, &mut merged_branches)
                .await;

            let results = self
                .gates
                .run(&template.gates, cycle, max_cycles)
                .await
                .context("gate execution failed")?;
            let cycle_report = CycleReport::new(cycle, results);

            if cycle_report.all_passed {
                history.push(cycle_report);
                break;
            }

            if cycle + 1 >= max_cycles {
                warn!(cycle = cycle + 1, "validation still failing after final cycle");
                escalated = true;
                history.push(cycle_report);
                break;
            }

            let failing = cycle_report.failing();
            let issue_ids = match self.issues.create_issues(&failing).await {
                Ok(ids) => ids,
                Err(err) => {
                    warn!(error = %err, "failed to create tracker issues");
                    Vec::new()
                }
            };
            let retry = build_retry_task(template, cycle, &run.completed, &failing, &issue_ids);
            info!(task = %retry.id, "queued aggregated fix task for next cycle");
            inputs = vec![retry];
            history.push(cycle_report);
        }

        let success = !aborted && history.last().map_or(true, |c| c.all_passed);

        if !aborted
            && let Err(err) = self.store.clear()
        {
            warn!(error = %err, "failed to clear run snapshot");
        }

        let report = if self.config.generate_report {
            let request = ReportRequest {
                template_name: template.name.clone(),
                task_results: all_tasks,
                history: history.clone(),
                success,
                escalated,
                branches: merged_branches,
            };
            match self.reporter.generate(&request).await {
                Ok(report) => Some(report),
                Err(err) => {
                    warn!(error = %err, "failed to generate run report");
                    None
                }
            }
        } else {
            None
        };

        ui::run_summary(success, escalated, aborted, &completed, &failed, report.as_ref());

        Ok(PipelineResult {
            success,
            escalated,
            aborted,
            completed,
            failed,
            history,
            report,
        })
    }

    /// Bring this cycle's task branches into the validation checkout. Merge
    /// conflicts are logged and skipped; the gates then judge what actually
    /// merged.
    async fn merge_cycle_branches(&self, completed: &[Task], merged: &mut Vec<String>) {
        if let Err(err) = self.workspace.fetch().await {
            warn!(error = %err, "fetch failed before merging task branches");
        }
        for task in completed {
            let Some(branch) = task.result.as_ref().and_then(|r| r.branch.clone()) else {
                continue;
            };
            match self.workspace.merge_branch(&branch).await {
                Ok(()) => merged.push(branch),
                Err(err) => {
                    warn!(task = %task.id(), branch = %branch, error = %err, "merge failed");
                }
            }
        }
    }
}
