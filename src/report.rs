//! End-of-run artifact generation.
//!
//! The default reporter pushes the integrated branch and opens a pull request
//! through the `gh` CLI, with a body summarizing every task and QA cycle. A
//! partial run (escalated or aborted) still gets a report so the operator can
//! see exactly where things stopped.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tracing::info;

use crate::gates::CycleReport;
use crate::task::Task;

/// Everything the reporter needs about the finished run.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub template_name: String,
    pub task_results: Vec<Task>,
    pub history: Vec<CycleReport>,
    pub success: bool,
    pub escalated: bool,
    /// Task branches merged during the run, in merge order.
    pub branches: Vec<String>,
}

/// A produced artifact: an external reference (PR URL) plus its body text.
#[derive(Debug, Clone)]
pub struct Report {
    pub reference: Option<String>,
    pub text: String,
}

#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(&self, request: &ReportRequest) -> Result<Report>;
}

/// Pushes the current branch and opens a pull request with the run summary.
pub struct PullRequestReporter {
    working_dir: PathBuf,
    base_branch: String,
}

impl PullRequestReporter {
    pub fn new(working_dir: impl Into<PathBuf>, base_branch: impl Into<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            base_branch: base_branch.into(),
        }
    }

    fn render_body(request: &ReportRequest) -> String {
        let mut body = String::new();

        let status = if request.success {
            "All tasks completed and validation passed."
        } else if request.escalated {
            "Escalated: validation still failing after the final QA cycle."
        } else {
            "Run stopped before completion."
        };
        body.push_str(&format!(
            "Automated run of template `{}` on {}.\n\n{}\n",
            request.template_name,
            Utc::now().format("%Y-%m-%d"),
            status
        ));

        body.push_str("\n## Tasks\n\n");
        for task in &request.task_results {
            let marker = if task.status == crate::task::TaskStatus::Completed {
                "x"
            } else {
                " "
            };
            body.push_str(&format!("- [{marker}] {} ({})", task.input.name, task.input.id));
            if let Some(branch) = task.result.as_ref().and_then(|r| r.branch.as_deref()) {
                body.push_str(&format!(" on `{branch}`"));
            }
            if let Some(error) = &task.error {
                body.push_str(&format!(": {error}"));
            }
            body.push('\n');
        }

        if !request.history.is_empty() {
            body.push_str("\n## Validation cycles\n\n");
            for cycle in &request.history {
                let verdict = if cycle.all_passed { "passed" } else { "failed" };
                let gates: Vec<String> = cycle
                    .results
                    .iter()
                    .map(|r| {
                        let mark = if r.passed { "✓" } else { "✗" };
                        format!("{mark} {}", r.gate)
                    })
                    .collect();
                body.push_str(&format!(
                    "- Cycle {}: {} ({})\n",
                    cycle.cycle + 1,
                    verdict,
                    gates.join(", ")
                ));
            }
        }

        body
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<std::process::Output> {
        Command::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to run {program} {}", args.join(" ")))
    }
}

#[async_trait]
impl ArtifactGenerator for PullRequestReporter {
    async fn generate(&self, request: &ReportRequest) -> Result<Report> {
        let text = Self::render_body(request);

        let push = self.run("git", &["push", "--set-upstream", "origin", "HEAD"]).await?;
        if !push.status.success() {
            bail!(
                "git push failed: {}",
                String::from_utf8_lossy(&push.stderr).trim()
            );
        }

        let prefix = if request.success { "" } else { "[needs attention] " };
        let title = format!("{prefix}Conductor run: {}", request.template_name);
        let pr = self
            .run(
                "gh",
                &[
                    "pr",
                    "create",
                    "--base",
                    &self.base_branch,
                    "--title",
                    &title,
                    "--body",
                    &text,
                ],
            )
            .await?;
        if !pr.status.success() {
            bail!(
                "gh pr create failed: {}",
                String::from_utf8_lossy(&pr.stderr).trim()
            );
        }

        let url = String::from_utf8_lossy(&pr.stdout).trim().to_string();
        info!(url = %url, "opened pull request");
        Ok(Report {
            reference: (!url.is_empty()).then_some(url),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::{GateFailure, GateResult};
    use crate::task::{TaskInput, TaskResult, TaskStatus};

    fn request(success: bool, escalated: bool) -> ReportRequest {
        let mut done = Task::new(TaskInput::new("schema", "Schema", "p"));
        done.status = TaskStatus::Completed;
        done.result = Some(TaskResult::new(Some("feat/schema".into()), None));

        let mut failed = Task::new(TaskInput::new("api", "API", "p"));
        failed.status = TaskStatus::Failed;
        failed.error = Some("timeout exceeded".into());

        ReportRequest {
            template_name: "checkout".into(),
            task_results: vec![done, failed],
            history: vec![CycleReport::new(
                0,
                vec![
                    GateResult::passed("typecheck", 10),
                    GateResult::failed("unit", vec![GateFailure::new("boom")], 20),
                ],
            )],
            success,
            escalated,
            branches: vec!["feat/schema".into()],
        }
    }

    #[test]
    fn test_body_marks_tasks_and_cycles() {
        let body = PullRequestReporter::render_body(&request(false, true));
        assert!(body.contains("Escalated"));
        assert!(body.contains("- [x] Schema (schema) on `feat/schema`"));
        assert!(body.contains("- [ ] API (api): timeout exceeded"));
        assert!(body.contains("Cycle 1: failed (✓ typecheck, ✗ unit)"));
    }

    #[test]
    fn test_successful_body_has_no_escalation_note() {
        let body = PullRequestReporter::render_body(&request(true, false));
        assert!(body.contains("validation passed"));
        assert!(!body.contains("Escalated"));
    }
}
