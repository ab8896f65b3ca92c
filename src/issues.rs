//! Mapping validation failures to tracker issues.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::gates::GateResult;

#[async_trait]
pub trait IssueMapper: Send + Sync {
    /// Create one tracker issue per failing gate. Returns issue references.
    async fn create_issues(&self, failing: &[&GateResult]) -> Result<Vec<String>>;
}

/// Creates GitHub issues through the `gh` CLI.
pub struct GhIssueMapper {
    working_dir: PathBuf,
    cycle_label: String,
}

impl GhIssueMapper {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            cycle_label: "conductor-qa".to_string(),
        }
    }

    fn issue_body(result: &GateResult) -> String {
        let mut body = format!(
            "Validation gate `{}` failed ({} ms).\n\n## Failures\n\n",
            result.gate, result.duration_ms
        );
        for failure in &result.failures {
            body.push_str(&format!("- {}", failure.message));
            if let Some(file) = &failure.file {
                body.push_str(&format!(" ({file}"));
                if let Some(line) = failure.line {
                    body.push_str(&format!(":{line}"));
                }
                body.push(')');
            }
            body.push('\n');
        }
        body
    }
}

#[async_trait]
impl IssueMapper for GhIssueMapper {
    async fn create_issues(&self, failing: &[&GateResult]) -> Result<Vec<String>> {
        let mut refs = Vec::with_capacity(failing.len());
        for result in failing {
            let title = format!("QA: {} gate failing", result.gate);
            let body = Self::issue_body(result);

            debug!(gate = %result.gate, "creating tracker issue");
            let output = Command::new("gh")
                .args(["issue", "create", "--title", &title, "--body", &body])
                .arg("--label")
                .arg(&self.cycle_label)
                .current_dir(&self.working_dir)
                .stdin(Stdio::null())
                .output()
                .await
                .context("failed to run gh issue create")?;

            if !output.status.success() {
                bail!(
                    "gh issue create failed for gate {}: {}",
                    result.gate,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            // gh prints the issue URL on stdout.
            let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
            refs.push(url);
        }
        Ok(refs)
    }
}
