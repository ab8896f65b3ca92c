//! Working-tree operations used between execution and validation.
//!
//! Task branches are merged into the validation checkout before gates run so
//! the gates see the combined result of the cycle. All git work goes through
//! the `git` CLI.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

#[async_trait]
pub trait Workspace: Send + Sync {
    /// Refresh remote refs.
    async fn fetch(&self) -> Result<()>;
    /// Merge a branch into the current checkout. Returns Err on conflict.
    async fn merge_branch(&self, branch: &str) -> Result<()>;
}

/// CLI-backed workspace rooted at a local checkout.
pub struct GitWorkspace {
    working_dir: PathBuf,
}

impl GitWorkspace {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<std::process::Output> {
        debug!(args = ?args, "running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to run git {}", args.join(" ")))
    }
}

#[async_trait]
impl Workspace for GitWorkspace {
    async fn fetch(&self) -> Result<()> {
        let output = self.git(&["fetch", "--all", "--prune"]).await?;
        if !output.status.success() {
            bail!(
                "git fetch failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn merge_branch(&self, branch: &str) -> Result<()> {
        let source = format!("origin/{branch}");
        let output = self.git(&["merge", "--no-edit", &source]).await?;
        if output.status.success() {
            return Ok(());
        }

        // Leave the tree clean for the next merge attempt.
        let abort = self.git(&["merge", "--abort"]).await;
        if let Err(err) = abort {
            warn!(branch, error = %err, "failed to abort conflicted merge");
        }
        bail!(
            "merge of {} failed: {}",
            branch,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
}
