//! Human checkpoints between a task finishing and its dependents unblocking.

use anyhow::Result;
use async_trait::async_trait;
use console::style;
use dialoguer::{Select, theme::ColorfulTheme};

/// Operator decision at a paused task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointDecision {
    /// Mark the task complete and let dependents proceed.
    Continue,
    /// Stop the entire run.
    Abort,
}

/// What the operator sees when a run pauses.
#[derive(Debug, Clone)]
pub struct BreakpointPrompt {
    pub task_id: String,
    pub task_name: String,
    pub branch: Option<String>,
}

#[async_trait]
pub trait BreakpointHandler: Send + Sync {
    async fn resolve(&self, prompt: BreakpointPrompt) -> Result<BreakpointDecision>;
}

/// Interactive handler that asks on the terminal.
pub struct ConsoleBreakpointHandler;

#[async_trait]
impl BreakpointHandler for ConsoleBreakpointHandler {
    async fn resolve(&self, prompt: BreakpointPrompt) -> Result<BreakpointDecision> {
        let decision = tokio::task::spawn_blocking(move || {
            println!();
            println!(
                "{} task {} ({}) finished and is paused at a breakpoint",
                style("⏸").yellow().bold(),
                style(&prompt.task_name).cyan(),
                prompt.task_id,
            );
            if let Some(branch) = &prompt.branch {
                println!("  review branch: {}", style(branch).dim());
            }

            let choice = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("How do you want to proceed?")
                .items(&["Continue the run", "Abort the run"])
                .default(0)
                .interact()?;

            anyhow::Ok(match choice {
                0 => BreakpointDecision::Continue,
                _ => BreakpointDecision::Abort,
            })
        })
        .await??;

        Ok(decision)
    }
}

/// Non-interactive handler for --yes runs and tests.
pub struct AutoContinueHandler;

#[async_trait]
impl BreakpointHandler for AutoContinueHandler {
    async fn resolve(&self, _prompt: BreakpointPrompt) -> Result<BreakpointDecision> {
        Ok(BreakpointDecision::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_auto_continue_always_continues() {
        let handler = AutoContinueHandler;
        let decision = handler
            .resolve(BreakpointPrompt {
                task_id: "schema".into(),
                task_name: "Schema".into(),
                branch: None,
            })
            .await
            .unwrap();
        assert_eq!(decision, BreakpointDecision::Continue);
    }
}
