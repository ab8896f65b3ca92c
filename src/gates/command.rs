//! Default gate runner: shell commands plus manual human verdicts.

use crate::gates::{Gate, GateFailure, GateResult, GateRunner};
use anyhow::{Context, Result};
use async_trait::async_trait;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// How many trailing output lines are kept as the failure message for a
/// failing command gate. Richer failure extraction is out of scope.
const FAILURE_TAIL_LINES: usize = 20;

/// Runs command gates via the shell and manual gates via a terminal prompt.
pub struct CommandGateRunner {
    working_dir: PathBuf,
    /// Auto-pass manual gates (non-interactive runs).
    assume_yes: bool,
}

impl CommandGateRunner {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            assume_yes: false,
        }
    }

    /// Auto-pass manual gates instead of prompting.
    pub fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    async fn run_command_gate(&self, gate: &Gate, command: &str) -> Result<GateResult> {
        let start = Instant::now();
        tracing::debug!(gate = %gate.name, %command, "running gate command");

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .output()
            .await
            .with_context(|| format!("Failed to spawn gate command for '{}'", gate.name))?;

        let duration_ms = start.elapsed().as_millis() as u64;

        if output.status.success() {
            return Ok(GateResult::passed(&gate.name, duration_ms));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
        let tail: Vec<&str> = combined
            .iter()
            .rev()
            .take(FAILURE_TAIL_LINES)
            .rev()
            .copied()
            .collect();

        let message = if tail.is_empty() {
            format!(
                "command exited with {}",
                output.status.code().unwrap_or(-1)
            )
        } else {
            tail.join("\n")
        };

        Ok(GateResult::failed(
            &gate.name,
            vec![GateFailure::new(&message)],
            duration_ms,
        ))
    }

    async fn run_manual_gate(
        &self,
        gate: &Gate,
        cycle: usize,
        max_cycles: usize,
    ) -> Result<GateResult> {
        let start = Instant::now();

        if self.assume_yes {
            return Ok(GateResult::passed(&gate.name, 0));
        }

        let prompt = format!(
            "Gate '{}' (cycle {}/{}): does this check pass?",
            gate.name,
            cycle + 1,
            max_cycles
        );

        // dialoguer blocks; keep the runtime free while the human decides.
        let passed = tokio::task::spawn_blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(false)
                .interact()
        })
        .await
        .context("Manual gate prompt task panicked")?
        .context("Failed to read manual gate verdict")?;

        let duration_ms = start.elapsed().as_millis() as u64;

        if passed {
            Ok(GateResult::passed(&gate.name, duration_ms))
        } else {
            Ok(GateResult::failed(
                &gate.name,
                vec![GateFailure::new("rejected by operator")],
                duration_ms,
            ))
        }
    }
}

#[async_trait]
impl GateRunner for CommandGateRunner {
    async fn run(
        &self,
        gates: &[Gate],
        cycle: usize,
        max_cycles: usize,
    ) -> Result<Vec<GateResult>> {
        let mut results = Vec::with_capacity(gates.len());

        for gate in gates {
            let result = if gate.manual {
                self.run_manual_gate(gate, cycle, max_cycles).await?
            } else if let Some(command) = &gate.command {
                let spinner = ProgressBar::new_spinner().with_message(format!(
                    "gate {} running",
                    gate.name
                ));
                if let Ok(spinner_style) = ProgressStyle::with_template("  {spinner} {msg}") {
                    spinner.set_style(spinner_style);
                }
                spinner.enable_steady_tick(Duration::from_millis(100));
                let result = self.run_command_gate(gate, command).await?;
                spinner.finish_and_clear();
                result
            } else {
                // Gate shape is validated at template load.
                GateResult::passed(&gate.name, 0)
            };

            let marker = if result.passed {
                style("pass").green()
            } else {
                style("FAIL").red().bold()
            };
            eprintln!("  gate {} {}", style(&gate.name).bold(), marker);

            results.push(result);
        }

        Ok(results)
    }
}
