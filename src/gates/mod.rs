//! Validation gates: named quality checks run between execution cycles.
//!
//! A gate is either a shell command (nonzero exit means failure) or a manual
//! check answered by a human. The pipeline controller only sees the
//! [`GateRunner`] trait and the structured results; how failures are extracted
//! from command output is deliberately simple and replaceable.

pub mod command;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use command::CommandGateRunner;

/// A named validation check declared in the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// Display name (e.g. "typecheck", "unit").
    pub name: String,
    /// Shell command to execute. Mutually exclusive with `manual`.
    #[serde(default)]
    pub command: Option<String>,
    /// Prompt a human for a pass/fail verdict instead of running a command.
    #[serde(default)]
    pub manual: bool,
}

impl Gate {
    /// A command gate.
    pub fn command(name: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            command: Some(command.to_string()),
            manual: false,
        }
    }

    /// A manual (human-answered) gate.
    pub fn manual(name: &str) -> Self {
        Self {
            name: name.to_string(),
            command: None,
            manual: true,
        }
    }
}

/// One failure reported by a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateFailure {
    pub message: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
}

impl GateFailure {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            file: None,
            line: None,
        }
    }
}

/// Structured outcome of running one gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub gate: String,
    pub passed: bool,
    #[serde(default)]
    pub failures: Vec<GateFailure>,
    pub duration_ms: u64,
}

impl GateResult {
    pub fn passed(gate: &str, duration_ms: u64) -> Self {
        Self {
            gate: gate.to_string(),
            passed: true,
            failures: Vec::new(),
            duration_ms,
        }
    }

    pub fn failed(gate: &str, failures: Vec<GateFailure>, duration_ms: u64) -> Self {
        Self {
            gate: gate.to_string(),
            passed: false,
            failures,
            duration_ms,
        }
    }
}

/// Pass/fail record of one QA cycle's validation phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// Zero-based cycle index.
    pub cycle: usize,
    pub results: Vec<GateResult>,
    pub all_passed: bool,
}

impl CycleReport {
    pub fn new(cycle: usize, results: Vec<GateResult>) -> Self {
        let all_passed = results.iter().all(|r| r.passed);
        Self {
            cycle,
            results,
            all_passed,
        }
    }

    /// Results of gates that failed this cycle.
    pub fn failing(&self) -> Vec<&GateResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

/// Executes the configured gates for one cycle.
#[async_trait]
pub trait GateRunner: Send + Sync {
    /// Run every gate, returning one structured result per gate. A gate
    /// failing is a normal outcome, not an error; `Err` means the runner
    /// itself could not operate.
    async fn run(&self, gates: &[Gate], cycle: usize, max_cycles: usize)
    -> Result<Vec<GateResult>>;
}
