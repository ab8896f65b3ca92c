//! Terminal output for runs.

use console::style;

use crate::report::Report;
use crate::task::{Task, TaskStatus};
use crate::template::Template;

pub fn cycle_header(cycle: usize, max_cycles: usize, task_count: usize) {
    println!();
    println!(
        "{} cycle {}/{}: {} task{}",
        style("▶").cyan().bold(),
        cycle + 1,
        max_cycles,
        task_count,
        if task_count == 1 { "" } else { "s" },
    );
}

pub fn task_summary(tasks: &[Task]) {
    for task in tasks {
        let (mark, label) = match task.status {
            TaskStatus::Completed => (style("✓").green(), String::from("completed")),
            TaskStatus::Failed => (
                style("✗").red(),
                task.error.clone().unwrap_or_else(|| "failed".into()),
            ),
            TaskStatus::PausedAtBreakpoint => (style("⏸").yellow(), String::from("paused")),
            _ => (style("•").dim(), format!("{:?}", task.status).to_lowercase()),
        };
        let attempts = if task.attempts > 1 {
            format!(" ({} attempts)", task.attempts)
        } else {
            String::new()
        };
        println!("  {mark} {}: {label}{attempts}", style(&task.input.name).bold());
    }
}

pub fn run_summary(
    success: bool,
    escalated: bool,
    aborted: bool,
    completed: &[Task],
    failed: &[Task],
    report: Option<&Report>,
) {
    println!();
    if success {
        println!(
            "{} run complete: {} task{} finished, all gates passed",
            style("✓").green().bold(),
            completed.len(),
            if completed.len() == 1 { "" } else { "s" },
        );
    } else if aborted {
        println!("{} run aborted at breakpoint", style("⏹").yellow().bold());
    } else if escalated {
        println!(
            "{} escalated: gates still failing after the final cycle ({} completed, {} failed)",
            style("!").red().bold(),
            completed.len(),
            failed.len(),
        );
    } else {
        println!(
            "{} run finished with failures ({} completed, {} failed)",
            style("✗").red().bold(),
            completed.len(),
            failed.len(),
        );
    }
    if let Some(report) = report
        && let Some(reference) = &report.reference
    {
        println!("  report: {}", style(reference).cyan());
    }
}

/// Overview printed by the `check` command after a template validates.
pub fn template_overview(template: &Template) {
    println!(
        "{} template {} is valid",
        style("✓").green().bold(),
        style(&template.name).bold(),
    );
    println!(
        "  {} task{}, {} gate{}, up to {} cycle{}",
        template.tasks.len(),
        if template.tasks.len() == 1 { "" } else { "s" },
        template.gates.len(),
        if template.gates.len() == 1 { "" } else { "s" },
        template.max_cycles,
        if template.max_cycles == 1 { "" } else { "s" },
    );
    for task in &template.tasks {
        let deps = if task.depends_on.is_empty() {
            String::new()
        } else {
            format!(" (after {})", task.depends_on.join(", "))
        };
        let flags = if task.breakpoint { " [breakpoint]" } else { "" };
        println!("  - {}{deps}{flags}", task.name);
    }
}
