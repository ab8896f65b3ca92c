//! Execution payload and retry-task prompt composition.
//!
//! A task's prompt is assembled from: the template's global context, the files
//! the task expects to touch, summaries of its completed dependencies (split
//! into same-repository and cross-repository groups, since the agent can only
//! read branches of the repository it is working in), and the task's own
//! instructions.
//!
//! The retry prompt aggregates everything a fix pass needs: prior-cycle
//! results, the original scope, branches to merge, the concrete failure list,
//! and the tracking issues to close.

use crate::agent::JobPayload;
use crate::gates::GateResult;
use crate::task::{Task, TaskInput};
use crate::template::Template;

/// Compose the full execution payload for one task.
///
/// `dependencies` are the completed records of the task's direct dependencies.
pub fn build_job_payload(template: &Template, task: &Task, dependencies: &[&Task]) -> JobPayload {
    JobPayload {
        task_id: task.input.id.clone(),
        name: task.input.name.clone(),
        prompt: build_task_prompt(template, task, dependencies),
        repository: template.repository_for(&task.input),
        branch: task.input.branch.clone(),
        model: task.input.model.clone(),
    }
}

/// Compose the prompt text for one task.
pub fn build_task_prompt(template: &Template, task: &Task, dependencies: &[&Task]) -> String {
    let task_repo = template.repository_for(&task.input);

    let (same_repo, cross_repo): (Vec<&&Task>, Vec<&&Task>) = dependencies
        .iter()
        .partition(|dep| template.repository_for(&dep.input) == task_repo);

    let mut sections: Vec<String> = Vec::new();

    if !template.context.trim().is_empty() {
        sections.push(format!("## Project context\n\n{}", template.context.trim()));
    }

    if !task.input.files.is_empty() {
        sections.push(format!(
            "## Relevant files\n\n{}",
            bullet_list(task.input.files.iter().map(String::as_str)),
        ));
    }

    if !same_repo.is_empty() {
        sections.push(format!(
            "## Completed dependencies (this repository)\n\n{}",
            dependency_summaries(&same_repo),
        ));
    }

    if !cross_repo.is_empty() {
        sections.push(format!(
            "## Completed dependencies (other repositories)\n\n{}",
            dependency_summaries(&cross_repo),
        ));
    }

    sections.push(format!("## Task: {}\n\n{}", task.input.name, task.input.prompt));

    sections.join("\n\n")
}

fn dependency_summaries(deps: &[&&Task]) -> String {
    deps.iter()
        .map(|dep| {
            let mut line = format!("- {} ({})", dep.input.name, dep.input.id);
            if let Some(result) = &dep.result {
                if let Some(branch) = &result.branch {
                    line.push_str(&format!(", branch `{branch}`"));
                }
                if let Some(output_ref) = &result.output_ref {
                    line.push_str(&format!(", output {output_ref}"));
                }
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bullet_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Synthesize the single retry task for the next QA cycle.
///
/// One aggregated task is generated regardless of how many gates failed;
/// failures from every failing gate are folded into one coherent fix pass.
pub fn build_retry_task(
    template: &Template,
    cycle: usize,
    completed: &[Task],
    failing: &[&GateResult],
    issue_ids: &[String],
) -> TaskInput {
    let next_cycle = cycle + 1;
    let branch = format!("conductor/qa-fix-cycle-{next_cycle}");

    let mut sections: Vec<String> = Vec::new();

    if !template.context.trim().is_empty() {
        sections.push(format!("## Project context\n\n{}", template.context.trim()));
    }

    if !completed.is_empty() {
        sections.push(format!(
            "## Work completed in the previous cycle\n\n{}",
            completed
                .iter()
                .map(|t| {
                    let branch = t
                        .result
                        .as_ref()
                        .and_then(|r| r.branch.as_deref())
                        .unwrap_or("(no branch)");
                    format!("- {} ({}): branch `{}`", t.input.name, t.input.id, branch)
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ));
    }

    sections.push(format!(
        "## Original task scope\n\n{}",
        bullet_list(template.tasks.iter().map(|t| t.name.as_str())),
    ));

    let mut failure_lines = Vec::new();
    for result in failing {
        for failure in &result.failures {
            let mut line = format!("- [{}] {}", result.gate, failure.message);
            if let Some(file) = &failure.file {
                line.push_str(&format!(" ({file}"));
                if let Some(ln) = failure.line {
                    line.push_str(&format!(":{ln}"));
                }
                line.push(')');
            }
            failure_lines.push(line);
        }
    }
    sections.push(format!(
        "## Validation failures to fix\n\n{}",
        failure_lines.join("\n"),
    ));

    if !template.scope.is_empty() {
        sections.push(format!(
            "## Constraints\n\n{}",
            bullet_list(template.scope.iter().map(String::as_str)),
        ));
    }

    if !issue_ids.is_empty() {
        sections.push(format!(
            "## Tracking issues to close on success\n\n{}",
            bullet_list(issue_ids.iter().map(String::as_str)),
        ));
    }

    let gate_names: Vec<&str> = failing.iter().map(|r| r.gate.as_str()).collect();

    TaskInput {
        id: format!("qa-fix-cycle-{next_cycle}"),
        name: format!("Fix validation failures ({})", gate_names.join(", ")),
        prompt: sections.join("\n\n"),
        depends_on: Vec::new(),
        priority: 0,
        branch: Some(branch),
        timeout_minutes: None,
        retries: None,
        model: None,
        repository: template.repository.clone(),
        files: Vec::new(),
        breakpoint: false,
        complete: false,
    }
}
