//! Run-level aggregation: the overall verdict and the console summary.

use std::time::Duration;

use crate::core::classify::RunnerStatus;
use crate::engine::ExecutionResult;

const MIN_PROJECT_WIDTH: usize = 12;
const MIN_CHECK_WIDTH: usize = 16;
const MIN_STATUS_WIDTH: usize = 11; // "CheckFailed"
const COL_SPACING: usize = 2;

/// The run fails when any pair ended in `check-failed` or `error`;
/// intentionally skipped pairs never fail a run.
pub fn overall_success(results: &[ExecutionResult]) -> bool {
    results.iter().all(|result| !result.status.is_failure())
}

/// Aligned Project/Check/Status/Duration table enumerating every outcome.
pub fn summary_table(results: &[ExecutionResult]) -> String {
    let project_width = column_width(results.iter().map(|r| r.project.len()), MIN_PROJECT_WIDTH);
    let check_width = column_width(results.iter().map(|r| r.runner.len()), MIN_CHECK_WIDTH);
    let status_width = column_width(
        results.iter().map(|r| r.status.to_string().len()),
        MIN_STATUS_WIDTH,
    );
    let duration_width = column_width(
        results.iter().map(|r| format_duration(r.duration).len()),
        "Duration".len(),
    );
    let spacing = " ".repeat(COL_SPACING);

    let mut lines = vec![format!(
        "{:<project_width$}{spacing}{:<check_width$}{spacing}{:<status_width$}{spacing}{:>duration_width$}",
        "Project", "Check", "Status", "Duration",
    )];
    lines.push(format!(
        "{}{spacing}{}{spacing}{}{spacing}{}",
        "-".repeat(project_width),
        "-".repeat(check_width),
        "-".repeat(status_width),
        "-".repeat(duration_width),
    ));

    for result in results {
        lines.push(format!(
            "{:<project_width$}{spacing}{:<check_width$}{spacing}{:<status_width$}{spacing}{:>duration_width$}",
            result.project,
            result.runner,
            result.status.to_string(),
            format_duration(result.duration),
        ));
    }

    lines.join("\n")
}

/// One block per failing pair, carrying the captured tool output.
pub fn failure_details(results: &[ExecutionResult]) -> String {
    let mut blocks = Vec::new();
    for result in results {
        if !result.status.is_failure() {
            continue;
        }
        let headline = match result.status {
            RunnerStatus::CheckFailed => {
                format!("{} / {} found issues:", result.project, result.runner)
            }
            _ => format!(
                "{} / {} exited unexpectedly (exit code {:?}):",
                result.project, result.runner, result.exit_code
            ),
        };
        let mut block = format!("---\n{headline}");
        if result.output.is_empty() {
            block.push_str("\n(no output captured)");
        } else {
            block.push('\n');
            block.push_str(result.output.trim_end());
        }
        if result.autofix_applied {
            block.push_str("\nAn autofix was applied; re-run the checks to confirm.");
        }
        blocks.push(block);
    }
    blocks.join("\n\n")
}

fn column_width(lengths: impl Iterator<Item = usize>, minimum: usize) -> usize {
    lengths.max().unwrap_or(minimum).max(minimum)
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}
