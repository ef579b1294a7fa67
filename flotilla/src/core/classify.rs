//! Outcome classification for runner executions.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Classified outcome of one (project, runner) execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunnerStatus {
    /// The check completed and found nothing.
    Success,
    /// The check completed and found issues.
    CheckFailed,
    /// The runner itself failed: spawn failure, timeout, kill, or an exit
    /// code outside the accepted set.
    Error,
    /// The pair was intentionally not executed.
    Skipped,
}

impl RunnerStatus {
    /// Whether this outcome fails the run.
    pub fn is_failure(self) -> bool {
        matches!(self, RunnerStatus::CheckFailed | RunnerStatus::Error)
    }
}

impl fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunnerStatus::Success => "Success",
            RunnerStatus::CheckFailed => "CheckFailed",
            RunnerStatus::Error => "Error",
            RunnerStatus::Skipped => "Skipped",
        };
        f.write_str(label)
    }
}

/// Classify a subprocess exit.
///
/// `None` means the process did not exit on its own (killed by a signal,
/// timeout, or cancellation) and is never a `check-failed`: a missing or
/// crashed tool must not read as "the check passed with issues".
pub fn classify_exit(code: Option<i32>, accepted: &BTreeSet<i32>) -> RunnerStatus {
    match code {
        Some(0) => RunnerStatus::Success,
        Some(code) if accepted.contains(&code) => RunnerStatus::CheckFailed,
        _ => RunnerStatus::Error,
    }
}
