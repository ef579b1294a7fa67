//! Runner-set selection precedence.
//!
//! Three narrowing mechanisms compose, strongest first: an explicit `--skip`
//! always removes a runner; a non-empty explicit `--check` list restricts the
//! run to exactly that set; quick mode's pre-declared allow/deny list applies
//! only to runners no explicit flag named.

use crate::core::config::QuickConfig;
use crate::core::registry::RunnerSpec;

/// Result of narrowing a runner plan.
#[derive(Debug, Default)]
pub struct FilteredPlan {
    /// Runners that will execute, original order preserved.
    pub selected: Vec<RunnerSpec>,
    /// Names of runners dropped by a selector, for the run summary.
    pub skipped: Vec<String>,
}

/// Narrow `runners` with the invocation-time selectors.
///
/// `quick` is `Some` only when quick mode was requested for this run.
pub fn filter_runners(
    runners: Vec<RunnerSpec>,
    checks: &[String],
    skips: &[String],
    quick: Option<&QuickConfig>,
) -> FilteredPlan {
    let checks: Vec<String> = checks.iter().map(|name| name.to_lowercase()).collect();
    let skips: Vec<String> = skips.iter().map(|name| name.to_lowercase()).collect();

    let mut plan = FilteredPlan::default();
    for runner in runners {
        let name = runner.name.to_lowercase();

        let keep = if skips.contains(&name) {
            false
        } else if !checks.is_empty() {
            checks.contains(&name)
        } else {
            quick.is_none_or(|quick| quick_allows(quick, &name))
        };

        if keep {
            plan.selected.push(runner);
        } else {
            plan.skipped.push(runner.name);
        }
    }
    plan
}

fn quick_allows(quick: &QuickConfig, name: &str) -> bool {
    if !quick.check.is_empty() {
        return quick.check.iter().any(|entry| entry.to_lowercase() == name);
    }
    if !quick.skip.is_empty() {
        return !quick.skip.iter().any(|entry| entry.to_lowercase() == name);
    }
    true
}
