//! Orchestration for the `ci` command: discover, select, resolve, plan,
//! execute, report.
//!
//! Discovery and configuration problems surface precisely: a broken project
//! or runner becomes an `Error` row for that project or runner alone, and
//! every other pair still runs. Only discovery failures and report-write
//! failures abort the whole run.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::context::RunContext;
use crate::core::classify::RunnerStatus;
use crate::core::filter::filter_runners;
use crate::core::graph::query_is_path;
use crate::core::registry::{ReportMode, plan_runners};
use crate::engine::{self, EngineOptions, ExecutionResult, ProjectPlan};
use crate::io::discover::{absolute, discover, normalize_path};
use crate::io::process::CancelToken;
use crate::io::report::{capture_path, report_path, write_capture, write_generic_report};
use crate::summary::overall_success;

/// Invocation-time options for one `ci` run.
#[derive(Debug, Clone, Default)]
pub struct CiOptions {
    /// Project selection query: name substring, exact name, or path.
    pub query: Option<String>,
    pub exact: bool,
    /// Explicit allow-list of runner names (`--check`).
    pub checks: Vec<String>,
    /// Explicit deny-list of runner names (`--skip`); always wins.
    pub skips: Vec<String>,
    /// Issue autofix invocations for failed checks.
    pub fix: bool,
    /// Narrow the runner set with each project's pre-declared quick list.
    pub quick: bool,
    /// Run projects one at a time instead of on the worker pool.
    pub sequential: bool,
}

/// Everything a caller needs to render and exit: one row per (project,
/// runner) outcome plus the overall verdict.
#[derive(Debug)]
pub struct CiRunReport {
    pub results: Vec<ExecutionResult>,
    pub success: bool,
}

/// Run continuous integration over the repository at `root`.
pub fn run_ci(root: &Path, options: &CiOptions, cancel: &CancelToken) -> Result<CiRunReport> {
    let repo_root = absolute(root);
    let graph = discover(&repo_root)?;
    info!(projects = graph.len(), root = %repo_root.display(), "discovery complete");

    let mut context = RunContext::new(repo_root.clone(), graph);
    let selected = select_project_names(&context, options);
    if selected.is_empty() {
        info!("nothing to do: no project matches the selection");
        return Ok(CiRunReport {
            results: Vec::new(),
            success: true,
        });
    }

    let (plans, mut results) = build_plans(&mut context, &selected, options);

    let engine_options = EngineOptions {
        repo_root: context.repo_root.clone(),
        parallel: !options.sequential,
        fix: options.fix,
        output_limit_bytes: 1_000_000,
    };
    let executed = engine::run(plans, &engine_options, cancel);

    write_reports(&context, &executed)?;

    results.extend(executed);
    sort_results(&selected, &mut results);

    let success = overall_success(&results);
    Ok(CiRunReport { results, success })
}

/// Selection: aggregator projects never make it into a runner plan, even
/// when the query names them explicitly.
fn select_project_names(context: &RunContext, options: &CiOptions) -> Vec<String> {
    let query = options.query.as_deref();
    let matched = match query {
        Some(query) if query_is_path(query) => {
            let target = normalize_path(&absolute(Path::new(query)));
            let target = target.display().to_string();
            context.graph.select(Some(target.as_str()), options.exact)
        }
        _ => context.graph.select(query, options.exact),
    };

    matched
        .into_iter()
        .filter(|project| !project.is_aggregator())
        .map(|project| project.name.clone())
        .collect()
}

/// Resolve configurations and build one frozen plan per runnable project.
///
/// Rows for everything that will not execute (skipped runners, disabled
/// projects, configuration failures) are produced here so the final summary
/// enumerates every outcome.
fn build_plans(
    context: &mut RunContext,
    selected: &[String],
    options: &CiOptions,
) -> (Vec<ProjectPlan>, Vec<ExecutionResult>) {
    let mut plans = Vec::new();
    let mut results = Vec::new();

    for name in selected {
        let Some((root, module)) = context
            .graph
            .get(name)
            .map(|project| (project.root.clone(), project.module.clone()))
        else {
            continue;
        };

        let config = match context.effective_config(name) {
            Ok(config) => config,
            Err(err) => {
                results.push(ExecutionResult::unexecuted(
                    name,
                    "configuration",
                    RunnerStatus::Error,
                    err.to_string(),
                ));
                continue;
            }
        };

        if config.ci.disabled {
            results.push(ExecutionResult::unexecuted(
                name,
                "ci",
                RunnerStatus::Skipped,
                "checks are disabled for this project".to_string(),
            ));
            continue;
        }

        let (specs, failures) = plan_runners(&config.ci);
        for (runner, err) in failures {
            results.push(ExecutionResult::unexecuted(
                name,
                &runner,
                RunnerStatus::Error,
                err.to_string(),
            ));
        }

        let quick = options.quick.then_some(&config.quick);
        let filtered = filter_runners(specs, &options.checks, &options.skips, quick);
        for runner in filtered.skipped {
            debug!(project = %name, runner = %runner, "runner skipped by selection");
            results.push(ExecutionResult::unexecuted(
                name,
                &runner,
                RunnerStatus::Skipped,
                String::new(),
            ));
        }

        if !filtered.selected.is_empty() {
            plans.push(ProjectPlan {
                project: name.clone(),
                module,
                root,
                runners: filtered.selected,
            });
        }
    }

    (plans, results)
}

/// Persist report files for executed pairs.
///
/// Generic-report runners always get the pass/fail record. Tool-owned
/// reports were written by the tool itself; when the tool errored before
/// producing its file, the generic record is written at the same path so the
/// per-runner report remains a contractual output. Pairs terminated by
/// cancellation produce no report at all.
fn write_reports(context: &RunContext, executed: &[ExecutionResult]) -> Result<()> {
    for result in executed {
        let Some(mode) = result.report else { continue };
        if result.cancelled {
            continue;
        }
        let Some(project) = context.graph.get(&result.project) else {
            continue;
        };

        let path = report_path(&project.root, &result.runner, &result.project);
        let write_generic = match mode {
            ReportMode::Generic => true,
            ReportMode::ToolOwned => !path.exists(),
        };
        if write_generic {
            write_generic_report(&path, &result.project, &result.runner, result.status, &result.output)
                .with_context(|| format!("persist report for {}/{}", result.project, result.runner))?;
        }

        if result.status.is_failure() && !result.output.is_empty() {
            let capture = capture_path(&project.root, &result.runner, &result.project);
            write_capture(&capture, &result.output)
                .with_context(|| format!("persist output capture for {}/{}", result.project, result.runner))?;
        }
    }
    Ok(())
}

/// Group rows by project in selection order; within a project, planning rows
/// come first, executed rows keep engine order.
fn sort_results(selected: &[String], results: &mut [ExecutionResult]) {
    let position = |project: &str| {
        selected
            .iter()
            .position(|name| name == project)
            .unwrap_or(selected.len())
    };
    results.sort_by_key(|result| position(&result.project));
}
