//! Execution engine for (project, runner) pairs.
//!
//! Projects run in parallel on a bounded worker pool; runners within a
//! project run serially, in plan order, because autofix-capable runners may
//! rewrite files later runners read. A `--sequential` fallback collapses the
//! pool to one worker. Every outcome is captured as data: a crashing or
//! missing tool becomes an `Error` result, never a panic or early return.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::core::classify::{RunnerStatus, classify_exit};
use crate::core::config::WorkingDirectoryKind;
use crate::core::registry::{CommandSpec, ReportMode, RunnerSpec, substitute};
use crate::io::environment::PythonEnvironment;
use crate::io::process::{CancelToken, run_command};
use crate::io::report::report_path;

/// Frozen execution plan for one project.
#[derive(Debug, Clone)]
pub struct ProjectPlan {
    pub project: String,
    pub module: String,
    pub root: PathBuf,
    /// Runners to execute, already filtered and ordered.
    pub runners: Vec<RunnerSpec>,
}

/// Engine-wide knobs for one run.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub repo_root: PathBuf,
    /// Parallelize across projects; runners within a project stay serial.
    pub parallel: bool,
    /// Issue autofix invocations for failed checks.
    pub fix: bool,
    pub output_limit_bytes: usize,
}

impl EngineOptions {
    pub fn new(repo_root: PathBuf) -> EngineOptions {
        EngineOptions {
            repo_root,
            parallel: true,
            fix: false,
            output_limit_bytes: 1_000_000,
        }
    }
}

/// Immutable outcome of one (project, runner) pair.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub project: String,
    pub runner: String,
    pub status: RunnerStatus,
    /// Captured tool output (stdout then stderr) of the decisive invocation.
    pub output: String,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub autofix_applied: bool,
    /// The pair was terminated by run-level cancellation; no report may be
    /// written for it.
    pub cancelled: bool,
    /// How this pair's report file comes to exist; `None` for rows that were
    /// never executed (skips, configuration failures).
    pub report: Option<ReportMode>,
}

impl ExecutionResult {
    /// A row for a pair that never executed.
    pub fn unexecuted(project: &str, runner: &str, status: RunnerStatus, output: String) -> Self {
        ExecutionResult {
            project: project.to_string(),
            runner: runner.to_string(),
            status,
            output,
            exit_code: None,
            duration: Duration::ZERO,
            autofix_applied: false,
            cancelled: false,
            report: None,
        }
    }
}

/// Execute every plan and return results in deterministic order: plans in
/// the order given, runners in plan order.
pub fn run(
    plans: Vec<ProjectPlan>,
    options: &EngineOptions,
    cancel: &CancelToken,
) -> Vec<ExecutionResult> {
    let workers = if options.parallel {
        thread::available_parallelism()
            .map(std::num::NonZero::get)
            .unwrap_or(4)
            .min(plans.len().max(1))
    } else {
        1
    };

    let queue: Mutex<VecDeque<(usize, ProjectPlan)>> =
        Mutex::new(plans.into_iter().enumerate().collect());
    let collected: Mutex<Vec<(usize, Vec<ExecutionResult>)>> = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let job = match queue.lock() {
                        Ok(mut queue) => queue.pop_front(),
                        Err(_) => break,
                    };
                    let Some((position, plan)) = job else { break };

                    debug!(project = %plan.project, runners = plan.runners.len(), "running project plan");
                    let results = run_project(&plan, options, cancel);
                    if let Ok(mut collected) = collected.lock() {
                        collected.push((position, results));
                    }
                }
            });
        }
    });

    let mut collected = collected.into_inner().unwrap_or_default();
    collected.sort_by_key(|(position, _)| *position);
    collected.into_iter().flat_map(|(_, results)| results).collect()
}

fn run_project(
    plan: &ProjectPlan,
    options: &EngineOptions,
    cancel: &CancelToken,
) -> Vec<ExecutionResult> {
    let environment = PythonEnvironment::for_project(&plan.root);
    let mut results = Vec::new();

    for runner in &plan.runners {
        if cancel.is_cancelled() {
            let mut result = ExecutionResult::unexecuted(
                &plan.project,
                &runner.name,
                RunnerStatus::Error,
                "run cancelled before this check started".to_string(),
            );
            result.cancelled = true;
            results.push(result);
            continue;
        }
        results.push(execute_pair(plan, runner, &environment, options, cancel));
    }
    results
}

fn execute_pair(
    plan: &ProjectPlan,
    runner: &RunnerSpec,
    environment: &PythonEnvironment,
    options: &EngineOptions,
    cancel: &CancelToken,
) -> ExecutionResult {
    let start = Instant::now();
    let report = report_path(&plan.root, &runner.name, &plan.project);

    // tools that write their own report need the directory up front
    if runner.report == ReportMode::ToolOwned
        && let Some(parent) = report.parent()
        && let Err(err) = fs::create_dir_all(parent)
    {
        warn!(path = %parent.display(), err = %err, "cannot create report directory");
    }

    let scratch = if runner.needs_scratch {
        match TempDir::new() {
            Ok(scratch) => Some(scratch),
            Err(err) => {
                return ExecutionResult {
                    project: plan.project.clone(),
                    runner: runner.name.clone(),
                    status: RunnerStatus::Error,
                    output: format!("cannot create scratch directory: {err}"),
                    exit_code: None,
                    duration: start.elapsed(),
                    autofix_applied: false,
                    cancelled: false,
                    report: Some(runner.report),
                };
            }
        }
    } else {
        None
    };

    let python = environment.python().display().to_string();
    let project_root = plan.root.display().to_string();
    let repo_root = options.repo_root.display().to_string();
    let report_str = report.display().to_string();
    let scratch_str = scratch
        .as_ref()
        .map(|dir| dir.path().display().to_string())
        .unwrap_or_default();
    let vars: Vec<(&str, &str)> = vec![
        ("python", python.as_str()),
        ("project-name", plan.project.as_str()),
        ("module", plan.module.as_str()),
        ("project-root", project_root.as_str()),
        ("repo-root", repo_root.as_str()),
        ("report-path", report_str.as_str()),
        ("scratch", scratch_str.as_str()),
    ];

    let workdir: &Path = match runner.working_directory {
        WorkingDirectoryKind::Project => &plan.root,
        WorkingDirectoryKind::Repository => &options.repo_root,
    };

    let outcome = run_sequence(
        &runner.check,
        runner,
        environment,
        workdir,
        &vars,
        options,
        cancel,
    );
    let status = outcome.status;
    let mut output = outcome.output;

    let mut autofix_applied = false;
    if options.fix
        && (status == RunnerStatus::CheckFailed || runner.force_fix)
        && !cancel.is_cancelled()
        && let Some(autofix) = &runner.autofix
    {
        debug!(project = %plan.project, runner = %runner.name, "issuing autofix invocation");
        // fixing is a side effect: the fix invocation's exit code never
        // rewrites the recorded check status
        let fix = run_sequence(
            autofix,
            runner,
            environment,
            workdir,
            &vars,
            options,
            cancel,
        );
        if !fix.output.is_empty() {
            output.push_str("\n[autofix output]\n");
            output.push_str(&fix.output);
        }
        autofix_applied = true;
    }

    ExecutionResult {
        project: plan.project.clone(),
        runner: runner.name.clone(),
        status,
        output,
        exit_code: outcome.exit_code,
        duration: start.elapsed(),
        autofix_applied,
        cancelled: outcome.cancelled,
        report: Some(runner.report),
    }
}

struct SequenceOutcome {
    status: RunnerStatus,
    output: String,
    exit_code: Option<i32>,
    cancelled: bool,
}

/// Run an invocation sequence: every command must exit 0 for success; the
/// first deviation decides the outcome.
fn run_sequence(
    commands: &[CommandSpec],
    runner: &RunnerSpec,
    environment: &PythonEnvironment,
    workdir: &Path,
    vars: &[(&str, &str)],
    options: &EngineOptions,
    cancel: &CancelToken,
) -> SequenceOutcome {
    let mut output = String::new();
    let done = |status, output, exit_code, cancelled| SequenceOutcome {
        status,
        output,
        exit_code,
        cancelled,
    };

    for spec in commands {
        let args: Vec<String> = spec.args.iter().map(|arg| substitute(arg, vars)).collect();
        let mut command = environment.command(spec, &args);
        command.current_dir(workdir);

        let result = run_command(command, runner.timeout, options.output_limit_bytes, cancel);
        let captured = match result {
            Ok(captured) => captured,
            Err(err) => {
                // spawn failure: the tool is missing or unrunnable; this is
                // never "the check passed with issues"
                return done(RunnerStatus::Error, format!("{err:#}"), None, false);
            }
        };

        let text = captured.combined_text();
        if !text.is_empty() {
            output.push_str(&text);
        }

        if captured.cancelled {
            output.push_str("\n[run cancelled while the check was in flight]");
            return done(RunnerStatus::Error, output, None, true);
        }
        if captured.timed_out {
            output.push_str(&format!(
                "\n[check timed out after {}s]",
                runner.timeout.as_secs()
            ));
            return done(RunnerStatus::Error, output, None, false);
        }

        match classify_exit(captured.code, &runner.accepted_exit_codes) {
            RunnerStatus::Success => {}
            status => return done(status, output, captured.code, false),
        }
    }

    done(RunnerStatus::Success, output, Some(0), false)
}
