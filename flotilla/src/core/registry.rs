//! Catalog of runnable checks.
//!
//! Built-in runner templates plus per-project custom templates are built into
//! frozen [`RunnerSpec`]s. A spec carries everything the execution engine
//! needs: invocation sequences with placeholders, accepted failing exit
//! codes, report emission mode, and autofix capability.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;
use toml::Value;

use crate::core::config::{
    CiConfig, CustomRunnerOptions, FixedRunnerOptions, FormatCheckOptions,
    TestOptions, TypeCheckOptions, WorkingDirectoryKind,
};
use crate::errors::RunnerConfigError;

pub const TYPE_CHECK: &str = "type-check";
pub const TEST: &str = "test";
pub const FORMAT_CHECK: &str = "format-check";
pub const MANIFEST_CHECK: &str = "manifest-check";
pub const CHECK_OUTDATED: &str = "check-outdated";
pub const OFFLINE_BUILD: &str = "offline-build";

/// Built-in templates in their canonical position. Custom redefinitions of a
/// built-in name occupy the same position.
pub const BUILTIN_ORDER: [&str; 6] = [
    CHECK_OUTDATED,
    OFFLINE_BUILD,
    TYPE_CHECK,
    TEST,
    MANIFEST_CHECK,
    FORMAT_CHECK,
];

/// Runners whose invocation is fixed: they are identified, not overridable.
pub const RESERVED_NAMES: [&str; 2] = [CHECK_OUTDATED, OFFLINE_BUILD];

/// Wall-clock ceiling for one runner invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30 * 60;

/// What to invoke: a module through the project interpreter, or a bare
/// executable resolved on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    Module(String),
    Executable(String),
}

/// One command of an invocation sequence. Arguments may carry placeholders
/// (`{python}`, `{project-name}`, `{module}`, `{project-root}`,
/// `{repo-root}`, `{report-path}`, `{scratch}`) substituted at execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: Program,
    pub args: Vec<String>,
}

impl CommandSpec {
    fn module(module: &str, args: &[&str]) -> Self {
        Self {
            program: Program::Module(module.to_string()),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn executable(exe: &str, args: &[&str]) -> Self {
        Self {
            program: Program::Executable(exe.to_string()),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// How a runner's report file comes to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// The orchestrator writes the generic pass/fail record.
    Generic,
    /// The tool writes its own report at `{report-path}`.
    ToolOwned,
}

/// A fully built, immutable runnable check.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerSpec {
    pub name: String,
    /// Check invocation: commands run in order, first failure decides.
    pub check: Vec<CommandSpec>,
    /// Autofix invocation; absent means the runner has no autofix capability.
    pub autofix: Option<Vec<CommandSpec>>,
    /// Exit codes classified as `check-failed` rather than `error`.
    pub accepted_exit_codes: BTreeSet<i32>,
    pub report: ReportMode,
    pub working_directory: WorkingDirectoryKind,
    /// Run the autofix invocation even when the check did not fail.
    pub force_fix: bool,
    pub timeout: Duration,
    /// The invocation needs a per-execution scratch directory (`{scratch}`).
    pub needs_scratch: bool,
}

impl RunnerSpec {
    pub fn supports_autofix(&self) -> bool {
        self.autofix.is_some()
    }
}

/// Build the ordered runner plan for one project's merged configuration.
///
/// Runners that fail to build are returned separately so one bad definition
/// never blocks its siblings. Autofix-capable runners are moved to the front:
/// they may rewrite files that later runners read, and stale line numbers in
/// a type checker's output are worse than a reordered plan.
pub fn plan_runners(ci: &CiConfig) -> (Vec<RunnerSpec>, Vec<(String, RunnerConfigError)>) {
    let mut specs = Vec::new();
    let mut failures = Vec::new();

    let custom_names: Vec<String> = ci.custom_runners.keys().cloned().collect();

    for name in BUILTIN_ORDER {
        match custom_names.iter().find(|candidate| candidate.as_str() == name) {
            // a custom definition under a built-in name fully replaces it
            Some(custom) => match build_custom_entry(custom, &ci.custom_runners[custom]) {
                Ok(Some(spec)) => specs.push(spec),
                Ok(None) => {}
                Err(err) => failures.push((custom.clone(), err)),
            },
            None => {
                if let Some(spec) = build_builtin(name, ci) {
                    specs.push(spec);
                }
            }
        }
    }

    for name in &custom_names {
        if BUILTIN_ORDER.contains(&name.as_str()) {
            continue;
        }
        match build_custom_entry(name, &ci.custom_runners[name]) {
            Ok(Some(spec)) => specs.push(spec),
            Ok(None) => {}
            Err(err) => failures.push((name.clone(), err)),
        }
    }

    specs.sort_by_key(|spec| !spec.supports_autofix());
    (specs, failures)
}

fn build_builtin(name: &str, ci: &CiConfig) -> Option<RunnerSpec> {
    match name {
        TYPE_CHECK => ci.type_check.enabled().then(|| type_check(&ci.type_check.options())),
        TEST => ci.test.enabled().then(|| test(&ci.test.options())),
        FORMAT_CHECK => ci
            .format_check
            .enabled()
            .then(|| format_check(&ci.format_check.options())),
        MANIFEST_CHECK => ci
            .manifest_check
            .enabled()
            .then(|| manifest_check(&ci.manifest_check.options())),
        CHECK_OUTDATED => ci
            .check_outdated
            .enabled()
            .then(|| check_outdated(&ci.check_outdated.options())),
        OFFLINE_BUILD => ci
            .offline_build
            .enabled()
            .then(|| offline_build(&ci.offline_build.options())),
        _ => None,
    }
}

fn build_custom_entry(name: &str, value: &Value) -> Result<Option<RunnerSpec>, RunnerConfigError> {
    if RESERVED_NAMES.contains(&name) {
        return Err(RunnerConfigError::ReservedRunner {
            runner: name.to_string(),
        });
    }

    let options = match value {
        Value::Boolean(false) => return Ok(None),
        Value::Boolean(true) => CustomRunnerOptions::default(),
        other => CustomRunnerOptions::deserialize(other.clone()).map_err(|err| {
            RunnerConfigError::Invalid {
                runner: name.to_string(),
                detail: err.to_string(),
            }
        })?,
    };

    if options.check_args.is_empty() {
        return Err(RunnerConfigError::MissingCheckArgs {
            runner: name.to_string(),
        });
    }

    Ok(Some(custom(name, &options)))
}

fn timeout(secs: Option<u64>) -> Duration {
    Duration::from_secs(secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
}

fn default_exit_codes() -> BTreeSet<i32> {
    BTreeSet::from([1])
}

fn type_check(options: &TypeCheckOptions) -> RunnerSpec {
    let mut args: Vec<String> = [
        "--python-executable",
        "{python}",
        "--cache-dir",
        "{project-root}/.mypy_cache",
        "--show-error-codes",
        "--junit-xml={report-path}",
    ]
    .iter()
    .map(|a| a.to_string())
    .collect();

    if let Some(config_file) = &options.set_config {
        args.push("--config-file".to_string());
        args.push(config_file.clone());
    }

    if options.paths.is_empty() {
        for pattern in &options.exclude {
            args.push("--exclude".to_string());
            args.push(pattern.clone());
        }
        args.push(".".to_string());
    } else {
        args.extend(options.paths.iter().cloned());
    }

    RunnerSpec {
        name: TYPE_CHECK.to_string(),
        check: vec![CommandSpec {
            program: Program::Module("mypy".to_string()),
            args,
        }],
        autofix: None,
        accepted_exit_codes: default_exit_codes(),
        report: ReportMode::ToolOwned,
        working_directory: WorkingDirectoryKind::Project,
        force_fix: false,
        timeout: timeout(options.timeout_secs),
        needs_scratch: false,
    }
}

fn test(options: &TestOptions) -> RunnerSpec {
    let mut args: Vec<String> = ["--durations=5", "--tb=short", "--junitxml={report-path}"]
        .iter()
        .map(|a| a.to_string())
        .collect();

    if let Some(expression) = &options.marker_expression {
        args.push("-m".to_string());
        args.push(expression.clone());
    }
    if options.doctest_modules {
        args.push("--doctest-modules".to_string());
    }

    RunnerSpec {
        name: TEST.to_string(),
        check: vec![CommandSpec {
            program: Program::Module("pytest".to_string()),
            args,
        }],
        autofix: None,
        accepted_exit_codes: default_exit_codes(),
        report: ReportMode::ToolOwned,
        working_directory: WorkingDirectoryKind::Project,
        force_fix: false,
        timeout: timeout(options.timeout_secs),
        needs_scratch: false,
    }
}

fn format_check(options: &FormatCheckOptions) -> RunnerSpec {
    RunnerSpec {
        name: FORMAT_CHECK.to_string(),
        check: vec![CommandSpec::module("black", &[".", "--check"])],
        autofix: Some(vec![CommandSpec::module("black", &["."])]),
        accepted_exit_codes: default_exit_codes(),
        report: ReportMode::Generic,
        working_directory: WorkingDirectoryKind::Project,
        force_fix: options.force_fix,
        timeout: timeout(options.timeout_secs),
        needs_scratch: false,
    }
}

fn manifest_check(options: &FixedRunnerOptions) -> RunnerSpec {
    RunnerSpec {
        name: MANIFEST_CHECK.to_string(),
        check: vec![CommandSpec::executable("poetry", &["check"])],
        autofix: None,
        accepted_exit_codes: default_exit_codes(),
        report: ReportMode::Generic,
        working_directory: WorkingDirectoryKind::Project,
        force_fix: false,
        timeout: timeout(options.timeout_secs),
        needs_scratch: false,
    }
}

fn check_outdated(options: &FixedRunnerOptions) -> RunnerSpec {
    RunnerSpec {
        name: CHECK_OUTDATED.to_string(),
        check: vec![CommandSpec::executable("poetry", &["check", "--lock"])],
        autofix: None,
        accepted_exit_codes: default_exit_codes(),
        report: ReportMode::Generic,
        working_directory: WorkingDirectoryKind::Project,
        force_fix: false,
        timeout: timeout(options.timeout_secs),
        needs_scratch: false,
    }
}

fn offline_build(options: &FixedRunnerOptions) -> RunnerSpec {
    RunnerSpec {
        name: OFFLINE_BUILD.to_string(),
        check: vec![
            CommandSpec::executable("poetry", &["build", "--output", "{scratch}/dist"]),
            CommandSpec::module(
                "pip",
                &[
                    "install",
                    "{project-name}",
                    "--no-cache",
                    "--no-index",
                    "--find-links",
                    "{scratch}/dist",
                    "--target",
                    "{scratch}/pip-install-test",
                ],
            ),
        ],
        autofix: None,
        accepted_exit_codes: default_exit_codes(),
        report: ReportMode::Generic,
        working_directory: WorkingDirectoryKind::Project,
        force_fix: false,
        timeout: timeout(options.timeout_secs),
        needs_scratch: true,
    }
}

fn custom(name: &str, options: &CustomRunnerOptions) -> RunnerSpec {
    let program = match &options.executable {
        Some(exe) => Program::Executable(exe.clone()),
        None => Program::Module(name.to_string()),
    };

    RunnerSpec {
        name: name.to_string(),
        check: vec![CommandSpec {
            program: program.clone(),
            args: options.check_args.clone(),
        }],
        autofix: options.autofix_args.as_ref().map(|args| {
            vec![CommandSpec {
                program,
                args: args.clone(),
            }]
        }),
        accepted_exit_codes: options.check_failed_exit_codes.iter().copied().collect(),
        report: if options.create_generic_report {
            ReportMode::Generic
        } else {
            ReportMode::ToolOwned
        },
        working_directory: options.working_directory,
        force_fix: options.force_fix,
        timeout: timeout(options.timeout_secs),
        needs_scratch: false,
    }
}

/// Replace every `{key}` placeholder occurrence. Unknown placeholders are
/// left intact so a typo surfaces in the failing command line instead of
/// vanishing silently.
pub fn substitute(arg: &str, vars: &[(&str, &str)]) -> String {
    let mut result = arg.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Table;

    fn customs(text: &str) -> Table {
        toml::from_str(text).expect("valid custom-runner table")
    }

    fn enabled_ci() -> CiConfig {
        CiConfig {
            type_check: RunnerSetting::Toggle(true),
            test: RunnerSetting::Toggle(true),
            format_check: RunnerSetting::Toggle(true),
            manifest_check: RunnerSetting::Toggle(true),
            check_outdated: RunnerSetting::Toggle(true),
            offline_build: RunnerSetting::Toggle(true),
            ..CiConfig::default()
        }
    }

    #[test]
    fn autofix_capable_runners_come_first() {
        let (specs, failures) = plan_runners(&enabled_ci());
        assert!(failures.is_empty());
        assert_eq!(specs[0].name, FORMAT_CHECK);
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![FORMAT_CHECK, CHECK_OUTDATED, OFFLINE_BUILD, TYPE_CHECK, TEST, MANIFEST_CHECK]
        );
    }

    #[test]
    fn disabled_runners_are_absent() {
        let (specs, _) = plan_runners(&CiConfig::default());
        assert!(specs.is_empty());
    }

    #[test]
    fn custom_runner_replaces_builtin_completely() {
        let mut ci = enabled_ci();
        ci.custom_runners = customs(
            "[test]\nexecutable = \"cargo\"\ncheck-args = [\"nextest\", \"run\"]\n",
        );
        let (specs, failures) = plan_runners(&ci);
        assert!(failures.is_empty());
        let test_spec = specs.iter().find(|s| s.name == TEST).expect("test runner");
        assert_eq!(
            test_spec.check[0].program,
            Program::Executable("cargo".to_string())
        );
        // no partial inheritance from the built-in template
        assert_eq!(test_spec.check[0].args, vec!["nextest", "run"]);
        assert_eq!(test_spec.report, ReportMode::Generic);
    }

    #[test]
    fn reserved_names_cannot_be_redefined() {
        let mut ci = CiConfig::default();
        ci.custom_runners = customs("[check-outdated]\ncheck-args = [\"x\"]\n");
        let (_, failures) = plan_runners(&ci);
        assert!(matches!(
            failures.as_slice(),
            [(name, RunnerConfigError::ReservedRunner { .. })] if name == CHECK_OUTDATED
        ));
    }

    #[test]
    fn custom_runner_without_check_args_fails_alone() {
        let mut ci = CiConfig::default();
        ci.type_check = RunnerSetting::Toggle(true);
        ci.custom_runners = customs(
            "incomplete = true\n\n[lint]\nexecutable = \"ruff\"\ncheck-args = [\"check\", \".\"]\n",
        );
        let (specs, failures) = plan_runners(&ci);
        assert!(matches!(
            failures.as_slice(),
            [(name, RunnerConfigError::MissingCheckArgs { .. })] if name == "incomplete"
        ));
        // siblings still build
        assert!(specs.iter().any(|s| s.name == "lint"));
        assert!(specs.iter().any(|s| s.name == TYPE_CHECK));
    }

    #[test]
    fn unknown_custom_option_is_reported_with_detail() {
        let mut ci = CiConfig::default();
        ci.custom_runners = customs(
            "[lint]\ncheck-args = [\".\"]\nworking-dir = \"repository\"\n",
        );
        let (_, failures) = plan_runners(&ci);
        assert!(matches!(
            failures.as_slice(),
            [(_, RunnerConfigError::Invalid { detail, .. })] if detail.contains("working-dir")
        ));
    }

    #[test]
    fn type_check_selector_paths_are_forwarded() {
        let options = TypeCheckOptions {
            paths: vec!["src".to_string(), "tests".to_string()],
            ..TypeCheckOptions::default()
        };
        let spec = type_check(&options);
        let args = &spec.check[0].args;
        assert!(args.ends_with(&["src".to_string(), "tests".to_string()]));
        assert!(!args.contains(&".".to_string()));
    }

    #[test]
    fn substitute_replaces_every_occurrence() {
        let vars = [("scratch", "/tmp/s"), ("module", "pkg")];
        assert_eq!(
            substitute("{scratch}/dist:{scratch}/cache", &vars),
            "/tmp/s/dist:/tmp/s/cache"
        );
        assert_eq!(substitute("{module}", &vars), "pkg");
        assert_eq!(substitute("{unknown}", &vars), "{unknown}");
    }
}
