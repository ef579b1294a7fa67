//! CLI tests for `flotilla ci`.
//!
//! Spawns the flotilla binary against fixture repositories and verifies exit
//! codes, runner selection, and report emission. Custom runners backed by
//! `echo`/`sh` keep the fixtures hermetic: no real verification tool is
//! needed.

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::Command;

use flotilla::exit_codes;

const QUIET_BUILTINS: &str =
    "type-check = false\nmanifest-check = false\ncheck-outdated = false\n";

fn write_project(repo: &Path, dir: &str, name: &str, extra: &str) {
    let root = repo.join(dir);
    fs::create_dir_all(&root).expect("mkdir");
    fs::write(
        root.join("pyproject.toml"),
        format!("[tool.poetry]\nname = \"{name}\"\n{extra}"),
    )
    .expect("write manifest");
}

fn echo_runner_section() -> String {
    format!(
        "[tool.flotilla.ci]\n{QUIET_BUILTINS}\n[tool.flotilla.ci.custom-runners.echo-check]\nexecutable = \"echo\"\ncheck-args = [\"checked\"]\n"
    )
}

fn flotilla(repo: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_flotilla"))
        .current_dir(repo)
        .args(args)
        .output()
        .expect("run flotilla")
}

#[test]
fn passing_run_exits_ok_and_writes_one_report_per_pair() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_project(temp.path(), "alpha", "alpha", &echo_runner_section());
    write_project(
        temp.path(),
        "beta",
        "beta",
        &format!(
            "[tool.poetry.dependencies]\nalpha = {{ path = \"../alpha\" }}\n\n{}",
            echo_runner_section()
        ),
    );

    let output = flotilla(temp.path(), &["ci", "--check", "echo-check"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    assert!(temp.path().join("alpha/.ci/ci.echo-check.alpha.xml").is_file());
    assert!(temp.path().join("beta/.ci/ci.echo-check.beta.xml").is_file());
}

#[test]
fn failing_check_exits_failed_and_is_summarized() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_project(
        temp.path(),
        "alpha",
        "alpha",
        &format!(
            "[tool.flotilla.ci]\n{QUIET_BUILTINS}\n[tool.flotilla.ci.custom-runners.always-fails]\nexecutable = \"sh\"\ncheck-args = [\"-c\", \"echo broken; exit 1\"]\n"
        ),
    );

    let output = flotilla(temp.path(), &["ci"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CheckFailed"));
    assert!(stdout.contains("broken"));
}

#[test]
fn skip_removes_a_runner_even_when_checked() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_project(
        temp.path(),
        "alpha",
        "alpha",
        &format!(
            "[tool.flotilla.ci]\n{QUIET_BUILTINS}\n[tool.flotilla.ci.custom-runners.always-fails]\nexecutable = \"sh\"\ncheck-args = [\"-c\", \"exit 1\"]\n"
        ),
    );

    let output = flotilla(
        temp.path(),
        &["ci", "--check", "always-fails", "--skip", "always-fails"],
    );
    // the failing runner never executed, so the run passes
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(!temp.path().join("alpha/.ci/ci.always-fails.alpha.xml").exists());
}

#[test]
fn query_limits_execution_to_matching_projects() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_project(temp.path(), "alpha", "alpha", &echo_runner_section());
    write_project(temp.path(), "beta", "beta", &echo_runner_section());

    let output = flotilla(temp.path(), &["ci", "alpha", "--check", "echo-check"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    assert!(temp.path().join("alpha/.ci/ci.echo-check.alpha.xml").is_file());
    assert!(!temp.path().join("beta/.ci").exists());
}

#[test]
fn discovery_failure_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_project(
        temp.path(),
        "alpha",
        "alpha",
        "[tool.poetry.dependencies]\nbeta = { path = \"../beta\" }\n",
    );
    write_project(
        temp.path(),
        "beta",
        "beta",
        "[tool.poetry.dependencies]\nalpha = { path = \"../alpha\" }\n",
    );

    let output = flotilla(temp.path(), &["ci"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cycle"));
}

#[test]
fn locate_prints_the_project_root() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_project(temp.path(), "libs/alpha", "alpha", "");

    let output = flotilla(temp.path(), &["locate", "alpha"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim_end().ends_with("libs/alpha"));
}

#[test]
fn presets_lists_the_builtin_names() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = flotilla(temp.path(), &["presets"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("default"));
    assert!(stdout.contains("ruff"));
}
