//! Discovery and whole-run properties exercised through the library API.

use std::fs;
use std::path::Path;

use flotilla::ci::{CiOptions, run_ci};
use flotilla::core::classify::RunnerStatus;
use flotilla::io::discover::discover;
use flotilla::io::process::CancelToken;

fn write_project(repo: &Path, dir: &str, name: &str, extra: &str) {
    let root = repo.join(dir);
    fs::create_dir_all(&root).expect("mkdir");
    fs::write(
        root.join("pyproject.toml"),
        format!("[tool.poetry]\nname = \"{name}\"\n{extra}"),
    )
    .expect("write manifest");
}

#[test]
fn discovery_finds_every_project_with_unique_names() {
    let temp = tempfile::tempdir().expect("tempdir");
    for (dir, name) in [
        ("libs/one", "one"),
        ("libs/two", "two"),
        ("tools/three", "three"),
        ("four", "four"),
    ] {
        write_project(temp.path(), dir, name, "");
    }

    let graph = discover(temp.path()).expect("discover");
    assert_eq!(graph.len(), 4);

    let mut names: Vec<&str> = graph.iter().map(|p| p.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 4);
}

#[test]
fn dependency_cycle_yields_zero_descriptors() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_project(
        temp.path(),
        "a",
        "a",
        "[tool.poetry.dependencies]\nb = { path = \"../b\" }\n",
    );
    write_project(
        temp.path(),
        "b",
        "b",
        "[tool.poetry.dependencies]\nc = { path = \"../c\" }\n",
    );
    write_project(
        temp.path(),
        "c",
        "c",
        "[tool.poetry.dependencies]\na = { path = \"../a\" }\n",
    );

    assert!(discover(temp.path()).is_err());
}

/// The canonical whole-repository scenario: `a` has no local dependencies,
/// `b` depends on `../a`, both enable type-check and disable test. A run
/// restricted to type-check executes exactly one pair per project and leaves
/// exactly one report entry per pair, whatever the type checker's own
/// verdict on this machine is.
#[cfg(unix)]
#[test]
fn type_check_run_executes_one_pair_per_project() {
    let temp = tempfile::tempdir().expect("tempdir");
    let ci = "[tool.flotilla.ci]\ntype-check = true\ntest = false\n";
    write_project(temp.path(), "a", "a", ci);
    write_project(
        temp.path(),
        "b",
        "b",
        &format!("[tool.poetry.dependencies]\na = {{ path = \"../a\" }}\n\n{ci}"),
    );

    let options = CiOptions {
        checks: vec!["type-check".to_string()],
        ..CiOptions::default()
    };
    let report = run_ci(temp.path(), &options, &CancelToken::new()).expect("run");

    let executed: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.runner == "type-check" && r.status != RunnerStatus::Skipped)
        .collect();
    assert_eq!(executed.len(), 2);

    assert!(temp.path().join("a/.ci/ci.type-check.a.xml").is_file());
    assert!(temp.path().join("b/.ci/ci.type-check.b.xml").is_file());

    // narrowing the query to one project halves the run
    let options = CiOptions {
        query: Some("a".to_string()),
        exact: true,
        checks: vec!["type-check".to_string()],
        ..CiOptions::default()
    };
    let report = run_ci(temp.path(), &options, &CancelToken::new()).expect("run");
    let executed: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.runner == "type-check" && r.status != RunnerStatus::Skipped)
        .collect();
    assert_eq!(executed.len(), 1);
}

#[test]
fn aggregator_projects_never_execute_runners() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_project(temp.path(), "alpha", "alpha", "");
    write_project(
        temp.path(),
        "dev",
        "dev-env",
        "[tool.poetry.dependencies]\nalpha = { path = \"../alpha\" }\n\n[tool.flotilla]\npydev = true\n",
    );

    let options = CiOptions {
        query: Some("dev-env".to_string()),
        exact: true,
        ..CiOptions::default()
    };
    let report = run_ci(temp.path(), &options, &CancelToken::new()).expect("run");
    assert!(report.results.is_empty());
    assert!(report.success);
}
