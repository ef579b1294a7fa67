//! Built-in configuration presets.
//!
//! A preset is a named, reusable partial configuration layer applied below
//! project-local overrides. The `default` preset is always folded in first
//! and defines the baseline runner set.

use toml::{Table, Value};

/// Names of the built-in presets, in listing order.
pub const PRESET_NAMES: [&str; 3] = ["default", "clean-imports", "ruff"];

/// The implicit baseline layer every resolution starts from.
pub fn default() -> Table {
    let mut ci = Table::new();
    set(&mut ci, "disabled", Value::Boolean(false));
    set(&mut ci, "type-check", Value::Boolean(true));
    set(&mut ci, "manifest-check", Value::Boolean(true));
    set(&mut ci, "check-outdated", Value::Boolean(true));
    set(&mut ci, "test", Value::Boolean(false));
    set(&mut ci, "format-check", Value::Boolean(false));
    set(&mut ci, "custom-runners", Value::Table(Table::new()));
    set(&mut ci, "offline-build", Value::Boolean(false));

    let mut layer = Table::new();
    set(&mut layer, "pydev", Value::Boolean(false));
    set(&mut layer, "presets", Value::Array(Vec::new()));
    set(&mut layer, "quick", Value::Table(Table::new()));
    set(&mut layer, "ci", Value::Table(ci));
    layer
}

/// isort and autoflake work together to sort and clean imports.
fn clean_imports() -> Table {
    let autoflake_defaults = [
        "--recursive",
        "--remove-all-unused-imports",
        "--remove-unused-variables",
    ];

    let mut isort = Table::new();
    set(&mut isort, "check-args", strings(&["--check", ".", "--profile=black"]));
    set(&mut isort, "autofix-args", strings(&[".", "--profile=black"]));

    let mut autoflake_check = vec!["--check", "."];
    autoflake_check.extend(autoflake_defaults);
    let mut autoflake_fix = vec!["--in-place", "."];
    autoflake_fix.extend(autoflake_defaults);

    let mut autoflake = Table::new();
    set(&mut autoflake, "check-args", strings(&autoflake_check));
    set(&mut autoflake, "autofix-args", strings(&autoflake_fix));

    let mut runners = Table::new();
    set(&mut runners, "isort", Value::Table(isort));
    set(&mut runners, "autoflake", Value::Table(autoflake));
    custom_runner_layer(runners)
}

/// Ruff replaces the separate format checker with its own runners.
fn ruff() -> Table {
    let check = ruff_runner(&["check", "."], None);
    let format = ruff_runner(&["format", "--check", "."], Some(&["format", "."]));
    let isort = ruff_runner(
        &["check", "--select", "I"],
        Some(&["check", "--select", "I", "--fix"]),
    );

    let mut runners = Table::new();
    set(&mut runners, "ruff-check", Value::Table(check));
    set(&mut runners, "ruff-format", Value::Table(format));
    set(&mut runners, "ruff-isort", Value::Table(isort));

    let mut layer = custom_runner_layer(runners);
    if let Some(ci) = layer.get_mut("ci").and_then(Value::as_table_mut) {
        set(ci, "format-check", Value::Boolean(false));
    }
    layer
}

/// Look up a preset layer by name. `-` and `_` spellings are equivalent.
pub fn lookup(name: &str) -> Option<Table> {
    match name.replace('_', "-").as_str() {
        "default" => Some(default()),
        "clean-imports" => Some(clean_imports()),
        "ruff" => Some(ruff()),
        _ => None,
    }
}

fn set(table: &mut Table, key: &str, value: Value) {
    table.insert(key.to_string(), value);
}

fn strings(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|item| Value::String(item.to_string())).collect())
}

fn ruff_runner(check_args: &[&str], autofix_args: Option<&[&str]>) -> Table {
    let mut runner = Table::new();
    set(&mut runner, "executable", Value::String("ruff".to_string()));
    set(&mut runner, "check-args", strings(check_args));
    if let Some(args) = autofix_args {
        set(&mut runner, "autofix-args", strings(args));
    }
    runner
}

fn custom_runner_layer(runners: Table) -> Table {
    let mut ci = Table::new();
    set(&mut ci, "custom-runners", Value::Table(runners));
    let mut layer = Table::new();
    set(&mut layer, "ci", Value::Table(ci));
    layer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_preset_resolves() {
        for name in PRESET_NAMES {
            assert!(lookup(name).is_some(), "missing preset {name}");
        }
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(lookup("no-such-preset").is_none());
    }

    #[test]
    fn underscore_spelling_resolves() {
        assert!(lookup("clean_imports").is_some());
    }

    #[test]
    fn default_enables_the_baseline_runners() {
        let layer = default();
        let ci = layer["ci"].as_table().expect("ci table");
        assert_eq!(ci["type-check"].as_bool(), Some(true));
        assert_eq!(ci["test"].as_bool(), Some(false));
    }

    #[test]
    fn ruff_preset_declares_autofix_capable_runners() {
        let layer = ruff();
        let runners = layer["ci"]["custom-runners"].as_table().expect("runners");
        let format = runners["ruff-format"].as_table().expect("ruff-format");
        assert!(format.contains_key("autofix-args"));
        let check = runners["ruff-check"].as_table().expect("ruff-check");
        assert!(!check.contains_key("autofix-args"));
    }
}
