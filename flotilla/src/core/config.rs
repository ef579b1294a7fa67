//! Typed runner-configuration model and the layer resolver.
//!
//! The merged `[tool.flotilla]` document deserializes into a closed set of
//! known runner kinds, each with a typed option bag, plus a generic
//! custom-runner table. Unknown keys under a known runner are configuration
//! errors, not silently ignored.

use serde::Deserialize;
use toml::{Table, Value};

use crate::core::merge::{fold_layers, normalize_key};
use crate::core::presets;
use crate::errors::ConfigError;

/// A runner entry: `true`/`false` shorthand or a structured option bag.
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerSetting<T> {
    Toggle(bool),
    Options(T),
}

impl<T> Default for RunnerSetting<T> {
    fn default() -> Self {
        RunnerSetting::Toggle(false)
    }
}

impl<T: Default + Clone> RunnerSetting<T> {
    pub fn enabled(&self) -> bool {
        match self {
            RunnerSetting::Toggle(enabled) => *enabled,
            RunnerSetting::Options(_) => true,
        }
    }

    /// Option bag for an enabled runner; the shorthand form yields defaults.
    pub fn options(&self) -> T {
        match self {
            RunnerSetting::Toggle(_) => T::default(),
            RunnerSetting::Options(options) => options.clone(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for RunnerSetting<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // deserialize via Value so option-bag errors keep their message
        // instead of degrading into an untagged-enum mismatch
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Boolean(enabled) => Ok(RunnerSetting::Toggle(enabled)),
            other => T::deserialize(other)
                .map(RunnerSetting::Options)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Working directory a runner is invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkingDirectoryKind {
    #[default]
    Project,
    Repository,
}

/// Options for the type-check runner.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TypeCheckOptions {
    /// Config file handed to the tool, relative to the project root.
    pub set_config: Option<String>,
    /// Explicit target paths. Mutually exclusive with `exclude`.
    pub paths: Vec<String>,
    /// Patterns excluded from the default target set. Mutually exclusive
    /// with `paths`.
    pub exclude: Vec<String>,
    pub timeout_secs: Option<u64>,
}

/// Options for the test runner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TestOptions {
    /// Marker expression forwarded to the tool (`-m`).
    pub marker_expression: Option<String>,
    pub doctest_modules: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            marker_expression: None,
            doctest_modules: true,
            timeout_secs: None,
        }
    }
}

/// Options for the format-check runner.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FormatCheckOptions {
    /// Run the autofix invocation even when the check did not fail.
    pub force_fix: bool,
    pub timeout_secs: Option<u64>,
}

/// Options for runners with a fixed invocation (`manifest-check`,
/// `check-outdated`, `offline-build`). Only the timeout can be tuned.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FixedRunnerOptions {
    pub timeout_secs: Option<u64>,
}

/// Option bag for a custom runner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CustomRunnerOptions {
    /// Arguments of the check invocation. Required.
    pub check_args: Vec<String>,
    /// Arguments of the autofix invocation; absent means no autofix support.
    pub autofix_args: Option<Vec<String>>,
    /// Exit codes meaning "the check completed and found issues".
    pub check_failed_exit_codes: Vec<i32>,
    /// Emit the generic pass/fail report for this runner.
    pub create_generic_report: bool,
    pub working_directory: WorkingDirectoryKind,
    /// Invoke this executable directly instead of `<interpreter> -m <name>`.
    pub executable: Option<String>,
    /// Run the autofix invocation even when the check did not fail.
    pub force_fix: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for CustomRunnerOptions {
    fn default() -> Self {
        Self {
            check_args: Vec::new(),
            autofix_args: None,
            check_failed_exit_codes: vec![1],
            create_generic_report: true,
            working_directory: WorkingDirectoryKind::Project,
            executable: None,
            force_fix: false,
            timeout_secs: None,
        }
    }
}

/// Quick mode narrows the runner set via a pre-declared allow or deny list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuickConfig {
    /// Allow-list: only these runners take part in a quick run.
    pub check: Vec<String>,
    /// Deny-list: these runners are dropped from a quick run.
    pub skip: Vec<String>,
}

/// The `[tool.flotilla.ci]` section after folding all layers.
///
/// The runner set is closed: a key that is not a known runner is a
/// configuration error, not a silently ignored typo. New checks go under
/// `custom-runners`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CiConfig {
    /// Master switch: a disabled project contributes skipped rows only.
    pub disabled: bool,
    pub type_check: RunnerSetting<TypeCheckOptions>,
    pub test: RunnerSetting<TestOptions>,
    pub format_check: RunnerSetting<FormatCheckOptions>,
    pub manifest_check: RunnerSetting<FixedRunnerOptions>,
    pub check_outdated: RunnerSetting<FixedRunnerOptions>,
    pub offline_build: RunnerSetting<FixedRunnerOptions>,
    /// Raw custom-runner table; entries are built into runner specs one at a
    /// time so one bad runner fails alone.
    pub custom_runners: Table,
}

/// Fully merged, final configuration for one project.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EffectiveConfig {
    pub pydev: bool,
    pub presets: Vec<String>,
    pub quick: QuickConfig,
    pub ci: CiConfig,
}

impl EffectiveConfig {
    /// Resolve a project's effective configuration from its raw
    /// `[tool.flotilla]` document.
    ///
    /// Layer order, lowest to highest precedence: the implicit `default`
    /// preset, named presets in declared order, the project document itself.
    /// Resolution is pure: the same input always yields the same snapshot.
    pub fn resolve(project: &str, tool_config: &Table) -> Result<EffectiveConfig, ConfigError> {
        let preset_names = declared_presets(project, tool_config)?;

        let mut layers: Vec<Table> = vec![presets::default()];
        for name in &preset_names {
            let layer = presets::lookup(name).ok_or_else(|| ConfigError::UnknownPreset {
                project: project.to_string(),
                preset: name.clone(),
            })?;
            layers.push(layer);
        }
        layers.push(tool_config.clone());

        let folded = fold_layers(layers.iter());
        let config = EffectiveConfig::deserialize(Value::Table(folded)).map_err(|err| {
            ConfigError::InvalidShape {
                project: project.to_string(),
                detail: err.to_string(),
            }
        })?;

        config.validate(project)?;
        Ok(config)
    }

    /// Selector pairs must never be ambiguous, no matter which layer set them.
    fn validate(&self, project: &str) -> Result<(), ConfigError> {
        if !self.quick.check.is_empty() && !self.quick.skip.is_empty() {
            return Err(ConfigError::SelectorConflict {
                project: project.to_string(),
                scope: "quick".to_string(),
            });
        }
        if let RunnerSetting::Options(options) = &self.ci.type_check
            && !options.paths.is_empty()
            && !options.exclude.is_empty()
        {
            return Err(ConfigError::SelectorConflict {
                project: project.to_string(),
                scope: "type-check paths".to_string(),
            });
        }
        Ok(())
    }
}

/// The `presets` list is read from the project document alone: a preset
/// cannot pull in further presets.
fn declared_presets(project: &str, tool_config: &Table) -> Result<Vec<String>, ConfigError> {
    let Some((_, value)) = tool_config
        .iter()
        .find(|(key, _)| normalize_key(key) == "presets")
    else {
        return Ok(Vec::new());
    };

    let invalid = || ConfigError::InvalidShape {
        project: project.to_string(),
        detail: "`presets` must be a list of preset names".to_string(),
    };

    let entries = value.as_array().ok_or_else(invalid)?;
    entries
        .iter()
        .map(|entry| entry.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(text: &str) -> Table {
        toml::from_str(text).expect("valid toml")
    }

    #[test]
    fn empty_document_resolves_to_defaults() {
        let config = EffectiveConfig::resolve("proj", &Table::new()).expect("resolve");
        assert!(config.ci.type_check.enabled());
        assert!(config.ci.check_outdated.enabled());
        assert!(!config.ci.test.enabled());
        assert!(!config.pydev);
    }

    #[test]
    fn resolution_is_idempotent() {
        let document = tool("[ci]\ntest = true\nformat-check = true");
        let first = EffectiveConfig::resolve("proj", &document).expect("resolve");
        let second = EffectiveConfig::resolve("proj", &document).expect("resolve");
        assert_eq!(first, second);
    }

    #[test]
    fn project_layer_overrides_presets() {
        let document = tool("presets = [\"ruff\"]\n\n[ci]\ntype-check = false");
        let config = EffectiveConfig::resolve("proj", &document).expect("resolve");
        assert!(!config.ci.type_check.enabled());
        assert!(config.ci.custom_runners.contains_key("ruff-check"));
    }

    #[test]
    fn deep_merge_keeps_options_from_both_layers() {
        // ruff preset sets check-args for ruff-format; the project adds
        // force-fix for the same runner; both must survive
        let document = tool("presets = [\"ruff\"]\n\n[ci.custom-runners.ruff-format]\nforce-fix = true");
        let config = EffectiveConfig::resolve("proj", &document).expect("resolve");
        let entry = config.ci.custom_runners["ruff-format"].as_table().expect("table");
        assert!(entry.contains_key("check-args"));
        assert_eq!(entry.get("force-fix"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn unknown_preset_is_fatal() {
        let document = tool("presets = [\"does-not-exist\"]");
        let err = EffectiveConfig::resolve("proj", &document).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPreset { .. }));
    }

    #[test]
    fn quick_selector_conflict_is_fatal() {
        let document = tool("[quick]\ncheck = [\"test\"]\nskip = [\"type-check\"]");
        let err = EffectiveConfig::resolve("proj", &document).unwrap_err();
        assert!(matches!(err, ConfigError::SelectorConflict { .. }));
    }

    #[test]
    fn selector_conflict_across_layers_is_fatal() {
        // inclusion from one spelling, exclusion from another layer of the
        // same document; the merged result is what must be unambiguous
        let document = tool("[ci.type-check]\npaths = [\"src\"]\nexclude = [\"vendor\"]");
        let err = EffectiveConfig::resolve("proj", &document).unwrap_err();
        assert!(matches!(err, ConfigError::SelectorConflict { .. }));
    }

    #[test]
    fn unknown_key_under_known_runner_is_fatal() {
        let document = tool("[ci.type-check]\ntypo = true");
        let err = EffectiveConfig::resolve("proj", &document).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidShape { .. }));
    }

    #[test]
    fn underscore_spellings_reach_the_typed_model() {
        let document = tool("[ci]\nformat_check = true\ncheck_outdated = false");
        let config = EffectiveConfig::resolve("proj", &document).expect("resolve");
        assert!(config.ci.format_check.enabled());
        assert!(!config.ci.check_outdated.enabled());
    }

    #[test]
    fn option_bag_enables_runner() {
        let document = tool("[ci.test]\nmarker-expression = \"not slow\"");
        let config = EffectiveConfig::resolve("proj", &document).expect("resolve");
        assert!(config.ci.test.enabled());
        assert_eq!(
            config.ci.test.options().marker_expression.as_deref(),
            Some("not slow")
        );
    }
}
