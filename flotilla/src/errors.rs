//! Error taxonomy for discovery, configuration, and reporting.
//!
//! Execution failures are deliberately absent: a runner subprocess that
//! crashes or exits unexpectedly is recorded as an [`crate::engine::ExecutionResult`]
//! with an `Error` status, never raised, so one failing tool cannot abort
//! unrelated work.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal problem while discovering projects. Nothing runs when this occurs.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest {path}: {detail}")]
    MalformedManifest { path: PathBuf, detail: String },

    #[error("duplicate project name `{name}` ({} and {})", first.display(), second.display())]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error(
        "project `{project}` declares a local dependency on {}, which is not a project in this repository",
        path.display()
    )]
    UnresolvedPathDependency { project: String, path: PathBuf },

    #[error("local dependency cycle: {}", cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },
}

/// Invalid merged configuration. Fatal for the affected project only; other
/// projects in the same run still proceed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("project `{project}` references unknown preset `{preset}`")]
    UnknownPreset { project: String, preset: String },

    #[error(
        "project `{project}`: `{scope}` sets both an inclusion and an exclusion list; keep only one"
    )]
    SelectorConflict { project: String, scope: String },

    #[error("project `{project}`: invalid configuration: {detail}")]
    InvalidShape { project: String, detail: String },
}

/// Invalid runner definition. Fatal for that runner on that project; other
/// runners and projects still proceed.
#[derive(Debug, Error)]
pub enum RunnerConfigError {
    #[error("custom runner `{runner}` does not declare check-args")]
    MissingCheckArgs { runner: String },

    #[error("`{runner}` cannot be redefined as a custom runner; configure it directly")]
    ReservedRunner { runner: String },

    #[error("custom runner `{runner}`: {detail}")]
    Invalid { runner: String, detail: String },
}

/// I/O failure while persisting a report. Fatal to the whole run: report
/// files are a contractual output.
#[derive(Debug, Error)]
#[error("cannot write report {}: {source}", path.display())]
pub struct ReportWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
