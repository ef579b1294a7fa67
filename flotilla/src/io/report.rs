//! Structured report files.
//!
//! Each executed, reporting-enabled (project, runner) pair yields one
//! JUnit-compatible XML file under the project's `.ci` directory, plus a
//! plain-text capture of the tool output for non-success outcomes. Reports
//! are built fully in memory and written atomically (temp file + rename):
//! a cancelled or crashed run never leaves a half-written report behind.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::classify::RunnerStatus;
use crate::errors::ReportWriteError;

/// Directory under a project root that collects its report files.
pub const REPORT_DIR: &str = ".ci";

/// Report path for one (project, runner) pair,
/// e.g. `.ci/ci.type-check.coveo-functools.xml`.
pub fn report_path(project_root: &Path, runner: &str, project: &str) -> PathBuf {
    project_root
        .join(REPORT_DIR)
        .join(format!("ci.{runner}.{project}.xml"))
}

/// Plain-text capture path alongside the XML report.
pub fn capture_path(project_root: &Path, runner: &str, project: &str) -> PathBuf {
    project_root
        .join(REPORT_DIR)
        .join(format!("ci.{runner}.{project}.log"))
}

/// Write the generic pass/fail record for a completed pair.
pub fn write_generic_report(
    path: &Path,
    project: &str,
    runner: &str,
    status: RunnerStatus,
    output: &str,
) -> Result<(), ReportWriteError> {
    let document = junit_document(project, runner, status, output);
    write_atomic(path, &document)
}

/// Write the tool output capture (stdout then stderr, as captured).
pub fn write_capture(path: &Path, output: &str) -> Result<(), ReportWriteError> {
    write_atomic(path, output)
}

fn junit_document(project: &str, runner: &str, status: RunnerStatus, output: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S");
    let failures = u8::from(status == RunnerStatus::CheckFailed);
    let errors = u8::from(status == RunnerStatus::Error);

    let mut document = String::new();
    document.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    document.push_str("<testsuites>\n");
    document.push_str(&format!(
        "  <testsuite name=\"{}\" tests=\"1\" failures=\"{failures}\" errors=\"{errors}\" timestamp=\"{timestamp}\">\n",
        escape(project),
    ));
    document.push_str(&format!(
        "    <testcase name=\"{}\" classname=\"ci.{}\">\n",
        escape(runner),
        escape(project),
    ));
    match status {
        RunnerStatus::CheckFailed => {
            document.push_str(&format!(
                "      <failure message=\"The check completed; issues were found.\">{}</failure>\n",
                escape(output),
            ));
        }
        RunnerStatus::Error => {
            document.push_str(&format!(
                "      <error message=\"An error occurred; the check was unable to complete.\">{}</error>\n",
                escape(output),
            ));
        }
        RunnerStatus::Skipped => {
            document.push_str("      <skipped/>\n");
        }
        RunnerStatus::Success => {}
    }
    document.push_str("    </testcase>\n");
    document.push_str("  </testsuite>\n");
    document.push_str("</testsuites>\n");
    document
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), ReportWriteError> {
    let failed = |source| ReportWriteError {
        path: path.to_path_buf(),
        source,
    };

    let parent = path.parent().ok_or_else(|| {
        failed(std::io::Error::other("report path has no parent directory"))
    })?;
    fs::create_dir_all(parent).map_err(failed)?;

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    fs::write(&tmp_path, contents).map_err(failed)?;
    fs::rename(&tmp_path, path).map_err(failed)?;
    debug!(path = %path.display(), "report written");
    Ok(())
}
