//! Multi-project build/CI orchestrator CLI.
//!
//! Discovers projects under a repository root and runs the configured
//! verification runners against each, reporting one outcome per
//! (project, runner) pair. The process exit code is the sole pass/fail
//! signal for automation.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use flotilla::ci::{CiOptions, run_ci};
use flotilla::core::presets::PRESET_NAMES;
use flotilla::io::process::CancelToken;
use flotilla::{aggregate, exit_codes, locate, logging, summary};

#[derive(Parser)]
#[command(
    name = "flotilla",
    version,
    about = "Multi-project build/CI orchestrator"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the configured checks for every selected project.
    Ci {
        /// Project selection: name substring, exact name with --exact, or a path.
        query: Option<String>,
        /// Match the query as an exact project name.
        #[arg(long, requires = "query")]
        exact: bool,
        /// Only run these checks (repeatable). --skip still wins.
        #[arg(long = "check", value_name = "RUNNER")]
        checks: Vec<String>,
        /// Never run these checks (repeatable).
        #[arg(long = "skip", value_name = "RUNNER")]
        skips: Vec<String>,
        /// Issue autofix invocations for failed checks.
        #[arg(long)]
        fix: bool,
        /// Narrow the runner set with each project's quick list.
        #[arg(long)]
        quick: bool,
        /// Run projects one at a time.
        #[arg(long)]
        sequential: bool,
        /// Repository root to discover projects under.
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },
    /// Print the root directory of the exactly-named project.
    Locate {
        name: String,
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },
    /// Recompute aggregator projects' dev requirements from their local dependencies.
    PullDevRequirements {
        /// Aggregator selection; all aggregators when omitted.
        query: Option<String>,
        /// Compute and report, but do not rewrite manifests.
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },
    /// List the built-in presets.
    Presets,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Ci {
            query,
            exact,
            checks,
            skips,
            fix,
            quick,
            sequential,
            path,
        } => {
            let options = CiOptions {
                query,
                exact,
                checks,
                skips,
                fix,
                quick,
                sequential,
            };
            cmd_ci(&path, &options)
        }
        Command::Locate { name, path } => {
            let root = locate::locate(&path, &name)?;
            println!("{}", root.display());
            Ok(exit_codes::OK)
        }
        Command::PullDevRequirements {
            query,
            dry_run,
            path,
        } => cmd_pull_dev_requirements(&path, query.as_deref(), dry_run),
        Command::Presets => {
            for name in PRESET_NAMES {
                println!("{name}");
            }
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_ci(path: &Path, options: &CiOptions) -> Result<i32> {
    let cancel = CancelToken::new();
    let report = run_ci(path, options, &cancel)?;

    if report.results.is_empty() {
        println!("No project matches the selection; nothing to do.");
        return Ok(exit_codes::OK);
    }

    let details = summary::failure_details(&report.results);
    if !details.is_empty() {
        println!("{details}");
        println!();
    }
    println!("{}", summary::summary_table(&report.results));

    if report.success {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::FAILED)
    }
}

fn cmd_pull_dev_requirements(path: &Path, query: Option<&str>, dry_run: bool) -> Result<i32> {
    let pulled = aggregate::pull_dev_requirements(path, query, dry_run)?;
    for entry in pulled {
        let action = match (dry_run, entry.changed) {
            (true, true) => "would update",
            (false, true) => "updated",
            (_, false) => "up to date",
        };
        println!("{}: {action} ({} dev requirements)", entry.project, entry.requirements.len());
    }
    Ok(exit_codes::OK)
}
