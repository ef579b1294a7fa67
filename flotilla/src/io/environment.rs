//! Interpreter lookup and command building for verification tools.
//!
//! Tools are invoked as `<interpreter> -m <module>` so they resolve imports
//! against the project environment, with a bare-executable escape hatch for
//! tools that are not importable modules.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::registry::{CommandSpec, Program};

/// Resolved interpreter for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonEnvironment {
    python: PathBuf,
}

impl PythonEnvironment {
    /// Use the project-local virtual environment when present, otherwise the
    /// interpreter found on `PATH`. Environment creation itself is someone
    /// else's job; a missing interpreter surfaces as a spawn failure at
    /// execution time.
    pub fn for_project(project_root: &Path) -> PythonEnvironment {
        let candidates = [
            project_root.join(".venv").join("bin").join("python"),
            project_root.join(".venv").join("Scripts").join("python.exe"),
        ];
        let python = candidates
            .into_iter()
            .find(|candidate| candidate.is_file())
            .unwrap_or_else(|| PathBuf::from("python3"));
        PythonEnvironment { python }
    }

    #[cfg(test)]
    pub fn with_interpreter(python: PathBuf) -> PythonEnvironment {
        PythonEnvironment { python }
    }

    /// Interpreter path, for `{python}` substitution.
    pub fn python(&self) -> &Path {
        &self.python
    }

    /// Build the concrete command for one command spec. `args` are the
    /// already-substituted arguments.
    pub fn command(&self, spec: &CommandSpec, args: &[String]) -> Command {
        match &spec.program {
            Program::Module(module) => {
                let mut command = Command::new(&self.python);
                command.arg("-m").arg(module).args(args);
                command
            }
            Program::Executable(executable) => {
                let mut command = Command::new(executable);
                command.args(args);
                command
            }
        }
    }
}
