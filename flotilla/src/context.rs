//! Explicit run context: the project graph plus per-project configuration
//! snapshots.
//!
//! Constructed once at startup and passed by reference into planning,
//! execution, and reporting; there is no ambient/global lookup. Effective
//! configurations resolve lazily on first use and are frozen afterwards.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::core::config::EffectiveConfig;
use crate::core::graph::ProjectGraph;
use crate::errors::ConfigError;

pub struct RunContext {
    pub repo_root: PathBuf,
    pub graph: ProjectGraph,
    configs: BTreeMap<String, Result<EffectiveConfig, ConfigError>>,
}

impl RunContext {
    pub fn new(repo_root: PathBuf, graph: ProjectGraph) -> RunContext {
        RunContext {
            repo_root,
            graph,
            configs: BTreeMap::new(),
        }
    }

    /// The frozen effective configuration for a project, resolving it on
    /// first use. Resolution failures are memoized too: a broken project
    /// reports once and stays broken for the whole run.
    pub fn effective_config(&mut self, name: &str) -> &Result<EffectiveConfig, ConfigError> {
        if !self.configs.contains_key(name) {
            let resolved = match self.graph.get(name) {
                Some(project) => {
                    debug!(project = %name, "resolving effective configuration");
                    EffectiveConfig::resolve(&project.name, &project.manifest.tool_config)
                }
                None => Err(ConfigError::InvalidShape {
                    project: name.to_string(),
                    detail: "project is not part of this repository".to_string(),
                }),
            };
            self.configs.insert(name.to_string(), resolved);
        }
        &self.configs[name]
    }
}
