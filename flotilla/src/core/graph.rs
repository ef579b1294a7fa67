//! Project graph: descriptors, local-dependency edges, and selection.
//!
//! The graph is constructed once at discovery time and never mutated. Edges
//! follow relative `path` dependency declarations between projects of the
//! same repository; the relation must be acyclic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::manifest::Manifest;
use crate::errors::DiscoveryError;

/// Kind of a discovered project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Standalone,
    /// Bundles other local projects for development convenience; excluded
    /// from every runner.
    Aggregator,
}

/// Normalized representation of one independently-buildable project.
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
    /// Unique package name.
    pub name: String,
    /// Directory containing the manifest.
    pub root: PathBuf,
    /// Import/module name (`-` mapped to `_`).
    pub module: String,
    pub kind: ProjectKind,
    pub manifest: Manifest,
    /// Names of sibling projects this one depends on via relative paths,
    /// in a stable order.
    pub local_dependencies: Vec<String>,
}

impl ProjectDescriptor {
    pub fn is_aggregator(&self) -> bool {
        self.kind == ProjectKind::Aggregator
    }
}

/// Mapping from project name to descriptor plus the dependency adjacency.
#[derive(Debug)]
pub struct ProjectGraph {
    projects: Vec<ProjectDescriptor>,
    index: BTreeMap<String, usize>,
}

impl ProjectGraph {
    /// Build the graph, enforcing its invariants: unique names, edges that
    /// reference existing descriptors, and an acyclic dependency relation.
    pub fn new(projects: Vec<ProjectDescriptor>) -> Result<ProjectGraph, DiscoveryError> {
        let mut index = BTreeMap::new();
        for (position, project) in projects.iter().enumerate() {
            if let Some(&first) = index.get(&project.name) {
                let first: &ProjectDescriptor = &projects[first];
                return Err(DiscoveryError::DuplicateName {
                    name: project.name.clone(),
                    first: first.root.clone(),
                    second: project.root.clone(),
                });
            }
            index.insert(project.name.clone(), position);
        }

        let graph = ProjectGraph { projects, index };
        graph.check_edges()?;
        graph.check_acyclic()?;
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ProjectDescriptor> {
        self.index.get(name).map(|&position| &self.projects[position])
    }

    /// Iterate descriptors in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectDescriptor> {
        self.projects.iter()
    }

    /// Local dependencies of a project.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.get(name)
            .map(|project| project.local_dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Select projects by query.
    ///
    /// Without a query every project matches. A name query matches
    /// case-insensitively on a substring of the normalized name (`-` and `_`
    /// are equivalent); with `exact`, normalized equality is required. A
    /// query that looks like a filesystem path instead selects the single
    /// project whose root is that path, ignoring nested projects under it.
    pub fn select(&self, query: Option<&str>, exact: bool) -> Vec<&ProjectDescriptor> {
        let Some(query) = query else {
            return self.iter().collect();
        };

        if query_is_path(query) {
            let target = Path::new(query);
            return self
                .iter()
                .filter(|project| project.root == target)
                .collect();
        }

        let needle = normalize_name(query);
        self.iter()
            .filter(|project| {
                let name = normalize_name(&project.name);
                if exact {
                    name == needle
                } else {
                    name.contains(&needle)
                }
            })
            .collect()
    }

    fn check_edges(&self) -> Result<(), DiscoveryError> {
        for project in &self.projects {
            for dependency in &project.local_dependencies {
                if !self.index.contains_key(dependency) {
                    return Err(DiscoveryError::UnresolvedPathDependency {
                        project: project.name.clone(),
                        path: PathBuf::from(dependency),
                    });
                }
            }
        }
        Ok(())
    }

    /// Depth-first search with three colors; reports the offending cycle.
    fn check_acyclic(&self) -> Result<(), DiscoveryError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit(
            graph: &ProjectGraph,
            name: &str,
            marks: &mut BTreeMap<String, Mark>,
            trail: &mut Vec<String>,
        ) -> Result<(), DiscoveryError> {
            match marks.get(name).copied().unwrap_or(Mark::Unvisited) {
                Mark::Done => return Ok(()),
                Mark::InProgress => {
                    let start = trail.iter().position(|entry| entry == name).unwrap_or(0);
                    let mut cycle: Vec<String> = trail[start..].to_vec();
                    cycle.push(name.to_string());
                    return Err(DiscoveryError::DependencyCycle { cycle });
                }
                Mark::Unvisited => {}
            }

            marks.insert(name.to_string(), Mark::InProgress);
            trail.push(name.to_string());
            for dependency in graph.dependencies_of(name) {
                visit(graph, dependency, marks, trail)?;
            }
            trail.pop();
            marks.insert(name.to_string(), Mark::Done);
            Ok(())
        }

        let mut marks = BTreeMap::new();
        let mut trail = Vec::new();
        for project in &self.projects {
            visit(self, &project.name, &mut marks, &mut trail)?;
        }
        Ok(())
    }
}

/// `-` and `_` are equivalent in queries and names; matching ignores case.
pub fn normalize_name(name: &str) -> String {
    name.replace('-', "_").to_lowercase()
}

/// Queries carrying a path separator (or a leading `.`) address a project by
/// its root directory rather than by name.
pub fn query_is_path(query: &str) -> bool {
    query.contains('/') || query.contains(std::path::MAIN_SEPARATOR) || query.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::module_name;

    fn descriptor(name: &str, root: &str, deps: &[&str]) -> ProjectDescriptor {
        let manifest = Manifest::parse(&format!("[tool.poetry]\nname = \"{name}\"\n"))
            .expect("parse")
            .expect("manifest");
        ProjectDescriptor {
            name: name.to_string(),
            root: PathBuf::from(root),
            module: module_name(name),
            kind: ProjectKind::Standalone,
            manifest,
            local_dependencies: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn graph_holds_all_descriptors_without_duplicates() {
        let graph = ProjectGraph::new(vec![
            descriptor("alpha", "/repo/alpha", &[]),
            descriptor("beta", "/repo/beta", &["alpha"]),
            descriptor("gamma", "/repo/tools/gamma", &["alpha", "beta"]),
        ])
        .expect("graph");
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.dependencies_of("gamma"), ["alpha", "beta"]);
    }

    #[test]
    fn duplicate_names_are_a_discovery_error() {
        let err = ProjectGraph::new(vec![
            descriptor("alpha", "/repo/alpha", &[]),
            descriptor("alpha", "/repo/vendored/alpha", &[]),
        ])
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::DuplicateName { .. }));
    }

    #[test]
    fn two_project_cycle_is_a_discovery_error() {
        let err = ProjectGraph::new(vec![
            descriptor("alpha", "/repo/alpha", &["beta"]),
            descriptor("beta", "/repo/beta", &["alpha"]),
        ])
        .unwrap_err();
        let DiscoveryError::DependencyCycle { cycle } = err else {
            panic!("expected cycle error");
        };
        assert_eq!(cycle.first(), cycle.last());
        assert!(cycle.len() >= 3);
    }

    #[test]
    fn longer_cycle_is_detected() {
        let err = ProjectGraph::new(vec![
            descriptor("a", "/r/a", &["b"]),
            descriptor("b", "/r/b", &["c"]),
            descriptor("c", "/r/c", &["a"]),
        ])
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::DependencyCycle { .. }));
    }

    #[test]
    fn unresolved_edge_is_a_discovery_error() {
        let err = ProjectGraph::new(vec![descriptor("alpha", "/repo/alpha", &["ghost"])])
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::UnresolvedPathDependency { .. }));
    }

    #[test]
    fn substring_selection_is_case_insensitive_and_separator_blind() {
        let graph = ProjectGraph::new(vec![
            descriptor("coveo-functools", "/repo/functools", &[]),
            descriptor("coveo-testing", "/repo/testing", &[]),
            descriptor("unrelated", "/repo/unrelated", &[]),
        ])
        .expect("graph");

        let matched = graph.select(Some("Coveo_Func"), false);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "coveo-functools");
    }

    #[test]
    fn exact_selection_requires_full_name() {
        let graph = ProjectGraph::new(vec![
            descriptor("pkg", "/repo/pkg", &[]),
            descriptor("pkg-extra", "/repo/pkg-extra", &[]),
        ])
        .expect("graph");

        assert_eq!(graph.select(Some("pkg"), false).len(), 2);
        let exact = graph.select(Some("pkg"), true);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].name, "pkg");
    }

    #[test]
    fn path_query_selects_by_root_only() {
        let graph = ProjectGraph::new(vec![
            descriptor("outer", "/repo/outer", &[]),
            descriptor("inner", "/repo/outer/plugins/inner", &[]),
        ])
        .expect("graph");

        let matched = graph.select(Some("/repo/outer"), false);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "outer");
    }

    #[test]
    fn empty_selection_is_not_an_error() {
        let graph = ProjectGraph::new(vec![descriptor("alpha", "/repo/alpha", &[])])
            .expect("graph");
        assert!(graph.select(Some("zeta"), false).is_empty());
    }
}
