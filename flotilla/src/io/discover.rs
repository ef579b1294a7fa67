//! Repository discovery: walk the tree, parse manifests, build the graph.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::core::graph::{ProjectDescriptor, ProjectGraph, ProjectKind};
use crate::core::manifest::{MANIFEST_FILE, Manifest};
use crate::errors::DiscoveryError;

/// Directories never descended into. Virtual environments and build output
/// regularly contain vendored manifests that are not projects of this
/// repository.
const IGNORED_DIRS: [&str; 6] = ["node_modules", "target", "dist", "build", "__pycache__", "venv"];

/// Discover every project under `root` and link their local dependencies.
///
/// A manifest nested inside another project's import-module folder is a
/// vendored copy and is skipped; any other malformation is fatal.
pub fn discover(root: &Path) -> Result<ProjectGraph, DiscoveryError> {
    let mut manifest_paths = Vec::new();
    walk(root, &mut manifest_paths)?;
    manifest_paths.sort();

    let mut parsed: Vec<(PathBuf, Manifest)> = Vec::new();
    for path in manifest_paths {
        let text = fs::read_to_string(&path).map_err(|source| DiscoveryError::Io {
            path: path.clone(),
            source,
        })?;
        match Manifest::parse(&text) {
            Ok(Some(manifest)) => {
                let project_root = path.parent().unwrap_or(root).to_path_buf();
                debug!(project = %manifest.name, root = %project_root.display(), "manifest found");
                parsed.push((project_root, manifest));
            }
            Ok(None) => debug!(path = %path.display(), "not a package manifest, skipping"),
            Err(detail) => {
                return Err(DiscoveryError::MalformedManifest { path, detail });
            }
        }
    }

    let nested = nested_module_roots(&parsed);
    let mut descriptors = Vec::new();
    for (project_root, manifest) in &parsed {
        if nested.contains(project_root) {
            debug!(
                project = %manifest.name,
                root = %project_root.display(),
                "nested inside another project's module tree, skipping"
            );
            continue;
        }
        descriptors.push(descriptor(project_root, manifest, &parsed)?);
    }

    ProjectGraph::new(descriptors)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), DiscoveryError> {
    let entries = fs::read_dir(dir).map_err(|source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if path.is_dir() {
            if name.starts_with('.') || IGNORED_DIRS.contains(&name.as_ref()) {
                continue;
            }
            walk(&path, found)?;
        } else if name == MANIFEST_FILE {
            found.push(path);
        }
    }
    Ok(())
}

/// Roots of manifests that sit inside another project's import-module folder.
fn nested_module_roots(parsed: &[(PathBuf, Manifest)]) -> Vec<PathBuf> {
    let mut nested = Vec::new();
    for (candidate_root, _) in parsed {
        for (other_root, other_manifest) in parsed {
            if candidate_root == other_root {
                continue;
            }
            let module_tree = other_root.join(other_manifest.module_name());
            if candidate_root.starts_with(&module_tree) {
                nested.push(candidate_root.clone());
                break;
            }
        }
    }
    nested
}

fn descriptor(
    project_root: &Path,
    manifest: &Manifest,
    parsed: &[(PathBuf, Manifest)],
) -> Result<ProjectDescriptor, DiscoveryError> {
    let mut local_dependencies = Vec::new();
    for dependency in manifest.local_dependencies() {
        let declared = dependency.local_path().unwrap_or_default();
        let target = normalize_path(&project_root.join(declared));
        match parsed
            .iter()
            .find(|(root, _)| normalize_path(root) == target)
        {
            Some((_, target_manifest)) => local_dependencies.push(target_manifest.name.clone()),
            None => {
                return Err(DiscoveryError::UnresolvedPathDependency {
                    project: manifest.name.clone(),
                    path: PathBuf::from(declared),
                });
            }
        }
    }

    let kind = if manifest.is_aggregator() {
        ProjectKind::Aggregator
    } else {
        ProjectKind::Standalone
    };

    Ok(ProjectDescriptor {
        name: manifest.name.clone(),
        root: project_root.to_path_buf(),
        module: manifest.module_name(),
        kind,
        manifest: manifest.clone(),
        local_dependencies,
    })
}

/// Absolute, lexically normalized form of a path, anchored at the current
/// directory when relative.
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        normalize_path(&base.join(path))
    }
}

/// Lexical path normalization: resolves `.` and `..` components without
/// touching the filesystem, so unrelated roots compare reliably.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(Component::ParentDir);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Relative path from one directory to another, both already normalized.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();

    let shared = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in shared..from.len() {
        relative.push("..");
    }
    for component in &to[shared..] {
        relative.push(component.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}
