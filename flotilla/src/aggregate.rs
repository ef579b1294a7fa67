//! Dev-requirement aggregation for aggregator projects.
//!
//! An aggregator project links most or all of the repository's projects for
//! developer convenience. Its own dev-dependency group is derived: the union
//! of its local dependencies' development-only dependencies, excluding
//! anything the aggregator already depends on directly. `pull-dev-requirements`
//! recomputes that union and rewrites the aggregator's manifest.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use toml::{Table, Value};
use tracing::info;

use crate::core::graph::{ProjectDescriptor, ProjectGraph};
use crate::io::discover::{absolute, discover, normalize_path, relative_path};

/// Outcome of recomputing one aggregator's dev group.
#[derive(Debug)]
pub struct PulledRequirements {
    pub project: String,
    /// Name-sorted dev group: dependency name to its specification value.
    pub requirements: Vec<(String, Value)>,
    /// Whether the manifest on disk was (or would be) modified.
    pub changed: bool,
}

/// Recompute dev requirements for every matching aggregator project.
///
/// With `dry_run`, the union is computed and reported but nothing is written.
pub fn pull_dev_requirements(
    root: &Path,
    query: Option<&str>,
    dry_run: bool,
) -> Result<Vec<PulledRequirements>> {
    let repo_root = absolute(root);
    let graph = discover(&repo_root)?;

    let aggregators: Vec<&ProjectDescriptor> = graph
        .select(query, false)
        .into_iter()
        .filter(|project| project.is_aggregator())
        .collect();

    if aggregators.is_empty() {
        match query {
            Some(query) => bail!("no aggregator project matches `{query}`"),
            None => bail!("this repository has no aggregator project"),
        }
    }

    let mut pulled = Vec::new();
    for aggregator in aggregators {
        let requirements = dev_requirements_union(&graph, aggregator);
        let changed = if dry_run {
            manifest_needs_update(aggregator, &requirements)?
        } else {
            rewrite_manifest(aggregator, &requirements)?
        };
        info!(
            project = %aggregator.name,
            requirements = requirements.len(),
            changed,
            "dev requirements pulled"
        );
        pulled.push(PulledRequirements {
            project: aggregator.name.clone(),
            requirements,
            changed,
        });
    }
    Ok(pulled)
}

/// Union of the dev-only dependencies of the aggregator's local dependencies.
///
/// Direct dependencies of the aggregator are never duplicated into the dev
/// group. Local dev dependencies are re-anchored so their relative path is
/// valid from the aggregator's root.
pub fn dev_requirements_union(
    graph: &ProjectGraph,
    aggregator: &ProjectDescriptor,
) -> Vec<(String, Value)> {
    let mut seen: BTreeSet<String> = aggregator
        .manifest
        .dependencies
        .iter()
        .map(|dep| dep.name.clone())
        .collect();

    let mut requirements = Vec::new();
    for dependency_name in &aggregator.local_dependencies {
        let Some(dependency) = graph.get(dependency_name) else {
            continue;
        };
        for dev_dep in &dependency.manifest.dev_dependencies {
            if !seen.insert(dev_dep.name.clone()) {
                continue;
            }
            let value = match dev_dep.local_path() {
                Some(path) => {
                    let target = normalize_path(&dependency.root.join(path));
                    let rebased = relative_path(&aggregator.root, &target);
                    let mut table = Table::new();
                    table.insert(
                        "path".to_string(),
                        Value::String(rebased.display().to_string()),
                    );
                    Value::Table(table)
                }
                None => dev_dep.spec.clone(),
            };
            requirements.push((dev_dep.name.clone(), value));
        }
    }

    requirements.sort_by(|(a, _), (b, _)| a.cmp(b));
    requirements
}

fn dev_group_table(requirements: &[(String, Value)]) -> Table {
    let mut table = Table::new();
    for (name, value) in requirements {
        table.insert(name.clone(), value.clone());
    }
    table
}

fn manifest_needs_update(
    aggregator: &ProjectDescriptor,
    requirements: &[(String, Value)],
) -> Result<bool> {
    let (document, updated) = updated_document(aggregator, requirements)?;
    Ok(document != updated)
}

fn rewrite_manifest(
    aggregator: &ProjectDescriptor,
    requirements: &[(String, Value)],
) -> Result<bool> {
    let (document, updated) = updated_document(aggregator, requirements)?;
    if document == updated {
        return Ok(false);
    }

    let manifest_path = aggregator.root.join(crate::core::manifest::MANIFEST_FILE);
    let mut contents =
        toml::to_string_pretty(&Value::Table(updated)).context("serialize manifest")?;
    contents.push('\n');

    let tmp_path = manifest_path.with_extension("toml.tmp");
    fs::write(&tmp_path, &contents)
        .with_context(|| format!("write temp manifest {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &manifest_path)
        .with_context(|| format!("replace manifest {}", manifest_path.display()))?;
    Ok(true)
}

/// Current document plus the document with the derived dev group in place.
fn updated_document(
    aggregator: &ProjectDescriptor,
    requirements: &[(String, Value)],
) -> Result<(Table, Table)> {
    let manifest_path = aggregator.root.join(crate::core::manifest::MANIFEST_FILE);
    let text = fs::read_to_string(&manifest_path)
        .with_context(|| format!("read {}", manifest_path.display()))?;
    let document: Table = toml::from_str(&text)
        .with_context(|| format!("parse {}", manifest_path.display()))?;

    let mut updated = document.clone();
    let package = nested_table(&mut updated, &["tool", "poetry"])?;
    // the dev group is reserved for the derived union; the legacy key would
    // shadow it
    package.remove("dev-dependencies");
    let group = nested_table(package, &["group", "dev"])?;
    group.insert(
        "dependencies".to_string(),
        Value::Table(dev_group_table(requirements)),
    );

    Ok((document, updated))
}

fn nested_table<'a>(table: &'a mut Table, keys: &[&str]) -> Result<&'a mut Table> {
    let mut current = table;
    for key in keys {
        current = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Table(Table::new()))
            .as_table_mut()
            .with_context(|| format!("manifest section `{key}` is not a table"))?;
    }
    Ok(current)
}
