//! Parsed, normalized view of one project manifest (`pyproject.toml`).
//!
//! Only the sections the orchestrator cares about are extracted: package
//! identity, dependency tables (for local `path` declarations and for
//! dev-dependency aggregation), and the `[tool.flotilla]` document. Unrelated
//! sections pass through untouched.

use toml::{Table, Value};

/// Manifest file name looked for at every project root.
pub const MANIFEST_FILE: &str = "pyproject.toml";

/// One dependency declaration: a name and its raw specification value.
///
/// The specification is kept verbatim (version string or inline table) so the
/// aggregation command can re-emit it without understanding version syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub name: String,
    pub spec: Value,
}

impl Dependency {
    /// The relative path of a local path dependency, if this is one.
    pub fn local_path(&self) -> Option<&str> {
        self.spec.as_table()?.get("path")?.as_str()
    }

    pub fn is_local(&self) -> bool {
        self.local_path().is_some()
    }
}

/// The parts of a manifest the orchestrator reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Package name, unique across the repository.
    pub name: String,
    /// Runtime dependencies, in stable manifest-table order.
    pub dependencies: Vec<Dependency>,
    /// Development-only dependencies, in stable manifest-table order.
    pub dev_dependencies: Vec<Dependency>,
    /// Raw `[tool.flotilla]` document; merged with presets later.
    pub tool_config: Table,
}

impl Manifest {
    /// Parse a manifest document.
    ///
    /// Returns `Ok(None)` for TOML documents that are not package manifests
    /// (no package section): those directories are not projects and are
    /// silently skipped during discovery. A document that has a package
    /// section but a malformed shape is an error.
    pub fn parse(text: &str) -> Result<Option<Manifest>, String> {
        let doc: Table = toml::from_str(text).map_err(|err| err.to_string())?;
        Self::from_document(&doc)
    }

    fn from_document(doc: &Table) -> Result<Option<Manifest>, String> {
        let Some(package) = lookup(doc, &["tool", "poetry"]) else {
            return Ok(None);
        };

        let name = package
            .get("name")
            .and_then(Value::as_str)
            .ok_or("package section has no `name`")?
            .to_string();

        let dependencies = dependency_table(package, &["dependencies"])?;
        // both the group table and the legacy key are accepted
        let mut dev_dependencies = dependency_table(package, &["group", "dev", "dependencies"])?;
        if dev_dependencies.is_empty() {
            dev_dependencies = dependency_table(package, &["dev-dependencies"])?;
        }

        let tool_config = lookup(doc, &["tool", "flotilla"]).cloned().unwrap_or_default();

        Ok(Some(Manifest {
            name,
            dependencies,
            dev_dependencies,
            tool_config,
        }))
    }

    /// Import/module name: the package name with `-` mapped to `_`.
    pub fn module_name(&self) -> String {
        module_name(&self.name)
    }

    /// Local path dependencies, in dependency-table order.
    pub fn local_dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().filter(|dep| dep.is_local())
    }

    /// Whether this manifest marks the project as a dev-environment aggregator.
    pub fn is_aggregator(&self) -> bool {
        self.tool_config
            .get("pydev")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Map a package name to its import/module name.
pub fn module_name(package_name: &str) -> String {
    package_name.replace('-', "_")
}

fn lookup<'a>(doc: &'a Table, keys: &[&str]) -> Option<&'a Table> {
    let mut current = doc;
    for key in keys {
        current = current.get(*key)?.as_table()?;
    }
    Some(current)
}

fn dependency_table(package: &Table, keys: &[&str]) -> Result<Vec<Dependency>, String> {
    let Some(table) = lookup(package, keys) else {
        return Ok(Vec::new());
    };
    Ok(table
        .iter()
        .map(|(name, spec)| Dependency {
            name: name.clone(),
            spec: spec.clone(),
        })
        .collect())
}
