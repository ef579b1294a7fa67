//! Exact-name project lookup for `flotilla locate`.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::io::discover::{absolute, discover};

/// Find the root directory of the exactly-named project under `root`.
pub fn locate(root: &Path, name: &str) -> Result<PathBuf> {
    let repo_root = absolute(root);
    let graph = discover(&repo_root)?;

    let matched = graph.select(Some(name), true);
    match matched.as_slice() {
        [project] => Ok(project.root.clone()),
        [] => bail!("`{name}` cannot be found in {}", repo_root.display()),
        _ => bail!("`{name}` matches more than one project"),
    }
}
