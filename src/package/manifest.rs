use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Paths written by one extraction, persisted so uninstall removes exactly those.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    /// Regular files, in archive order.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Directories that did not exist before the extraction, parents first.
    #[serde(default)]
    pub directories: Vec<PathBuf>,
}

impl Manifest {
    pub fn add_file(&mut self, path: PathBuf) {
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    pub fn add_directory(&mut self, path: PathBuf) {
        if !self.directories.contains(&path) {
            self.directories.push(path);
        }
    }

    /// Take over the entries of an earlier manifest of the same package.
    ///
    /// A reinstall does not recreate directories that already exist, so the
    /// earlier record is the only one that still owns them.
    pub fn merge(&mut self, earlier: Manifest) {
        for file in earlier.files {
            self.add_file(file);
        }
        for dir in earlier.directories {
            self.add_directory(dir);
        }
    }

    /// Files and directories together.
    pub fn paths(&self) -> BTreeSet<PathBuf> {
        self.files
            .iter()
            .chain(self.directories.iter())
            .cloned()
            .collect()
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime.read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        runtime.write(path, content.as_bytes())
    }
}
