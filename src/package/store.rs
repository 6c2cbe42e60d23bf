//! Installed-state store.
//!
//! A package counts as installed when both its version marker
//! (`<state_dir>/<name>.version`) and its cached archive
//! (`<cache_dir>/<name>.pkg.tar.xz`) exist. Nothing keeps the two in sync;
//! deleting either one by hand makes the package "not installed".

use log::debug;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{PackageError, PackageResult};
use crate::runtime::Runtime;

use super::{Layout, Manifest};

pub struct InstalledStateStore<'a, R: Runtime> {
    runtime: &'a R,
    layout: Layout,
}

impl<'a, R: Runtime> InstalledStateStore<'a, R> {
    pub fn new(runtime: &'a R, layout: Layout) -> Self {
        Self { runtime, layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.runtime.exists(&self.layout.version_path(name))
            && self.runtime.exists(&self.layout.archive_path(name))
    }

    /// Write `version` as the entire content of the marker.
    #[tracing::instrument(skip(self))]
    pub fn record_version(&self, name: &str, version: &str) -> PackageResult<()> {
        let path = self.layout.version_path(name);
        self.ensure_parent(&path)?;
        self.runtime
            .write(&path, version.as_bytes())
            .map_err(|e| PackageError::filesystem(format!("Failed to write {:?}", path), e))
    }

    #[tracing::instrument(skip(self))]
    pub fn read_version(&self, name: &str) -> PackageResult<String> {
        let path = self.layout.version_path(name);
        if !self.runtime.exists(&path) {
            return Err(PackageError::NotInstalled(name.to_string()));
        }
        self.runtime
            .read_to_string(&path)
            .map_err(|e| PackageError::filesystem(format!("Failed to read {:?}", path), e))
    }

    #[tracing::instrument(skip(self, manifest))]
    pub fn record_manifest(&self, name: &str, manifest: &Manifest) -> PackageResult<()> {
        let path = self.layout.manifest_path(name);
        self.ensure_parent(&path)?;
        manifest
            .save(self.runtime, &path)
            .map_err(|e| PackageError::filesystem(format!("Failed to write {:?}", path), e))
    }

    /// `None` for packages installed without a manifest.
    pub fn read_manifest(&self, name: &str) -> PackageResult<Option<Manifest>> {
        let path = self.layout.manifest_path(name);
        if !self.runtime.exists(&path) {
            return Ok(None);
        }
        Manifest::load(self.runtime, &path)
            .map(Some)
            .map_err(|e| PackageError::filesystem(format!("Failed to read {:?}", path), e))
    }

    /// Paths belonging to an installed package.
    ///
    /// Uses the manifest when there is one, the prefix scan otherwise.
    #[tracing::instrument(skip(self))]
    pub fn list_files(&self, name: &str) -> PackageResult<BTreeSet<PathBuf>> {
        match self.read_manifest(name)? {
            Some(manifest) => Ok(manifest.paths()),
            None => {
                debug!("No manifest for {}, scanning for its files", name);
                self.scan_prefix(name)
            }
        }
    }

    /// Every path under `state_dir` whose string form starts with
    /// `<state_dir>/<name>`.
    ///
    /// This is an approximation: `app` also claims `application/`. The
    /// package's own marker and manifest are left out.
    pub fn scan_prefix(&self, name: &str) -> PackageResult<BTreeSet<PathBuf>> {
        let prefix = self.layout.install_prefix(name);
        let prefix = prefix.to_string_lossy();
        let own_state = [
            self.layout.version_path(name),
            self.layout.manifest_path(name),
        ];

        let mut found = BTreeSet::new();
        if !self.runtime.is_dir(&self.layout.state_dir) {
            return Ok(found);
        }

        let mut pending = vec![self.layout.state_dir.clone()];
        while let Some(dir) = pending.pop() {
            let entries = self.runtime.read_dir(&dir).map_err(|e| {
                PackageError::filesystem(format!("Failed to scan {:?}", dir), e)
            })?;
            for entry in entries {
                if entry.to_string_lossy().starts_with(prefix.as_ref())
                    && !own_state.contains(&entry)
                {
                    found.insert(entry.clone());
                }
                if self.runtime.is_dir(&entry) {
                    pending.push(entry);
                }
            }
        }

        Ok(found)
    }

    /// Delete the marker and the manifest.
    #[tracing::instrument(skip(self))]
    pub fn remove_version(&self, name: &str) -> PackageResult<()> {
        let path = self.layout.version_path(name);
        self.remove_file(&path)?;

        let manifest = self.layout.manifest_path(name);
        if self.runtime.exists(&manifest) {
            self.remove_file(&manifest)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_archive(&self, name: &str) -> PackageResult<()> {
        self.remove_file(&self.layout.archive_path(name))
    }

    /// Delete files first, then directories deepest-first.
    ///
    /// Directories that still hold something (other packages' files) are
    /// kept. Paths that are already gone are skipped.
    #[tracing::instrument(skip(self, paths))]
    pub fn remove_files(&self, paths: &BTreeSet<PathBuf>) -> PackageResult<()> {
        let mut dirs = Vec::new();
        for path in paths {
            if self.runtime.is_dir(path) {
                dirs.push(path);
            } else if self.runtime.exists(path) {
                debug!("Removing {:?}", path);
                self.remove_file(path)?;
            } else {
                debug!("{:?} is already gone", path);
            }
        }

        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        for dir in dirs {
            let entries = self.runtime.read_dir(dir).map_err(|e| {
                PackageError::filesystem(format!("Failed to read {:?}", dir), e)
            })?;
            if entries.is_empty() {
                debug!("Removing directory {:?}", dir);
                self.runtime.remove_dir(dir).map_err(|e| {
                    PackageError::filesystem(format!("Failed to remove {:?}", dir), e)
                })?;
            } else {
                debug!("Keeping non-empty directory {:?}", dir);
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> PackageResult<()> {
        self.runtime
            .remove_file(path)
            .map_err(|e| PackageError::filesystem(format!("Failed to remove {:?}", path), e))
    }

    fn ensure_parent(&self, path: &Path) -> PackageResult<()> {
        if let Some(parent) = path.parent() {
            if !self.runtime.exists(parent) {
                self.runtime.create_dir_all(parent).map_err(|e| {
                    PackageError::filesystem(format!("Failed to create {:?}", parent), e)
                })?;
            }
        }
        Ok(())
    }
}
