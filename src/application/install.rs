//! Install use case - dependencies first, then the package itself.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::archive::{ArchiveExtractor, ExtractError};
use crate::error::{PackageError, PackageResult};
use crate::package::validate_name;
use crate::repository::RepositoryClient;
use crate::runtime::Runtime;
use crate::verify::{Verification, expected_digest, verify};

use super::PackageManager;

/// A package written to disk by an install call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}

/// Packages installed by one call, in installation order (dependencies
/// before dependents, the requested package last).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<InstalledPackage>,
}

impl InstallReport {
    /// The requested package is always installed last.
    pub fn target(&self) -> Option<&InstalledPackage> {
        self.installed.last()
    }
}

/// Work-list item of the dependency walk.
enum Step {
    /// Fetch the dependencies of a package and schedule them.
    Resolve { name: String, required: bool },
    /// Every dependency is in place; install the package.
    Install(String),
}

impl<'a, R, C, E> PackageManager<'a, R, C, E>
where
    R: Runtime + 'static,
    C: RepositoryClient,
    E: ArchiveExtractor,
{
    /// Install `name` and every dependency that is not installed yet.
    ///
    /// Dependencies are walked depth-first in declaration order. The
    /// requested package is reinstalled even when it is already present.
    /// A dependency that leads back to a package still being resolved fails
    /// with [`PackageError::DependencyCycle`].
    #[tracing::instrument(skip(self))]
    pub async fn install(&self, name: &str) -> PackageResult<InstallReport> {
        validate_name(name)?;

        let mut report = InstallReport::default();
        let mut path: Vec<String> = Vec::new();
        let mut done: HashSet<String> = HashSet::new();
        let mut stack = vec![Step::Resolve {
            name: name.to_string(),
            required: true,
        }];

        while let Some(step) = stack.pop() {
            match step {
                Step::Resolve { name, required } => {
                    if !required && (done.contains(&name) || self.store.is_installed(&name)) {
                        debug!("{}: already installed, skipping", name);
                        continue;
                    }
                    if path.contains(&name) {
                        let mut cycle = path.clone();
                        cycle.push(name);
                        return Err(PackageError::DependencyCycle { path: cycle });
                    }

                    debug!("{}: Resolving", name);
                    let deps = self.repository.fetch_dependencies(&name).await?;
                    debug!("{} depends on {:?}", name, deps);

                    path.push(name.clone());
                    stack.push(Step::Install(name));
                    stack.extend(deps.into_iter().rev().map(|dep| Step::Resolve {
                        name: dep,
                        required: false,
                    }));
                }
                Step::Install(name) => {
                    let version = self.install_one(&name).await?;
                    path.pop();
                    done.insert(name.clone());
                    report.installed.push(InstalledPackage { name, version });
                }
            }
        }

        Ok(report)
    }

    /// Download, verify, extract and record a single package.
    ///
    /// Returns the version that was recorded.
    async fn install_one(&self, name: &str) -> PackageResult<String> {
        let archive_path = self.layout().archive_path(name);
        if !self.extractor.can_handle(&archive_path) {
            return Err(PackageError::Extraction {
                package: name.to_string(),
                source: ExtractError::Unsupported(archive_path),
            });
        }

        debug!("{}: Downloading from {}", name, self.repository.base_url());
        let download = self.repository.fetch_archive(name).await?;
        let cache_dir = &self.layout().cache_dir;
        if !self.runtime.exists(cache_dir) {
            self.runtime.create_dir_all(cache_dir).map_err(|e| {
                PackageError::filesystem(format!("Failed to create {:?}", cache_dir), e)
            })?;
        }
        self.runtime
            .copy(&download, &archive_path)
            .map_err(|e| PackageError::filesystem(format!("Failed to write {:?}", archive_path), e))?;
        drop(download);

        debug!("{}: Verifying", name);
        let hash = self.repository.fetch_hash(name).await?;
        let expected = expected_digest(&hash);
        match verify(self.runtime, &archive_path, expected) {
            Verification::Verified => {}
            Verification::Mismatch { actual } => {
                return Err(PackageError::Verification {
                    package: name.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
            Verification::Unreadable { reason } => {
                return Err(PackageError::filesystem(
                    format!("Failed to read {:?}", archive_path),
                    anyhow::anyhow!(reason),
                ));
            }
        }

        debug!("{}: Extracting", name);
        let mut manifest = self
            .extractor
            .extract(self.runtime, &archive_path, &self.layout().root)
            .map_err(|source| PackageError::Extraction {
                package: name.to_string(),
                source,
            })?;

        match self.store.read_manifest(name) {
            Ok(Some(earlier)) => manifest.merge(earlier),
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable manifest of {}: {}", name, e),
        }

        let version = self.repository.fetch_version(name).await?;
        self.store.record_version(name, &version)?;
        self.store.record_manifest(name, &manifest)?;

        debug!("{}: Installed", name);
        info!("Installed {} {}", name, version.trim());
        Ok(version)
    }
}
