//! Uninstall use case.

use std::collections::BTreeSet;
use std::path::PathBuf;

use log::{debug, info};

use crate::archive::ArchiveExtractor;
use crate::error::{PackageError, PackageResult};
use crate::package::validate_name;
use crate::repository::RepositoryClient;
use crate::runtime::Runtime;

use super::PackageManager;

impl<'a, R, C, E> PackageManager<'a, R, C, E>
where
    R: Runtime + 'static,
    C: RepositoryClient,
    E: ArchiveExtractor,
{
    /// Remove the cached archive, every file of the package, then its
    /// version marker and manifest.
    ///
    /// Returns the paths that belonged to the package. The first failed
    /// deletion aborts and leaves the package partially removed.
    #[tracing::instrument(skip(self))]
    pub fn uninstall(&self, name: &str) -> PackageResult<BTreeSet<PathBuf>> {
        validate_name(name)?;

        if !self.store.is_installed(name) {
            return Err(PackageError::NotInstalled(name.to_string()));
        }

        debug!("{}: Uninstalling", name);
        let files = self.store.list_files(name)?;
        debug!("{} owns {} path(s)", name, files.len());

        self.store.remove_archive(name)?;
        self.store.remove_files(&files)?;
        self.store.remove_version(name)?;

        debug!("{}: Absent", name);
        info!("Uninstalled {}", name);
        Ok(files)
    }
}
