//! Package lifecycle - install, update and uninstall.
//!
//! [`PackageManager`] coordinates the repository client, the integrity
//! check, the archive extractor and the installed-state store. Every step
//! runs in order; the first failure aborts the operation and leaves whatever
//! was already written on disk.
//!
//! State transitions of a single package are logged at debug level:
//! `Resolving -> Downloading -> Verifying -> Extracting -> Installed`, and
//! `Uninstalling -> Absent`.

mod install;
mod uninstall;
mod update;

pub use install::{InstallReport, InstalledPackage};
pub use update::UpdateOutcome;

use crate::archive::ArchiveExtractor;
use crate::package::{InstalledStateStore, Layout};
use crate::repository::RepositoryClient;
use crate::runtime::Runtime;

pub struct PackageManager<'a, R: Runtime, C: RepositoryClient, E: ArchiveExtractor> {
    runtime: &'a R,
    repository: &'a C,
    extractor: &'a E,
    store: InstalledStateStore<'a, R>,
}

impl<'a, R, C, E> PackageManager<'a, R, C, E>
where
    R: Runtime + 'static,
    C: RepositoryClient,
    E: ArchiveExtractor,
{
    pub fn new(runtime: &'a R, repository: &'a C, extractor: &'a E, layout: Layout) -> Self {
        Self {
            runtime,
            repository,
            extractor,
            store: InstalledStateStore::new(runtime, layout),
        }
    }

    pub fn store(&self) -> &InstalledStateStore<'a, R> {
        &self.store
    }

    fn layout(&self) -> &Layout {
        self.store.layout()
    }
}
