mod tar_xz;

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::package::Manifest;
use crate::runtime::Runtime;

pub use tar_xz::TarXzExtractor;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported archive format: {}", .0.display())]
    Unsupported(PathBuf),

    #[error("failed to decompress {}: {error:#}", path.display())]
    Decompress { path: PathBuf, error: anyhow::Error },

    #[error("failed to read entries of {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive entry {} escapes the install root", entry.display())]
    UnsafePath { entry: PathBuf },

    #[error("failed to write {}: {error:#}", path.display())]
    Write { path: PathBuf, error: anyhow::Error },
}

/// Trait for format-specific archive extractors
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor: Send + Sync {
    /// Check if this extractor can handle the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Unpack the archive onto `root` and return every path it created.
    ///
    /// Entries written before a failure stay on disk.
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        root: &Path,
    ) -> Result<Manifest, ExtractError>;
}
