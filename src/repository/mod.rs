//! Client side of the remote package repository.
//!
//! A repository is a flat HTTP directory. For a package `P` it serves four
//! artifacts, each at `{base}/{P}.{suffix}`:
//!
//! | Suffix       | Content                              |
//! |--------------|--------------------------------------|
//! | `dep`        | newline-delimited dependency names   |
//! | `sha256`     | hex digest of the archive            |
//! | `version`    | opaque version string                |
//! | `pkg.tar.xz` | xz-compressed tar archive            |

mod http;

use async_trait::async_trait;
use std::fmt;
use tempfile::TempPath;

use crate::error::PackageResult;
use crate::package::validate_name;

pub use http::HttpRepository;

/// The four artifact kinds a repository serves per package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Dependencies,
    Hash,
    Version,
    Archive,
}

impl ArtifactKind {
    /// File suffix appended to the package name in the artifact URL.
    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Dependencies => "dep",
            ArtifactKind::Hash => "sha256",
            ArtifactKind::Version => "version",
            ArtifactKind::Archive => "pkg.tar.xz",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Dependencies => "dependencies",
            ArtifactKind::Hash => "hash",
            ArtifactKind::Version => "version",
            ArtifactKind::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// Fetches the artifacts of a package from the repository.
///
/// Every method performs exactly one request; nothing is retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Declared dependencies, in declaration order.
    async fn fetch_dependencies(&self, name: &str) -> PackageResult<Vec<String>>;

    /// Raw body of the `.sha256` artifact.
    async fn fetch_hash(&self, name: &str) -> PackageResult<String>;

    /// Raw body of the `.version` artifact.
    async fn fetch_version(&self, name: &str) -> PackageResult<String>;

    /// Download the archive into a fresh temporary file.
    ///
    /// The file is deleted when the returned handle is dropped.
    async fn fetch_archive(&self, name: &str) -> PackageResult<TempPath>;

    fn base_url(&self) -> &str;
}

/// Build the URL of one artifact.
pub fn artifact_url(base_url: &str, name: &str, kind: ArtifactKind) -> String {
    format!("{}/{}.{}", base_url.trim_end_matches('/'), name, kind.suffix())
}

/// Parse a `.dep` body: one package name per line.
///
/// Lines are trimmed (so CRLF bodies work) and blank lines are ignored.
pub fn parse_dependencies(body: &str) -> PackageResult<Vec<String>> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            validate_name(line)?;
            Ok(line.to_string())
        })
        .collect()
}
