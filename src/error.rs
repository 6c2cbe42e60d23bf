//! Error type shared by every package operation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::archive::ExtractError;
use crate::repository::ArtifactKind;

pub type PackageResult<T> = std::result::Result<T, PackageError>;

#[derive(Debug, Error)]
pub enum PackageError {
    /// The request never produced a response (DNS, refused connection, timeout).
    #[error("network error while fetching {kind} for {package}")]
    Network {
        package: String,
        kind: ArtifactKind,
        #[source]
        source: reqwest::Error,
    },

    /// The repository answered with a non-success status.
    #[error("repository returned {status} for {kind} of {package}")]
    Repository {
        package: String,
        kind: ArtifactKind,
        status: StatusCode,
    },

    #[error("package verification failed for {package}: expected sha256 {expected}, got {actual}")]
    Verification {
        package: String,
        expected: String,
        actual: String,
    },

    #[error("failed to extract {package}")]
    Extraction {
        package: String,
        #[source]
        source: ExtractError,
    },

    #[error("package {0} is not installed")]
    NotInstalled(String),

    #[error("invalid package name {0:?}")]
    InvalidName(String),

    #[error("dependency cycle detected: {}", path.join(" -> "))]
    DependencyCycle { path: Vec<String> },

    #[error("{context}: {error:#}")]
    Filesystem {
        context: String,
        error: anyhow::Error,
    },
}

impl PackageError {
    /// Wrap a runtime failure with a short description of what was attempted.
    pub fn filesystem(context: impl Into<String>, error: anyhow::Error) -> Self {
        PackageError::Filesystem {
            context: context.into(),
            error,
        }
    }
}
