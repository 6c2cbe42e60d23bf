use async_trait::async_trait;
use log::{debug, info};
use std::path::PathBuf;
use tempfile::TempPath;

use crate::error::{PackageError, PackageResult};
use crate::http::{HttpClient, HttpError};

use super::{ArtifactKind, RepositoryClient, artifact_url, parse_dependencies};

/// Repository client talking HTTP to a single base address.
pub struct HttpRepository {
    http: HttpClient,
    base_url: String,
    temp_dir: PathBuf,
}

impl HttpRepository {
    /// `temp_dir` is where downloaded archives are staged.
    pub fn new(http: HttpClient, base_url: impl Into<String>, temp_dir: PathBuf) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            temp_dir,
        }
    }

    async fn fetch_text(&self, name: &str, kind: ArtifactKind) -> PackageResult<String> {
        let url = artifact_url(&self.base_url, name, kind);
        self.http
            .get_text(&url)
            .await
            .map_err(|e| into_package_error(e, name, kind))
    }
}

fn into_package_error(error: HttpError, package: &str, kind: ArtifactKind) -> PackageError {
    let package = package.to_string();
    match error {
        HttpError::Status(status) => PackageError::Repository {
            package,
            kind,
            status,
        },
        HttpError::Transport(source) => PackageError::Network {
            package,
            kind,
            source,
        },
        HttpError::Write(e) => PackageError::filesystem(
            format!("Failed to stage the archive of {}", package),
            e.into(),
        ),
    }
}

#[async_trait]
impl RepositoryClient for HttpRepository {
    #[tracing::instrument(skip(self))]
    async fn fetch_dependencies(&self, name: &str) -> PackageResult<Vec<String>> {
        let body = self.fetch_text(name, ArtifactKind::Dependencies).await?;
        let deps = parse_dependencies(&body)?;
        debug!("{} depends on {:?}", name, deps);
        Ok(deps)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_hash(&self, name: &str) -> PackageResult<String> {
        self.fetch_text(name, ArtifactKind::Hash).await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_version(&self, name: &str) -> PackageResult<String> {
        self.fetch_text(name, ArtifactKind::Version).await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_archive(&self, name: &str) -> PackageResult<TempPath> {
        let url = artifact_url(&self.base_url, name, ArtifactKind::Archive);
        info!("Downloading {}...", url);

        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}-", name))
            .suffix(".pkg.tar.xz")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| {
                PackageError::filesystem(
                    format!("Failed to create a temporary file in {:?}", self.temp_dir),
                    e.into(),
                )
            })?;

        let bytes = self
            .http
            .download_to(&url, file.as_file_mut())
            .await
            .map_err(|e| into_package_error(e, name, ArtifactKind::Archive))?;

        debug!("Staged {} bytes at {:?}", bytes, file.path());
        Ok(file.into_temp_path())
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
