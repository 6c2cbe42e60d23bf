//! Update use case - reinstall when the repository version differs.

use log::{debug, info};

use crate::archive::ArchiveExtractor;
use crate::error::PackageResult;
use crate::package::{VersionChange, validate_name};
use crate::repository::RepositoryClient;
use crate::runtime::Runtime;

use super::{InstallReport, PackageManager};

/// What an update call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The package was not installed, so it was installed from scratch.
    Installed(InstallReport),
    /// The recorded version equals the repository's; nothing was downloaded.
    UpToDate { version: String },
    /// The package was reinstalled at the repository's version.
    Updated {
        from: String,
        to: String,
        report: InstallReport,
    },
}

impl<'a, R, C, E> PackageManager<'a, R, C, E>
where
    R: Runtime + 'static,
    C: RepositoryClient,
    E: ArchiveExtractor,
{
    /// Bring `name` to the repository's current version.
    ///
    /// Versions are compared as plain strings: any difference, including a
    /// lower repository version, triggers a full install.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, name: &str) -> PackageResult<UpdateOutcome> {
        validate_name(name)?;

        if !self.store.is_installed(name) {
            debug!("{} is not installed, installing", name);
            return Ok(UpdateOutcome::Installed(self.install(name).await?));
        }

        let installed = self.store.read_version(name)?;
        let remote = self.repository.fetch_version(name).await?;

        let change = VersionChange::between(&installed, &remote);
        if !change.needs_install() {
            debug!("{} is up to date ({})", name, installed.trim());
            return Ok(UpdateOutcome::UpToDate { version: installed });
        }

        info!(
            "Updating {} from {} to {} ({:?})",
            name,
            installed.trim(),
            remote.trim(),
            change
        );
        let report = self.install(name).await?;
        Ok(UpdateOutcome::Updated {
            from: installed,
            to: remote,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{Served, installed_binary, layout, serving};
    use super::*;
    use crate::archive::TarXzExtractor;
    use crate::error::PackageError;
    use crate::repository::MockRepositoryClient;
    use crate::runtime::RealRuntime;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_update_not_installed_installs() {
        let dir = tempdir().unwrap();
        let repo = serving(HashMap::from([("app", Served::new("app", &[], "1.0"))]));
        let manager = PackageManager::new(&RealRuntime, &repo, &TarXzExtractor, layout(&dir));

        let outcome = manager.update("app").await.unwrap();

        match outcome {
            UpdateOutcome::Installed(report) => assert_eq!(report.installed.len(), 1),
            other => panic!("Expected install, got {:?}", other),
        }
        assert_eq!(manager.store().read_version("app").unwrap(), "1.0");
    }

    #[tokio::test]
    async fn test_update_same_version_is_noop() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let setup = serving(HashMap::from([("app", Served::new("app", &[], "1.0"))]));
        PackageManager::new(&RealRuntime, &setup, &TarXzExtractor, layout.clone())
            .install("app")
            .await
            .unwrap();

        let mut repo = MockRepositoryClient::new();
        repo.expect_fetch_version()
            .times(1)
            .returning(|_| Ok("1.0".to_string()));
        repo.expect_fetch_dependencies().never();
        repo.expect_fetch_archive().never();

        let manager = PackageManager::new(&RealRuntime, &repo, &TarXzExtractor, layout);
        let outcome = manager.update("app").await.unwrap();

        assert_eq!(
            outcome,
            UpdateOutcome::UpToDate {
                version: "1.0".to_string()
            }
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_update_new_version_reinstalls() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let v1 = serving(HashMap::from([("app", Served::new("app", &[], "1.0"))]));
        PackageManager::new(&RealRuntime, &v1, &TarXzExtractor, layout.clone())
            .install("app")
            .await
            .unwrap();

        let v2 = serving(HashMap::from([("app", Served::new("app", &[], "1.1"))]));
        let manager = PackageManager::new(&RealRuntime, &v2, &TarXzExtractor, layout.clone());
        let outcome = manager.update("app").await.unwrap();

        match outcome {
            UpdateOutcome::Updated { from, to, report } => {
                assert_eq!(from, "1.0");
                assert_eq!(to, "1.1");
                assert_eq!(report.target().unwrap().version, "1.1");
            }
            other => panic!("Expected update, got {:?}", other),
        }
        assert_eq!(manager.store().read_version("app").unwrap(), "1.1");
        assert_eq!(
            fs::read_to_string(installed_binary(&layout, "app")).unwrap(),
            "app 1.1"
        );
    }

    #[tokio::test]
    async fn test_update_lower_version_still_reinstalls() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let v2 = serving(HashMap::from([("app", Served::new("app", &[], "2.0"))]));
        PackageManager::new(&RealRuntime, &v2, &TarXzExtractor, layout.clone())
            .install("app")
            .await
            .unwrap();

        let v1 = serving(HashMap::from([("app", Served::new("app", &[], "1.0"))]));
        let manager = PackageManager::new(&RealRuntime, &v1, &TarXzExtractor, layout);
        let outcome = manager.update("app").await.unwrap();

        assert!(matches!(outcome, UpdateOutcome::Updated { ref to, .. } if to == "1.0"));
        assert_eq!(manager.store().read_version("app").unwrap(), "1.0");
    }

    #[tokio::test]
    async fn test_update_missing_cached_archive_counts_as_not_installed() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let repo = serving(HashMap::from([("app", Served::new("app", &[], "1.0"))]));
        let manager = PackageManager::new(&RealRuntime, &repo, &TarXzExtractor, layout.clone());
        manager.install("app").await.unwrap();
        fs::remove_file(layout.archive_path("app")).unwrap();

        let outcome = manager.update("app").await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Installed(_)));
    }

    #[tokio::test]
    async fn test_update_version_fetch_failure() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let setup = serving(HashMap::from([("app", Served::new("app", &[], "1.0"))]));
        PackageManager::new(&RealRuntime, &setup, &TarXzExtractor, layout.clone())
            .install("app")
            .await
            .unwrap();

        let mut repo = MockRepositoryClient::new();
        repo.expect_fetch_version().returning(|name| {
            Err(PackageError::Repository {
                package: name.to_string(),
                kind: crate::repository::ArtifactKind::Version,
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            })
        });

        let manager = PackageManager::new(&RealRuntime, &repo, &TarXzExtractor, layout);
        let err = manager.update("app").await.unwrap_err();
        assert!(matches!(err, PackageError::Repository { .. }));
        assert_eq!(manager.store().read_version("app").unwrap(), "1.0");
    }
}
