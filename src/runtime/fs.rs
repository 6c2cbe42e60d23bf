//! File system operations (read, write, directory, permissions).

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self, contents))]
    pub(crate) fn write_impl(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).context("Failed to write to file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_to_string_impl(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context("Failed to read file to string")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn copy_impl(&self, from: &Path, to: &Path) -> Result<u64> {
        fs::copy(from, to).context("Failed to copy file")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).context("Failed to create directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_file_impl(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).context("Failed to remove file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_dir_impl(&self, path: &Path) -> Result<()> {
        fs::remove_dir(path).context("Failed to remove directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn exists_impl(&self, path: &Path) -> bool {
        path.exists()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_dir_impl(&self, path: &Path) -> bool {
        // Do not follow symlinks: a link to a directory is removed as a file.
        fs::symlink_metadata(path)
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_dir_impl(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)
            .with_context(|| format!("Failed to read directory {:?}", path))?
            .map(|entry| Ok(entry?.path()))
            .collect::<Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_file_impl(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        let file = fs::File::create(path).context("Failed to create file")?;
        Ok(Box::new(file))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn open_impl(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>> {
        let file = fs::File::open(path).context("Failed to open file")?;
        Ok(Box::new(file))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn set_permissions_impl(&self, path: &Path, mode: u32) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(mode);
            fs::set_permissions(path, permissions).context("Failed to set permissions")?;
        }
        #[cfg(not(unix))]
        {
            let _ = (path, mode);
        }
        Ok(())
    }
}
