//! Runtime abstraction for system operations.
//!
//! Every filesystem touch made by the package engine goes through the
//! [`Runtime`] trait so that the engine can run against a real disk
//! ([`RealRuntime`]) or a mock in unit tests.
//!
//! # Structure
//!
//! - `path` - Lexical path helpers (normalize, is_path_under)
//! - `env` - Process environment (working directory, temp directory)
//! - `fs` - File system operations (read, write, directory, permissions)

mod env;
mod fs;
pub mod path;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use path::{is_path_under, normalize_path};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn current_dir(&self) -> Result<PathBuf>;
    fn temp_dir(&self) -> PathBuf;

    // File System
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn copy(&self, from: &Path, to: &Path) -> Result<u64>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>>;
    fn open(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>>;

    /// Set file permissions (mode) on Unix systems. No-op elsewhere.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn current_dir(&self) -> Result<PathBuf> {
        self.current_dir_impl()
    }

    fn temp_dir(&self) -> PathBuf {
        self.temp_dir_impl()
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_impl(path, contents)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        self.copy_impl(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.remove_file_impl(path)
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        self.remove_dir_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        self.create_file_impl(path)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>> {
        self.open_impl(path)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        self.set_permissions_impl(path, mode)
    }
}
