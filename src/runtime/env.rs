//! Process environment: working directory and temp directory.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn current_dir_impl(&self) -> Result<PathBuf> {
        env::current_dir().context("Failed to determine the current directory")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn temp_dir_impl(&self) -> PathBuf {
        env::temp_dir()
    }
}
