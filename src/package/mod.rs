//! Installed-package bookkeeping.
//!
//! This module owns everything the client persists locally: the version
//! marker and manifest of each package, the cached archive, and the rules
//! for deriving their paths from a package name.

mod layout;
mod manifest;
mod store;
pub mod version;

pub use layout::Layout;
pub use manifest::Manifest;
pub use store::InstalledStateStore;
pub use version::{VersionChange, compare_versions};

use crate::error::{PackageError, PackageResult};

/// Check that a package name can be used as a single path component.
pub fn validate_name(name: &str) -> PackageResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || name.chars().any(char::is_whitespace);
    if invalid {
        return Err(PackageError::InvalidName(name.to_string()));
    }
    Ok(())
}
