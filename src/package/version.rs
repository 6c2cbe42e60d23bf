//! Version strings.
//!
//! Versions are opaque: whether an update is needed is decided by plain
//! string equality. [`compare_versions`] only serves to describe the change
//! to the user (upgrade or downgrade); it never decides anything.

use std::cmp::Ordering;

/// How a repository version relates to the installed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChange {
    /// Byte-for-byte identical.
    Same,
    Upgrade,
    Downgrade,
    /// Different strings that compare equal component-wise (e.g. `1.0` vs `1.00`).
    Different,
}

impl VersionChange {
    pub fn between(installed: &str, remote: &str) -> Self {
        if installed == remote {
            return VersionChange::Same;
        }
        match compare_versions(installed, remote) {
            Ordering::Less => VersionChange::Upgrade,
            Ordering::Greater => VersionChange::Downgrade,
            Ordering::Equal => VersionChange::Different,
        }
    }

    pub fn needs_install(self) -> bool {
        self != VersionChange::Same
    }
}

/// Compare dot-separated versions component by component.
///
/// Components that both parse as integers compare numerically, anything else
/// compares as strings. When one version is a prefix of the other, the
/// shorter one is smaller (`1.2` < `1.2.1`).
pub fn compare_versions(v1: &str, v2: &str) -> Ordering {
    let mut left = v1.trim().split('.');
    let mut right = v2.trim().split('.');

    loop {
        match (left.next(), right.next()) {
            (Some(a), Some(b)) => {
                let ordering = match (a.parse::<u64>(), b.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => a.cmp(b),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}
