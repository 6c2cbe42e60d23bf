//! Lexical path helpers used to keep archive entries inside the install root.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Leading `..` components cannot be resolved lexically and stack up
                let last_is_parent =
                    matches!(result.components().next_back(), Some(Component::ParentDir));
                if last_is_parent || !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Check if a path is under a given directory by comparing normalized path components.
///
/// `/usr/local/bin/../../../etc/passwd` is NOT under `/usr/local`, and
/// `/usr/local-extra` is not under `/usr/local` either.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    let normalized_path = normalize_path(path);
    let normalized_dir = normalize_path(dir);

    let path_components: Vec<_> = normalized_path.components().collect();
    let dir_components: Vec<_> = normalized_dir.components().collect();

    if path_components.len() < dir_components.len() {
        return false;
    }

    dir_components
        .iter()
        .zip(path_components.iter())
        .all(|(d, p)| d == p)
}

/// Join a path declared inside an archive onto `root`.
///
/// Leading `/` (and Windows prefixes) are dropped so absolute entry names land
/// under `root`. Returns `None` when the entry climbs out of `root` through
/// `..` components.
pub fn join_under_root(root: &Path, entry: &Path) -> Option<PathBuf> {
    let relative: PathBuf = entry
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    let relative = normalize_path(&relative);

    if matches!(relative.components().next(), Some(Component::ParentDir)) {
        return None;
    }

    let target = root.join(&relative);
    if is_path_under(&target, root) {
        Some(target)
    } else {
        None
    }
}
