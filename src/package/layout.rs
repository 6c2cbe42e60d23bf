use std::path::{Path, PathBuf};

/// Where the client keeps its files.
///
/// - `root`: archives are unpacked relative to this directory (`/` in production)
/// - `state_dir`: version markers and manifests (`<root>/usr/local` by default)
/// - `cache_dir`: downloaded archives, also the "is installed" signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Layout {
    pub fn new(root: PathBuf, state_dir: Option<PathBuf>, cache_dir: PathBuf) -> Self {
        let state_dir = state_dir.unwrap_or_else(|| Self::default_state_dir(&root));
        Self {
            root,
            state_dir,
            cache_dir,
        }
    }

    /// `<root>/usr/local`
    pub fn default_state_dir(root: &Path) -> PathBuf {
        root.join("usr").join("local")
    }

    /// Returns: `<state_dir>/<name>.version`
    pub fn version_path(&self, name: &str) -> PathBuf {
        self.state_dir.join(format!("{}.version", name))
    }

    /// Returns: `<state_dir>/<name>.manifest.json`
    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.state_dir.join(format!("{}.manifest.json", name))
    }

    /// Returns: `<cache_dir>/<name>.pkg.tar.xz`
    pub fn archive_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.pkg.tar.xz", name))
    }

    /// Prefix shared by every path the legacy scan attributes to `name`.
    ///
    /// Returns: `<state_dir>/<name>`
    pub fn install_prefix(&self, name: &str) -> PathBuf {
        self.state_dir.join(name)
    }
}
