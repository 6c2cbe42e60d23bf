use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    archive::TarXzExtractor, http::HttpClient, package::Layout, repository::HttpRepository,
    runtime::Runtime,
};

/// Default location of the one-line configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/braden.conf";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the command line can override.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Config file holding the repository URL on its first line.
    pub config_path: Option<PathBuf>,
    /// Repository URL; takes precedence over the config file.
    pub repo_url: Option<String>,
    /// Directory archives are unpacked onto (default `/`).
    pub root: Option<PathBuf>,
    /// Where version markers and manifests live (default `<root>/usr/local`).
    pub state_dir: Option<PathBuf>,
    /// Where downloaded archives are cached (default: working directory).
    pub cache_dir: Option<PathBuf>,
}

pub struct Config<R: Runtime> {
    pub runtime: R,
    pub repository: HttpRepository,
    pub extractor: TarXzExtractor,
    pub layout: Layout,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, options: ConfigOptions) -> Result<Self> {
        let base_url = match options.repo_url {
            Some(url) => url,
            None => {
                let path = options
                    .config_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
                read_repo_url(&runtime, &path)?
            }
        };
        let base_url = base_url.trim().to_string();
        if base_url.is_empty() {
            anyhow::bail!("Repository URL is empty");
        }
        debug!("Using repository {}", base_url);

        let root = options.root.unwrap_or_else(|| PathBuf::from("/"));
        let cache_dir = match options.cache_dir {
            Some(dir) => dir,
            None => runtime.current_dir()?,
        };
        let layout = Layout::new(root, options.state_dir, cache_dir);
        debug!("Using layout {:?}", layout);

        let client = Client::builder()
            .user_agent(format!("braden/{}", env!("BRADEN_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let repository = HttpRepository::new(HttpClient::new(client), base_url, runtime.temp_dir());

        Ok(Self {
            runtime,
            repository,
            extractor: TarXzExtractor,
            layout,
        })
    }
}

/// First line of the config file.
fn read_repo_url<R: Runtime>(runtime: &R, path: &Path) -> Result<String> {
    let content = runtime
        .read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let url = content.lines().next().unwrap_or("").trim();
    if url.is_empty() {
        anyhow::bail!("No repository URL in {}", path.display());
    }
    Ok(url.to_string())
}
