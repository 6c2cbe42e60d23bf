use anyhow::Result;
use braden::commands::{self, config::ConfigOptions};
use clap::Parser;
use std::path::PathBuf;

/// braden - minimal package manager
///
/// Installs, updates and uninstalls packages from a single HTTP repository.
/// The repository URL is read from the first line of the config file
/// (/etc/braden.conf by default) unless --repo-url is given.
///
/// Examples:
///   braden install curl     # Install curl and its missing dependencies
///   braden update curl      # Reinstall curl if the repository has another version
///   braden uninstall curl   # Remove curl's files and version marker
#[derive(Parser, Debug)]
#[command(author, version = env!("BRADEN_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file whose first line is the repository URL
    #[arg(
        long = "config",
        short = 'c',
        env = "BRADEN_CONFIG",
        value_name = "PATH",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// Repository URL (overrides the config file)
    #[arg(long = "repo-url", env = "BRADEN_REPO_URL", value_name = "URL", global = true)]
    pub repo_url: Option<String>,

    /// Directory archives are unpacked onto (defaults to /)
    #[arg(
        long = "root",
        short = 'r',
        env = "BRADEN_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub root: Option<PathBuf>,

    /// Directory holding version markers and manifests (defaults to <root>/usr/local)
    #[arg(long = "state-dir", value_name = "PATH", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Directory holding downloaded archives (defaults to the working directory)
    #[arg(long = "cache-dir", value_name = "PATH", global = true)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install a package and its missing dependencies
    Install(PackageArgs),

    /// Reinstall a package when the repository version differs
    Update(PackageArgs),

    /// Remove an installed package
    Uninstall(PackageArgs),
}

#[derive(clap::Args, Debug)]
pub struct PackageArgs {
    /// Package name
    #[arg(value_name = "PACKAGE")]
    pub package: String,
}

impl Cli {
    fn options(&self) -> ConfigOptions {
        ConfigOptions {
            config_path: self.config.clone(),
            repo_url: self.repo_url.clone(),
            root: self.root.clone(),
            state_dir: self.state_dir.clone(),
            cache_dir: self.cache_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = braden::runtime::RealRuntime;
    let options = cli.options();

    match cli.command {
        Commands::Install(args) => commands::install(runtime, &args.package, options).await?,
        Commands::Update(args) => commands::update(runtime, &args.package, options).await?,
        Commands::Uninstall(args) => commands::uninstall(runtime, &args.package, options)?,
    }
    Ok(())
}
