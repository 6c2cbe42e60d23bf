use anyhow::{Context, Result};
use log::debug;

use crate::{
    application::{InstallReport, PackageManager, UpdateOutcome},
    archive::TarXzExtractor,
    repository::HttpRepository,
    runtime::Runtime,
};

pub mod config;

use config::{Config, ConfigOptions};

#[tracing::instrument(skip(runtime, options))]
pub async fn install<R: Runtime + 'static>(
    runtime: R,
    name: &str,
    options: ConfigOptions,
) -> Result<()> {
    let config = Config::new(runtime, options)?;
    let manager = package_manager(&config);
    let report = manager
        .install(name)
        .await
        .with_context(|| format!("Failed to install {}", name))?;
    print_report(&report);
    Ok(())
}

#[tracing::instrument(skip(runtime, options))]
pub async fn update<R: Runtime + 'static>(
    runtime: R,
    name: &str,
    options: ConfigOptions,
) -> Result<()> {
    let config = Config::new(runtime, options)?;
    let manager = package_manager(&config);
    let outcome = manager
        .update(name)
        .await
        .with_context(|| format!("Failed to update {}", name))?;

    match outcome {
        UpdateOutcome::Installed(report) => print_report(&report),
        UpdateOutcome::UpToDate { version } => {
            println!("{} is up to date ({}).", name, version.trim());
        }
        UpdateOutcome::Updated { from, to, report } => {
            print_report(&report);
            println!("Updated {} from {} to {}.", name, from.trim(), to.trim());
        }
    }
    Ok(())
}

#[tracing::instrument(skip(runtime, options))]
pub fn uninstall<R: Runtime + 'static>(runtime: R, name: &str, options: ConfigOptions) -> Result<()> {
    let config = Config::new(runtime, options)?;
    let manager = package_manager(&config);
    let removed = manager
        .uninstall(name)
        .with_context(|| format!("Failed to uninstall {}", name))?;
    debug!("Removed {} path(s) of {}", removed.len(), name);
    println!("Uninstalled {}.", name);
    Ok(())
}

fn package_manager<R: Runtime + 'static>(
    config: &Config<R>,
) -> PackageManager<'_, R, HttpRepository, TarXzExtractor> {
    PackageManager::new(
        &config.runtime,
        &config.repository,
        &config.extractor,
        config.layout.clone(),
    )
}

fn print_report(report: &InstallReport) {
    for package in &report.installed {
        println!("Installed {} {}.", package.name, package.version.trim());
    }
}
