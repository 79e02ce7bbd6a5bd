//! unbound-blocklist - Entry point.
//!
//! Regenerates the Unbound blocklist configuration, checks it and restarts
//! Unbound. Meant to be run periodically, e.g. from cron or a systemd timer.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use unbound_blocklist::config::Config;
use unbound_blocklist::pipeline::Pipeline;
use unbound_blocklist::service::SystemCommandRunner;

/// Regenerate Unbound's blocklist from remote hosts files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Write to the supplied path and don't check or restart Unbound
    #[arg(long, value_name = "PATH")]
    dry_run: Option<PathBuf>,
}

fn load_config() -> Result<Config> {
    match std::env::var_os("CONFIG_PATH") {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.to_string_lossy())),
        None => Ok(Config::default()),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config()?;

    info!("Allow patterns: {}", config.allow_patterns_url);
    info!("Deny-list sources configured: {}", config.deny_hosts_urls.len());

    let pipeline =
        Pipeline::new(config, SystemCommandRunner).context("Failed to create HTTP client")?;
    let report = pipeline
        .run(cli.dry_run.as_deref())
        .await
        .context("Failed to update blocklist")?;

    info!(
        "Wrote {} zones to {}",
        report.directives(),
        report.destination.display()
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
