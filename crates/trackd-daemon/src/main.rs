//! trackd - VR tracking-device daemon
//!
//! Loads a device configuration, starts every configured device and logs the
//! aggregated tracking state until interrupted.

#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod status;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trackd_config::ConfigFile;
use trackd_devices::{DeviceDaemon, DeviceRegistry};

use crate::status::StatusReport;

#[derive(Debug, Parser)]
#[command(name = "trackd")]
#[command(about = "VR tracking-device daemon")]
#[command(version)]
struct Cli {
    /// Device configuration file (YAML)
    #[arg(short, long, env = "TRACKD_CONFIG", value_name = "FILE")]
    config: PathBuf,

    /// Verbose logging; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Seconds between status reports
    #[arg(long, default_value_t = 5, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    status_interval: u64,

    /// Print status reports as JSON with the full device state
    #[arg(long)]
    json: bool,
}

fn log_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("trackd={level},trackd_devices={level},trackd_manager={level},warn")
}

fn init_logging(verbose: u8) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter(verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .init();
}

fn report(daemon: &DeviceDaemon, json: bool) -> Result<()> {
    let report = StatusReport::collect(daemon.manager(), json);
    if json {
        println!("{}", serde_json::to_string(&report).context("failed to serialize status")?);
    } else {
        info!("{}", report.line());
    }
    Ok(())
}

/// Build and start every device off the async runtime; handshakes and
/// stream-mode commands block on serial and network I/O.
async fn launch(config: ConfigFile, registry: DeviceRegistry) -> Result<DeviceDaemon> {
    tokio::task::spawn_blocking(move || -> Result<DeviceDaemon> {
        let mut daemon =
            DeviceDaemon::from_config(&config, &registry).context("failed to set up devices")?;
        daemon.start_all().context("failed to start devices")?;
        Ok(daemon)
    })
    .await
    .context("device startup task failed")?
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting trackd");

    let config = ConfigFile::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let mut daemon = launch(config, DeviceRegistry::new()).await?;

    let mut ticker = tokio::time::interval(Duration::from_secs(cli.status_interval));
    ticker.tick().await;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("Shutdown requested");
                break;
            }
            _ = ticker.tick() => report(&daemon, cli.json)?,
        }
    }

    tokio::task::spawn_blocking(move || daemon.stop_all())
        .await
        .context("shutdown task failed")?
        .context("failed to stop devices")?;
    info!("trackd stopped");
    Ok(())
}
