//! uplink daemon entrypoint
//!
//! Initializes the config and event log collaborators (both fatal on
//! failure), starts the background interface monitor, and runs the
//! connection loop until the process is told to stop. Connectivity and
//! protocol faults never reach the exit code; they are logged and retried.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uplink_core::config::{DEFAULT_CONFIG_PATH, DEFAULT_LOG_PATH};
use uplink_core::{Config, EventLog, Level, LinkState};
use uplinkd::probe::{PingProbe, ReachabilityProbe};
use uplinkd::{InterfaceMonitor, Orchestrator};

#[derive(Parser)]
#[command(name = "uplinkd")]
#[command(about = "Keeps a device reachable over two interfaces and opens remote shell sessions")]
#[command(version)]
struct Args {
    /// Path to the key:value configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the connection event log
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Diagnostic log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize diagnostics
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("uplinkd starting...");

    // Both collaborators are fatal at startup; nothing past this point is.
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let log_path = args.log.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH));
    let log = Arc::new(
        EventLog::open(&log_path)
            .with_context(|| format!("failed to open event log at {}", log_path.display()))?,
    );

    log.append(Level::Info, "initializing connection manager");
    tracing::info!(
        "monitoring interfaces {} and {}",
        config.ifname0,
        config.ifname1
    );

    let state = Arc::new(LinkState::new(&config.ifname0, &config.ifname1));

    let cancel = CancellationToken::new();
    let monitor = InterfaceMonitor::new(config.probe_interval, state.clone(), log.clone());
    let monitor_task = monitor.spawn(cancel.clone());

    let probe = ReachabilityProbe::new(
        PingProbe::new(config.probe_interval),
        config.probe_interval,
    );
    let mut orchestrator = Orchestrator::new(&config, state, log.clone(), probe);

    tokio::select! {
        _ = orchestrator.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    cancel.cancel();
    let _ = monitor_task.await;
    log.append(Level::Info, "connection manager stopped");

    Ok(())
}
