//! Adaptive Signal Phase Controller (aspc-ctl) - Main entry point
//!
//! Loads configuration, opens the command channel, starts a controller for
//! every configured junction and serves the HTTP/SSE API until shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use aspc_common::config::{resolve_config_path, CONFIG_ENV_VAR};
use aspc_common::events::EventBus;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aspc_ctl::api::{self, AppContext};
use aspc_ctl::channel::open_channel;
use aspc_ctl::config::{ChannelBackend, Config};
use aspc_ctl::runtime::{JunctionRegistry, RuntimeSettings};
use aspc_ctl::simulation::spawn_simulator;

/// Command-line arguments for aspc-ctl
#[derive(Parser, Debug)]
#[command(name = "aspc-ctl")]
#[command(about = "Adaptive signal phase controller")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "ASPC_PORT")]
    port: Option<u16>,

    /// Use the SQLite command store at this path (overrides config)
    #[arg(long, env = "ASPC_COMMAND_DB")]
    command_db: Option<PathBuf>,

    /// Enable the synthetic demand generator
    #[arg(long)]
    simulate: bool,

    /// Seed for the demand generator
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing starts so its log level can apply;
    // load_toml's own messages are emitted without a subscriber and lost.
    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let mut config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    // A bare level applies to this crate; a full directive string is used as given
    let level = config.logging.level.trim();
    let default_filter = if level.contains('=') {
        level.to_string()
    } else {
        format!("aspc_ctl={},tower_http=info", level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Command-line overrides
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(db) = args.command_db {
        config.channel.backend = ChannelBackend::Sqlite;
        config.channel.db_path = db;
    }
    if args.simulate {
        config.simulation.enabled = true;
    }
    if args.seed.is_some() {
        config.simulation.seed = args.seed;
    }

    info!(
        "Starting aspc-ctl v{} ({}) on port {}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        config.port
    );
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file, using defaults"),
    }

    let channel = open_channel(&config.channel)
        .await
        .context("Failed to open command channel")?;
    let event_bus = EventBus::new(config.event_bus_capacity);

    let registry = Arc::new(JunctionRegistry::new(
        config.junctions.clone(),
        config.tuning.clone(),
        RuntimeSettings {
            tick_interval: config.tick_interval(),
            poll_timeout: config.poll_timeout(),
        },
        channel,
        event_bus.clone(),
    ));

    for junction_id in &config.junctions {
        if let Err(e) = registry.start_observation(junction_id).await {
            warn!("Could not start junction {}: {}", junction_id, e);
        }
    }
    info!("Observing {} junction(s)", registry.observed_junctions().await.len());

    let background = CancellationToken::new();
    let simulator = if config.simulation.enabled {
        Some(spawn_simulator(
            Arc::clone(&registry),
            &config.simulation,
            background.clone(),
        ))
    } else {
        None
    };

    let ctx = AppContext::new(Arc::clone(&registry), event_bus);
    api::run(config.port, ctx, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    background.cancel();
    if let Some(handle) = simulator {
        if let Err(e) = handle.await {
            warn!("Demand simulator ended abnormally: {}", e);
        }
    }
    registry.stop_all().await;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
