//! Roundtable Server
//!
//! Streams scripted team conversations to browsers over server-sent events,
//! one run at a time.

mod api;
mod config;
mod history;
mod scenarios;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use history::HistoryStore;
use roundtable_core::config::ConfigStore;
use roundtable_core::events::transcript_channel;
use roundtable_core::hub::Hub;
use roundtable_core::lifecycle::RunController;
use roundtable_core::monitor::LivenessMonitor;
use scenarios::{ScenarioCatalog, ScriptedProducer};
use server::{build_router, run_server};
use shutdown::{graceful_shutdown, spawn_config_reload_handler, stop_active_run};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Roundtable - live broadcast of scripted team conversations
#[derive(Parser, Debug)]
#[command(name = "roundtable-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "ROUNDTABLE_CONFIG", default_value = "./roundtable.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:8000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting roundtable-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Core components
    let hub = Hub::new(config.hub);
    let scenarios = Arc::new(ScenarioCatalog::builtin());
    let (transcript_tx, transcript_rx) = transcript_channel();
    let producer = ScriptedProducer::new(Arc::clone(&scenarios), config.step_delay);
    let controller = RunController::new(
        hub.clone(),
        Arc::new(producer),
        Some(transcript_tx),
        config.controller,
    );
    let history = HistoryStore::new(&config.history_dir);

    // Background processors
    let monitor_config_store = ConfigStore::new(config.monitor);
    let monitor_handle = tokio::spawn(LivenessMonitor::new(hub.clone()).run(
        shutdown_rx.clone(),
        monitor_config_store.clone(),
        monitor_config_store.subscribe(),
    ));
    let history_handle = tokio::spawn(history.clone().run(transcript_rx, shutdown_rx.clone()));
    let reload_handle =
        spawn_config_reload_handler(config_loader, monitor_config_store, shutdown_rx.clone());

    let state = AppState::new(
        hub,
        controller.clone(),
        history,
        scenarios,
        shutdown_rx,
    );
    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", config.listen);
    let result = run_server(
        router,
        config.listen,
        graceful_shutdown(
            controller.clone(),
            config.controller.stop_grace,
            Arc::clone(&shutdown_tx),
        ),
    )
    .await;

    // Also reached when the server failed to start.
    stop_active_run(&controller, config.controller.stop_grace).await;
    shutdown_tx.send_replace(true);

    for (name, handle) in [
        ("liveness monitor", monitor_handle),
        ("history writer", history_handle),
        ("config reload handler", reload_handle),
    ] {
        if let Err(e) = handle.await {
            tracing::error!(task = name, error = %e, "Background task failed");
        }
    }

    tracing::info!("Server shutdown complete");
    result.map_err(Into::into)
}

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "info";

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
