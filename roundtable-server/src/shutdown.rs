//! Signal handling for graceful shutdown and config reload.

use crate::config::ConfigLoader;
use roundtable_core::config::ConfigStore;
use roundtable_core::lifecycle::RunController;
use roundtable_core::monitor::MonitorConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Completes when SIGTERM or SIGINT (Ctrl+C) is received.
pub async fn shutdown_signal() {
    let sigterm = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    let sigint = async {
        match signal(SignalKind::interrupt()) {
            Ok(mut sigint) => {
                sigint.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGINT handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = sigterm => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

/// Stop the active run, if any, and wait for it to be finalized.
///
/// Waits at most a little longer than the stop grace period, after which
/// the controller has aborted the producer anyway.
pub async fn stop_active_run(controller: &RunController, stop_grace: Duration) {
    if controller.stop() {
        tracing::info!("Stopping active run before shutdown");
    }
    let deadline = stop_grace + Duration::from_secs(1);
    if tokio::time::timeout(deadline, controller.wait_idle()).await.is_err() {
        tracing::warn!(?deadline, "Active run did not finish before shutdown");
    }
}

/// The graceful-shutdown future of the HTTP server.
///
/// After a signal, the active run is stopped first so its transcript
/// reaches the history writer; then every background task and event
/// stream is told to finish.
pub async fn graceful_shutdown(
    controller: RunController,
    stop_grace: Duration,
    shutdown_tx: Arc<watch::Sender<bool>>,
) {
    shutdown_signal().await;
    stop_active_run(&controller, stop_grace).await;
    shutdown_tx.send_replace(true);
}

/// Spawns a task that listens for SIGHUP and reloads the configuration.
///
/// Only the monitor settings take effect without a restart.
pub fn spawn_config_reload_handler(
    config_loader: Arc<ConfigLoader>,
    monitor_config_store: ConfigStore<MonitorConfig>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(sighup) => sighup,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGHUP handler, config reload disabled");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    tracing::info!("Received SIGHUP, reloading configuration");
                    match config_loader.reload() {
                        Ok(loaded_config) => {
                            monitor_config_store.update(loaded_config.monitor).await;
                            tracing::info!(
                                version = monitor_config_store.version(),
                                "Monitor configuration reloaded; other sections apply on restart"
                            );
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload configuration: {}", e);
                        }
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::debug!("Config reload handler shutting down");
                        break;
                    }
                }
            }
        }
    })
}
