//! Shared cancellation for a run.
//!
//! A single `watch` channel carries cancellation to every task. It flips to
//! `true` on SIGTERM/SIGINT or when the `--timeout` deadline passes.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

/// Create the shutdown channel and spawn the task that trips it.
pub fn install(timeout: Option<Duration>) -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = terminate_signal() => {
                info!("Received shutdown signal, cancelling outstanding updates");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, cancelling outstanding updates");
            }
            _ = deadline => {
                warn!(timeout = ?timeout, "Deadline reached, cancelling outstanding updates");
            }
        }

        let _ = shutdown_tx.send(true);
    });

    shutdown_rx
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}

/// Resolve once the run has been cancelled.
///
/// Never resolves if the sender is gone without having cancelled.
pub async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// A receiver that is never cancelled.
pub fn never() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    // Dropping the sender leaves the value at `false` for good.
    drop(shutdown_tx);
    shutdown_rx
}
