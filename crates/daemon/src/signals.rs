//! Signal handling (§4.15, `server/sig.cpp`): SIGUSR1 reload, SIGINT exit,
//! SIGPIPE ignored.
//!
//! Realized as a dedicated Tokio task rather than a raw `sigwaitinfo`
//! thread, since a Tokio runtime is already in use throughout the daemon
//! (§5 "Signals").

use std::path::PathBuf;
use std::sync::Arc;

use crate::index::IndexSlot;

/// Runs until SIGINT is received, reloading `slot` from `default_index_path`
/// on every SIGUSR1. Returns when the process should exit.
#[cfg(unix)]
pub async fn run(slot: Arc<IndexSlot>, default_index_path: PathBuf) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigusr1 = match signal(SignalKind::user_defined1()) {
        Ok(stream) => stream,
        Err(error) => {
            tracing::error!(%error, "failed to install SIGUSR1 handler");
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(error) => {
            tracing::error!(%error, "failed to install SIGINT handler");
            return;
        }
    };
    // Rust does not ignore SIGPIPE by default the way a C daemon would;
    // without a handler a client disconnecting mid-write kills the process.
    let mut sigpipe = match signal(SignalKind::pipe()) {
        Ok(stream) => stream,
        Err(error) => {
            tracing::error!(%error, "failed to install SIGPIPE handler");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = sigusr1.recv() => {
                tracing::info!("SIGUSR1 received, reloading index");
                if let Err(error) = slot.reload(&default_index_path).await {
                    match error.severity() {
                        core::error::Severity::Informational => tracing::info!(%error, "signal-triggered reload skipped"),
                        _ => tracing::warn!(%error, "signal-triggered reload failed"),
                    }
                }
            }
            _ = sigpipe.recv() => {}
            _ = sigint.recv() => {
                tracing::info!("SIGINT received, exiting");
                return;
            }
        }
    }
}

#[cfg(not(unix))]
/// On non-Unix targets there is no SIGUSR1/SIGINT distinction to wire up;
/// this task simply waits for Ctrl-C.
pub async fn run(_slot: Arc<IndexSlot>, _default_index_path: PathBuf) {
    let _ = tokio::signal::ctrl_c().await;
}
