//! Optional Unix domain socket listener (§4.15, config key `unixpath`).
//!
//! Reuses the same protocol state machine as the TCP listener
//! ([`crate::server`]'s `handle_connection`), just not routed through the
//! TCP dispatcher's worker-thread pool: each accepted connection is spawned
//! directly on the runtime that accepted it. Default permissions on the
//! socket path are world-writable, matching the upstream memcached-derived
//! behavior this daemon is descended from (no peer-credential check).

use std::path::Path;
use std::sync::Arc;

use tokio::net::UnixListener;

use crate::connection::BufferPool;
use crate::index::IndexSlot;

/// Binds `path` as a Unix domain socket listener and serves connections
/// from it forever.
///
/// # Errors
///
/// Returns [`std::io::Error`] if the path is already in use (stale sockets
/// are removed first) or cannot be bound.
pub async fn serve(path: &Path, slot: Arc<IndexSlot>, reqs_per_event: u32, max_depth: usize) -> std::io::Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let listener = UnixListener::bind(path)?;
    tracing::info!(path = %path.display(), "listening on unix domain socket");
    let pool = Arc::new(BufferPool::new());

    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let slot = Arc::clone(&slot);
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    if let Err(error) = crate::server::handle_connection(stream, &slot, &pool, reqs_per_event, max_depth).await {
                        tracing::debug!(%error, "unix connection error");
                    }
                });
            }
            Err(error) => tracing::warn!(%error, "unix accept failed"),
        }
    }
}

/// Removes a Unix socket path left behind by an unclean exit, if present.
pub fn cleanup(path: &Path) {
    if path.exists() {
        if let Err(error) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), %error, "failed to remove unix socket on shutdown");
        }
    }
}

