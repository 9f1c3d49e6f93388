//! Top-level daemon error type (§4.12, §7).
//!
//! Only [`ConfigError`](crate::config::ConfigError) is fatal at start-up
//! (§7 "Propagation"); every other category is handled where it occurs and
//! never reaches `main`.

use thiserror::Error;

use core::error::Severity;

use crate::config::ConfigError;
use crate::index::ReloadError;

/// A start-up failure, printed to stderr before a non-zero exit.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration was missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The initial index could not be loaded.
    #[error(transparent)]
    Reload(#[from] ReloadError),
    /// Binding a listener or writing the pidfile failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    /// Classifies this error per §7's severity taxonomy. Every variant here
    /// only ever occurs during start-up (see the module doc), so all three
    /// are fatal regardless of which one fired.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            DaemonError::Config(_) | DaemonError::Reload(_) | DaemonError::Io(_) => Severity::Fatal,
        }
    }
}
