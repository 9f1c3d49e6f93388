#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Structured logging initialization shared by `prefix-indexer` and
//! `prefix-matchd`. Every subsystem in the daemon (dispatcher, query
//! handler, hot-swap, admin surface) emits `tracing` events instead of ad
//! hoc `eprintln!`; this crate is only the one-time install of a
//! `tracing_subscriber` layer driven by the `verbose`/`log_level`/`log_path`
//! configuration keys (§6 of the specification this crate implements).
//!
//! # Design
//!
//! `verbose` is a repeat-count (`-v`, `-vv`, ...) the same way the original
//! C daemon treats it, mapped here onto a [`tracing::Level`]. A `log_path`
//! redirects output to a file opened in append mode; without one, output
//! goes to stderr, matching the original's default of logging to the
//! controlling terminal until daemonized.

use std::fs::OpenOptions;
use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Maps a `-v` repeat count (or the `verbose=` config key) onto a
/// [`tracing::Level`].
///
/// `0` is `WARN` (the original's default of logging only errors and
/// warnings), `1` is `INFO`, `2` is `DEBUG`, and `3` or more is `TRACE`.
#[must_use]
pub fn level_for_verbosity(verbose: u8) -> tracing::Level {
    match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Installs the global `tracing` subscriber.
///
/// Called exactly once at start-up by both binaries. `log_path` is the
/// optional `log_path` configuration key; when present, it is opened in
/// append mode and every event is written there instead of stderr.
///
/// # Errors
///
/// Returns the [`std::io::Error`] from opening `log_path`, if given.
pub fn init(verbose: u8, log_path: Option<&Path>) -> std::io::Result<()> {
    let level = level_for_verbosity(verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    match log_path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_writer(file).with_ansi(false).init();
        }
        None => {
            builder.init();
        }
    }
    Ok(())
}
