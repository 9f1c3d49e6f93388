#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `prefix-matchd`: the online half of the prefix-match service. Accepts
//! binary-protocol queries over TCP (and optionally a Unix domain socket),
//! romanizes and ranks results against a hot-swappable trie index, and
//! exposes a small HTTP admin surface for ad hoc queries and reloads.
//!
//! # Design
//!
//! The binary itself ([`bin/prefix-matchd.rs`](../src/bin/prefix-matchd.rs))
//! is a thin wrapper around [`run`]/[`exit_code_from`], matching the
//! `indexer` crate's and the teacher workspace's CLI split. [`run`] wires
//! together [`config::Config`], [`index::IndexSlot`], [`server::Dispatcher`],
//! [`admin`], and [`signals`] and then waits on whichever exits first.

pub mod admin;
pub mod config;
pub mod connection;
pub mod error;
pub mod index;
pub mod pidfile;
pub mod privileges;
pub mod query;
pub mod server;
pub mod signals;
pub mod unix_socket;

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::config::Config;
use crate::error::DaemonError;
use crate::index::IndexSlot;
use crate::server::Dispatcher;

/// Command-line arguments for `prefix-matchd` (§6 "Server CLI", §4.14).
#[derive(Debug, Parser)]
#[command(name = "prefix-matchd", version = core::version::VERSION, about = "Serves prefix-match queries over a hot-swappable trie index")]
struct Args {
    /// Path to the `key=value` configuration file.
    #[arg(short = 'f', long = "config", value_name = "FILE")]
    config: PathBuf,
    /// Run in the foreground instead of daemonizing (used by tests and by
    /// process supervisors that already manage the process lifecycle).
    #[arg(long)]
    foreground: bool,
}

/// Runs the `prefix-matchd` CLI against `arguments`. Returns a process exit
/// code: `0` on clean exit, non-zero on a start-up error (§6 "Exit codes").
pub fn run<I, S, Err>(arguments: I, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Err: Write,
{
    let args = match Args::try_parse_from(arguments) {
        Ok(args) => args,
        Err(clap_error) => {
            let _ = write!(stderr, "{clap_error}");
            return if clap_error.exit_code() == 0 { 0 } else { -1 };
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            let _ = writeln!(stderr, "failed to start async runtime: {error}");
            return -1;
        }
    };

    match runtime.block_on(serve(args)) {
        Ok(()) => 0,
        Err(error) => {
            debug_assert_eq!(error.severity(), core::error::Severity::Fatal, "every DaemonError variant is fatal at start-up");
            let _ = writeln!(stderr, "{error}");
            -1
        }
    }
}

async fn serve(args: Args) -> Result<(), DaemonError> {
    let config = Config::load(&args.config)?;
    config.validate()?;

    logging::init(config.verbose, config.log_path.as_deref()).ok();

    if !args.foreground {
        #[cfg(unix)]
        if let Some(username) = &config.username {
            privileges::drop_privileges(username)?;
        }
    }

    let _pidfile = config.pidfile.as_ref().map(|path| pidfile::PidFile::create(path)).transpose()?;

    let chinese_map_file = config.chinese_map_file.clone().expect("validated above");
    let index_file = config.index_file.clone().expect("validated above");
    let slot = Arc::new(IndexSlot::load(&chinese_map_file, &index_file)?);

    let dispatcher = Arc::new(Dispatcher::spawn(config.threads, Arc::clone(&slot), config.reqs_per_event, config.max_depth));

    let tcp_listener = server::bind_tcp_listener(config.port, config.backlog)?;
    tracing::info!(port = config.port, backlog = config.backlog, "listening on TCP");
    let accept_task = tokio::spawn(server::accept_loop(tcp_listener, Arc::clone(&dispatcher)));

    let unix_task = config.unixpath.clone().map(|path| {
        let slot = Arc::clone(&slot);
        let reqs_per_event = config.reqs_per_event;
        let max_depth = config.max_depth;
        tokio::spawn(async move {
            if let Err(error) = unix_socket::serve(&path, slot, reqs_per_event, max_depth).await {
                tracing::error!(%error, "unix socket listener exited");
            }
        })
    });

    let admin_task = if let Some(monitor_port) = config.monitor_port {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", monitor_port)).await?;
        tracing::info!(port = monitor_port, "admin HTTP listening");
        let slot = Arc::clone(&slot);
        let max_depth = config.max_depth;
        let default_index_path = index_file.clone();
        Some(tokio::spawn(admin::serve(listener, slot, max_depth, default_index_path)))
    } else {
        None
    };

    let signal_task = tokio::spawn(signals::run(Arc::clone(&slot), index_file.clone()));

    tokio::select! {
        _ = accept_task => {}
        _ = signal_task => {}
    }

    if let Some(task) = unix_task {
        task.abort();
    }
    if let Some(task) = admin_task {
        task.abort();
    }
    if let Some(path) = &config.unixpath {
        unix_socket::cleanup(path);
    }

    Ok(())
}

/// Clamps a process status code into a valid [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.rem_euclid(256);
    std::process::ExitCode::from(clamped as u8)
}
