//! Thin CLI entry point; all logic lives in the `daemon` library crate.

use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stderr = std::io::stderr();
    let status = daemon::run(std::env::args_os(), &mut stderr);
    daemon::exit_code_from(status)
}
