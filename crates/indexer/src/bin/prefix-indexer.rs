#![deny(unsafe_code)]

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stderr = io::stderr().lock();
    let status = indexer::run(std::env::args_os(), &mut stderr);
    indexer::exit_code_from(status)
}
