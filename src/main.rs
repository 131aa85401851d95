//! # Lab Fleet CLI
//!
//! This is the binary entry point for the `labfleet` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Installing the Ctrl-C handler that cancels in-flight work.
//! - Translating errors into `labfleet: <message>` on stderr and an exit code.
//!
//! The core application logic is defined in the `lib.rs` library crate, ensuring
//! that the binary is a thin wrapper around the reusable library functionality.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use labfleet::cancel::CancelToken;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    cli.init_logging();
    let always_exit_zero = cli.always_exit_zero();

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        log::warn!("Cannot install Ctrl-C handler: {}", e);
    }

    match cli.execute(&cancel) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("labfleet: {:#}", e);
            if always_exit_zero {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
