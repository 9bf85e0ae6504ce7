//! tablock: cross-process locking for shared table files.
//!
//! This is the main entry point for the `tablock` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod cli;
mod commands;

use cli::Cli;
use std::process::ExitCode;
use tablock::exit_codes;

/// Install a stderr subscriber; `RUST_LOG=tablock=debug` shows the protocol steps.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse_args();

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);
            if err.is_timeout() {
                eprintln!("Hint: run `tablock status <file>` to inspect the lock file.");
            }

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
