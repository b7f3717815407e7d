//! lilcontainer CLI
//!
//! Runs a command in new namespaces under a process-count limit.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::process;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command-line arguments
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.kind() == ErrorKind::InvalidSubcommand => {
            eprintln!("❌ Error: unknown command");
            eprintln!("{}", Cli::command().render_usage());
            process::exit(2);
        }
        Err(e) => e.exit(),
    };

    init_logging(cli.verbose);

    // Execute the command
    match commands::dispatch(cli.command).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            process::exit(exit_code_for(&e));
        }
    }
}

/// Log to stderr; stdout belongs to the contained command
///
/// `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit code for a failed command, taken from the typed error if any
fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<lil_core::Error>())
        .map_or(1, lil_core::Error::exit_code)
}
