//! confpub CLI - Confluence page tree publisher.
//!
//! Provides commands for:
//! - `publish`: Publish the configured page tree (`--dry-run` for a local preview)
//! - `validate`: Check the configuration and print the effective page tree

mod commands;
mod error;
mod output;

use std::error::Error as _;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{PublishArgs, ValidateArgs};
use error::CliError;
use output::Output;

/// confpub - Confluence page tree publisher.
#[derive(Parser)]
#[command(name = "confpub", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the configured page tree.
    Publish(PublishArgs),
    /// Validate the configuration without contacting any backend.
    Validate(ValidateArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let verbose = matches!(&cli.command, Commands::Publish(args) if args.verbose);
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Publish(args) => tokio::runtime::Runtime::new()
            .map_err(CliError::from)
            .and_then(|rt| rt.block_on(args.execute())),
        Commands::Validate(args) => args.execute(),
    };

    if let Err(err) = result {
        report(&output, &err);
        std::process::exit(1);
    }
}

/// Print an error with its causes, skipping causes already in the message.
fn report(output: &Output, err: &CliError) {
    let mut message = err.to_string();
    output.error(&format!("Error: {message}"));

    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            output.error(&format!("  caused by: {text}"));
            message = text;
        }
        source = cause.source();
    }
}
