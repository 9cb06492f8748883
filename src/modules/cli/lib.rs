//! LoomQL CLI
//!
//! This crate provides the command-line interface for LoomQL including:
//! - run: Start the server
//! - check: Load and compile the schema without serving
//! - export: Write the assembled SDL
//! - init: Initialize a new LoomQL project
//!
//! Binaries that ship compiled resolver modules call [`run_with_registry`]
//! with their own [`ResolverRegistry`].

pub mod commands;

pub use commands::{Cli, Commands};

use clap::Parser;
use loomql_core::{LoomError, ResolverRegistry};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Parse the command line and run the selected command
pub async fn run_with_registry(registry: ResolverRegistry) -> Result<(), LoomError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone();
    match cli.command {
        Commands::Run(cmd) => {
            cmd.execute(&config_path, &registry).await?;
        }
        Commands::Check(cmd) => {
            cmd.execute(&config_path, &registry)?;
        }
        Commands::Export(cmd) => {
            cmd.execute(&config_path, &registry)?;
        }
        Commands::Init(cmd) => {
            cmd.execute()?;
        }
        Commands::Completion(cmd) => {
            cmd.execute();
        }
    }

    Ok(())
}

/// Install the global subscriber; `RUST_LOG` overrides the default level
fn init_logging(verbose: bool) {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
