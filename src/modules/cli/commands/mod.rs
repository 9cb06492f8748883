//! CLI commands

mod check;
mod completion;
mod export;
mod init;
mod run;

pub use check::CheckCommand;
pub use completion::CompletionCommand;
pub use export::ExportCommand;
pub use init::InitCommand;
pub use run::RunCommand;

use clap::{Parser, Subcommand};
use loomql_core::{CompiledSchema, LoomError, Model, ResolverRegistry};
use std::path::Path;

/// LoomQL - GraphQL services assembled from schema fragments
#[derive(Parser, Debug)]
#[command(name = "loomql")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    ///
    /// This is a *global* option so it can be specified after subcommands,
    /// e.g. `loomql run -f api.yaml`.
    #[arg(short = 'f', long = "file", global = true, default_value = "loomql.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the LoomQL server
    Run(RunCommand),

    /// Load and compile the schema, then exit
    Check(CheckCommand),

    /// Write the assembled schema document
    Export(ExportCommand),

    /// Initialize a new LoomQL project
    Init(InitCommand),

    /// Generate shell completions
    #[command(hide = true)]
    Completion(CompletionCommand),
}

/// Parse a config file and assemble its components
pub(crate) fn load(
    config_path: &str,
    registry: &ResolverRegistry,
) -> Result<(Model, CompiledSchema), LoomError> {
    let model = loomql_parser::parse_file(config_path)?;
    let base_dir = Path::new(config_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let compiled = loomql_parser::load_components(&model, base_dir, registry)?;
    Ok((model, compiled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["loomql", "run"]).unwrap();
        assert_eq!(cli.config, "loomql.yaml");
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::try_parse_from(["loomql", "check", "-f", "custom.yaml", "-v"]).unwrap();
        assert_eq!(cli.config, "custom.yaml");
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["loomql"]).is_err());
    }
}
