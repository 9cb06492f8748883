//! Run command implementation

use clap::Args;
use loomql_core::{LoomError, ResolverRegistry};
use loomql_runtime::Runtime;
use std::path::Path;
use tracing::info;

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Override server port
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl RunCommand {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        registry: &ResolverRegistry,
    ) -> Result<(), LoomError> {
        info!("Loading configuration from: {}", config_path);

        let mut runtime = Runtime::load(Path::new(config_path), registry, self.port).await?;
        runtime.run().await?;

        Ok(())
    }
}
