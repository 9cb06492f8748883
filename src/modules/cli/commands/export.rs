//! Export command implementation
//!
//! Writes the assembled schema document (built-in definitions followed by
//! every discovered fragment) to a file or stdout.

use clap::Args;
use loomql_core::{LoomError, ResolverRegistry};
use std::fs;
use std::path::Path;
use tracing::info;

/// Export command arguments
#[derive(Args, Debug)]
pub struct ExportCommand {
    /// Output file; stdout when omitted
    #[arg(short = 'o', long)]
    pub out: Option<String>,
}

impl ExportCommand {
    /// Execute the export command
    pub fn execute(&self, config_path: &str, registry: &ResolverRegistry) -> Result<(), LoomError> {
        let (_, compiled) = super::load(config_path, registry)?;

        match &self.out {
            Some(out) => {
                let out_path = Path::new(out);
                if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::write(out_path, compiled.sdl())?;
                info!(
                    "Wrote {} ({} schema fragments)",
                    out_path.display(),
                    compiled.schema_sources().len()
                );
            }
            None => print!("{}", compiled.sdl()),
        }

        Ok(())
    }
}
