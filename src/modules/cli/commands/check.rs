//! Check command implementation

use clap::Args;
use loomql_core::{LoomError, ResolverRegistry};
use loomql_runtime::build_schema;
use tracing::info;

/// Check command arguments
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// List every schema fragment and resolver source
    #[arg(short, long)]
    pub list: bool,
}

impl CheckCommand {
    /// Execute the check command
    pub fn execute(&self, config_path: &str, registry: &ResolverRegistry) -> Result<(), LoomError> {
        info!("Checking configuration: {}", config_path);

        let (model, compiled) = super::load(config_path, registry)?;
        build_schema(&compiled, &model.graphql_config())?;

        println!(
            "✓ {}: {} schema fragments, {} resolvers",
            model.name,
            compiled.schema_sources().len(),
            compiled.resolvers().len()
        );

        if self.list {
            for source in compiled.schema_sources() {
                println!("  schema    {}", source);
            }
            for source in compiled.resolver_sources() {
                println!("  resolvers {}", source);
            }
            for name in compiled.resolvers().qualified_names() {
                println!("  field     {}", name);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_rejects_schema_without_query() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("schema.graphql"), "type Book { title: String }\n").unwrap();
        let config = dir.path().join("loomql.yaml");
        std::fs::write(&config, "name: books\ncomponents: [.]\n").unwrap();

        let err = CheckCommand { list: false }
            .execute(config.to_str().unwrap(), &ResolverRegistry::new())
            .unwrap_err();
        assert!(matches!(err, LoomError::SchemaBuild(_)));
    }
}
