//! Init command implementation

use clap::Args;
use loomql_core::{ComponentConfig, LoomError, Model};
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::info;

const SCHEMA_FILE: &str = "schema.graphql";
const RESOLVERS_FILE: &str = "hello.resolvers.json";

const STARTER_SCHEMA: &str = r#"type Query {
  hello: String
  version: String @cacheControl(maxAge: 60)
}
"#;

/// Init command arguments
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Project name
    #[arg(default_value = "my-api")]
    pub name: String,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: String,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self) -> Result<(), LoomError> {
        info!("Initializing new LoomQL project: {}", self.name);

        let output_dir = Path::new(&self.output);
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let config_path = output_dir.join("loomql.yaml");
        if config_path.exists() {
            return Err(LoomError::Config(format!(
                "{} already exists",
                config_path.display()
            )));
        }

        fs::write(&config_path, self.generate_config()?)?;
        info!("Created: {}", config_path.display());

        let schema_path = output_dir.join(SCHEMA_FILE);
        fs::write(&schema_path, STARTER_SCHEMA)?;
        info!("Created: {}", schema_path.display());

        let resolvers_path = output_dir.join(RESOLVERS_FILE);
        fs::write(&resolvers_path, generate_resolvers()?)?;
        info!("Created: {}", resolvers_path.display());

        println!("\n✨ LoomQL project initialized!");
        println!("\nNext steps:");
        println!("  1. Add types to {} or drop more *.graphql files next to it", SCHEMA_FILE);
        println!("  2. Run: loomql check -f {}", config_path.display());
        println!("  3. Run: loomql run -f {}", config_path.display());

        Ok(())
    }

    fn generate_config(&self) -> Result<String, LoomError> {
        let model = Model::new(&self.name).with_component(
            ComponentConfig::new(".")
                .with_schemas("*.graphql")
                .with_resolvers(RESOLVERS_FILE),
        );
        let body = loomql_parser::yaml::to_yaml(&model)?;
        Ok(format!("# LoomQL configuration\n\n{}", body))
    }
}

fn generate_resolvers() -> Result<String, LoomError> {
    let document = json!({
        "Query": {
            "hello": "Hello from LoomQL",
            "version": env!("CARGO_PKG_VERSION"),
        }
    });
    Ok(serde_json::to_string_pretty(&document)? + "\n")
}
