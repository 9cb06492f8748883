//! Configuration parsing and component loading for LoomQL
//!
//! This crate handles parsing of YAML configuration files, validation,
//! environment variable substitution, and discovery of the schema fragments
//! and resolver sources each component contributes.

pub mod env;
pub mod loader;
pub mod validator;
pub mod yaml;

pub use loader::ComponentLoader;
pub use validator::ConfigValidator;
pub use yaml::YamlParser;

use loomql_core::{CompiledSchema, LoomError, Model, ResolverRegistry};
use std::path::Path;

/// Parse a configuration file from a path
pub fn parse_file(path: &str) -> Result<Model, LoomError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| LoomError::Config(format!("Failed to read file '{}': {}", path, e)))?;

    parse_string(&content)
}

/// Parse a configuration from a string
pub fn parse_string(content: &str) -> Result<Model, LoomError> {
    let model = YamlParser::parse(content)?;

    let validator = ConfigValidator::new();
    validator.validate(&model)?;

    Ok(model)
}

/// Load every component of `model`, in order, relative to `base_dir`
pub fn load_components(
    model: &Model,
    base_dir: &Path,
    registry: &ResolverRegistry,
) -> Result<CompiledSchema, LoomError> {
    let mut loader = ComponentLoader::new(registry);
    for component in yaml::effective_components(model) {
        loader.load_component(base_dir, &component)?;
    }
    Ok(loader.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_simple_config() {
        let yaml = r#"
name: books-api
components:
  - path: ./books
    schemas: "*.graphql"
"#;
        let model = parse_string(yaml).unwrap();
        assert_eq!(model.name, "books-api");
        assert_eq!(model.components.len(), 1);
    }

    #[test]
    fn test_parse_string_validates() {
        assert!(parse_string("name: Books API\ncomponents: [./books]\n").is_err());
        assert!(parse_string("name: books-api\n").is_err());
    }

    #[test]
    fn test_load_components_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("books")).unwrap();
        std::fs::create_dir_all(dir.path().join("authors")).unwrap();
        std::fs::write(
            dir.path().join("books/schema.graphql"),
            "type Query { books: [String] }\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("authors/schema.graphql"),
            "extend type Query { authors: [String] }\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("authors/authors.resolvers.json"),
            r#"{"Query": {"authors": ["Herbert"]}}"#,
        )
        .unwrap();

        let config_path = dir.path().join("loomql.yaml");
        std::fs::write(
            &config_path,
            "name: library\ncomponents:\n  - ./books\n  - ./authors\n",
        )
        .unwrap();

        let model = parse_file(config_path.to_str().unwrap()).unwrap();
        let schema = load_components(&model, dir.path(), &ResolverRegistry::new()).unwrap();

        assert_eq!(
            schema.schema_sources(),
            &["/books/schema.graphql", "/authors/schema.graphql"]
        );
        assert!(schema.resolvers().contains("Query", "authors"));
    }

    #[test]
    fn test_parse_missing_file() {
        let err = parse_file("/definitely/not/here/loomql.yaml").unwrap_err();
        assert!(matches!(err, LoomError::Config(_)));
    }
}
