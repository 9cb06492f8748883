//! Component directory configuration

use serde::{Deserialize, Serialize};

/// One component directory contributing schema fragments and resolvers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Component root, relative to the configuration file
    #[serde(default = "default_path")]
    pub path: String,

    /// Resolver module specifier (registry key or `*.resolvers.json` file)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolvers: Option<String>,

    /// Glob pattern selecting schema files, relative to `path`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<String>,

    /// Cache store URL overriding the global cache configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,

    /// Plain HTTP port for the GraphQL route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// HTTPS port for the GraphQL route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_port: Option<u16>,
}

fn default_path() -> String {
    ".".to_string()
}

impl ComponentConfig {
    /// Create a component rooted at `path` that discovers every file under it
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            resolvers: None,
            schemas: None,
            cache: None,
            port: None,
            secure_port: None,
        }
    }

    /// Set the resolver module specifier
    pub fn with_resolvers(mut self, resolvers: impl Into<String>) -> Self {
        self.resolvers = Some(resolvers.into());
        self
    }

    /// Set the schema glob pattern
    pub fn with_schemas(mut self, schemas: impl Into<String>) -> Self {
        self.schemas = Some(schemas.into());
        self
    }

    /// Returns true if the component names its resolvers/schemas explicitly
    /// instead of relying on whole-tree discovery
    pub fn is_directory_mode(&self) -> bool {
        self.resolvers.is_some() || self.schemas.is_some()
    }
}
