//! Root model configuration

use serde::{Deserialize, Serialize};

use super::types::{DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};
use super::{CacheConfig, ComponentConfig, GraphQLConfig, ServerConfig};

/// Root configuration model that represents a LoomQL configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Name of the service
    pub name: String,

    /// Component directories, in load order
    #[serde(default)]
    pub components: Vec<ComponentConfig>,

    /// Server configuration (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// GraphQL endpoint configuration (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphql: Option<GraphQLConfig>,

    /// Query cache configuration (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,
}

impl Model {
    /// Create a new empty model with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            server: None,
            graphql: None,
            cache: None,
        }
    }

    /// Add a component
    pub fn with_component(mut self, component: ComponentConfig) -> Self {
        self.components.push(component);
        self
    }

    /// Plain port for the GraphQL route; later components override earlier ones
    pub fn port(&self) -> u16 {
        self.components
            .iter()
            .rev()
            .find_map(|c| c.port)
            .or_else(|| self.server.as_ref().and_then(|s| s.port))
            .unwrap_or(DEFAULT_PORT)
    }

    /// Secure port for the GraphQL route, if any
    pub fn secure_port(&self) -> Option<u16> {
        self.components
            .iter()
            .rev()
            .find_map(|c| c.secure_port)
            .or_else(|| self.server.as_ref().and_then(|s| s.secure_port))
    }

    /// Cache store URL; later components override the global setting
    pub fn cache_url(&self) -> String {
        self.components
            .iter()
            .rev()
            .find_map(|c| c.cache.clone())
            .unwrap_or_else(|| self.cache_config().url().to_string())
    }

    /// Cache configuration with defaults
    pub fn cache_config(&self) -> CacheConfig {
        self.cache.clone().unwrap_or_default()
    }

    /// GraphQL configuration with defaults
    pub fn graphql_config(&self) -> GraphQLConfig {
        self.graphql.clone().unwrap_or_default()
    }

    /// Route intercepted by the GraphQL bridge
    pub fn route(&self) -> String {
        self.graphql_config().route().to_string()
    }

    /// Request body limit
    pub fn max_body_bytes(&self) -> usize {
        self.server
            .as_ref()
            .map(|s| s.max_body_bytes())
            .unwrap_or(DEFAULT_MAX_BODY_BYTES)
    }

    /// Get the log level, defaulting to 1 (INFO)
    pub fn log_level(&self) -> u8 {
        self.server
            .as_ref()
            .and_then(|s| s.log_level)
            .unwrap_or(1)
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new("loomql")
    }
}
