//! Configuration validation

use loomql_core::{LoomError, Model};
use loomql_types::StoreKind;
use once_cell::sync::Lazy;
use regex::Regex;

/// Regex pattern for valid names (lower-kebab-case or lower_snake_case)
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(?:[-_][a-z0-9]+)*$").expect("valid name pattern")
});

/// Configuration validator
pub struct ConfigValidator {
    /// Whether to validate names strictly
    strict_names: bool,
}

impl ConfigValidator {
    /// Create a new validator with default settings
    pub fn new() -> Self {
        Self { strict_names: true }
    }

    /// Create a validator with lenient name checking
    pub fn lenient() -> Self {
        Self {
            strict_names: false,
        }
    }

    /// Validate the entire model configuration
    pub fn validate(&self, model: &Model) -> Result<(), LoomError> {
        self.validate_model_name(&model.name)?;
        self.validate_components(model)?;
        self.validate_server(model)?;
        self.validate_graphql(model)?;
        self.validate_cache(model)?;
        Ok(())
    }

    /// Validate the model name
    fn validate_model_name(&self, name: &str) -> Result<(), LoomError> {
        if name.is_empty() {
            return Err(LoomError::Validation(
                "Model name cannot be empty".to_string(),
            ));
        }

        if self.strict_names && !NAME_PATTERN.is_match(name) {
            return Err(LoomError::Validation(format!(
                "Invalid model name '{}': must be lower-kebab-case or lower_snake_case",
                name
            )));
        }

        Ok(())
    }

    /// Validate component entries
    fn validate_components(&self, model: &Model) -> Result<(), LoomError> {
        if model.components.is_empty() {
            return Err(LoomError::Validation(
                "At least one component is required".to_string(),
            ));
        }

        for (index, component) in model.components.iter().enumerate() {
            if component.path.trim().is_empty() {
                return Err(LoomError::Validation(format!(
                    "Component {} has an empty path",
                    index
                )));
            }

            if let Some(pattern) = &component.schemas {
                glob::Pattern::new(pattern).map_err(|e| {
                    LoomError::Validation(format!(
                        "Component '{}' has an invalid schema pattern '{}': {}",
                        component.path, pattern, e
                    ))
                })?;
            }

            if let Some(resolvers) = &component.resolvers {
                if resolvers.trim().is_empty() {
                    return Err(LoomError::Validation(format!(
                        "Component '{}' has an empty resolvers path",
                        component.path
                    )));
                }
            }

            if let Some(cache) = &component.cache {
                validate_cache_url(cache)?;
            }

            if let (Some(port), Some(secure)) = (component.port, component.secure_port) {
                if port == secure {
                    return Err(LoomError::Validation(format!(
                        "Component '{}' uses port {} for both plain and secure listeners",
                        component.path, port
                    )));
                }
            }
        }

        Ok(())
    }

    /// Validate listener configuration
    fn validate_server(&self, model: &Model) -> Result<(), LoomError> {
        let port = model.port();
        if let Some(secure_port) = model.secure_port() {
            let has_tls = model.server.as_ref().and_then(|s| s.tls.as_ref()).is_some();
            if !has_tls {
                return Err(LoomError::Validation(format!(
                    "secure_port {} requires server.tls (cert and key)",
                    secure_port
                )));
            }
            if secure_port == port {
                return Err(LoomError::Validation(format!(
                    "Plain and secure listeners cannot share port {}",
                    port
                )));
            }
        }

        if let Some(server) = &model.server {
            if let Some(tls) = &server.tls {
                if tls.cert.trim().is_empty() || tls.key.trim().is_empty() {
                    return Err(LoomError::Validation(
                        "server.tls requires both cert and key".to_string(),
                    ));
                }
            }

            if let Some(level) = server.log_level {
                if level > 3 {
                    return Err(LoomError::Validation(format!(
                        "Invalid log_level {}: must be 0-3",
                        level
                    )));
                }
            }

            if server.max_body_bytes == Some(0) {
                return Err(LoomError::Validation(
                    "server.max_body_bytes must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Validate the GraphQL endpoint configuration
    fn validate_graphql(&self, model: &Model) -> Result<(), LoomError> {
        let graphql = model.graphql_config();
        let route = graphql.route();
        if !route.starts_with('/') {
            return Err(LoomError::Validation(format!(
                "GraphQL route '{}' must start with '/'",
                route
            )));
        }
        if route == "/health" {
            return Err(LoomError::Validation(
                "GraphQL route cannot be '/health'".to_string(),
            ));
        }
        if graphql.max_depth == Some(0) || graphql.max_complexity == Some(0) {
            return Err(LoomError::Validation(
                "graphql.max_depth and graphql.max_complexity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate the global cache configuration
    fn validate_cache(&self, model: &Model) -> Result<(), LoomError> {
        let cache = model.cache_config();
        validate_cache_url(cache.url())?;
        if cache.persisted_query_ttl() == 0 {
            return Err(LoomError::Validation(
                "cache.persisted_query_ttl must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_cache_url(url: &str) -> Result<(), LoomError> {
    StoreKind::from_url(url)
        .map(|_| ())
        .map_err(|e| LoomError::Validation(format!("Invalid cache URL '{}': {}", url, e)))
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
