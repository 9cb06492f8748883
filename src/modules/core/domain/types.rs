//! Server, GraphQL, and cache configuration types

use serde::{Deserialize, Serialize};

/// Default plain HTTP port
pub const DEFAULT_PORT: u16 = 9926;

/// Default route the GraphQL bridge intercepts
pub const DEFAULT_ROUTE: &str = "/graphql";

/// Default request body limit (4 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Default cache store URL
pub const DEFAULT_CACHE_URL: &str = "memory://";

/// Default lifetime of persisted queries, in seconds
pub const DEFAULT_PERSISTED_QUERY_TTL: u64 = 300;

/// TLS material for the secure listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM certificate chain path
    pub cert: String,

    /// PEM private key path
    pub key: String,
}

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Plain HTTP port (default: 9926)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// HTTPS port; requires `tls`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_port: Option<u16>,

    /// Certificate and key for `secure_port`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,

    /// Log level: 0=DEBUG, 1=INFO, 2=WARN, 3=ERROR
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<u8>,

    /// Maximum accepted request body size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_body_bytes: Option<usize>,
}

impl ServerConfig {
    /// Get the plain port with default fallback
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Get the body limit with default fallback
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES)
    }
}

/// GraphQL endpoint and engine limits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphQLConfig {
    /// Route intercepted by the bridge (default: `/graphql`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    /// Whether introspection queries are allowed (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introspection: Option<bool>,

    /// Maximum selection depth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    /// Maximum query complexity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_complexity: Option<usize>,
}

impl GraphQLConfig {
    /// Get the route with default fallback
    pub fn route(&self) -> &str {
        self.route.as_deref().unwrap_or(DEFAULT_ROUTE)
    }

    /// Get the introspection flag with default fallback
    pub fn introspection(&self) -> bool {
        self.introspection.unwrap_or(true)
    }
}

/// Query cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Store URL: `memory://` or `redis://host:port/db`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Lifetime of persisted queries in seconds (default: 300)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted_query_ttl: Option<u64>,
}

impl CacheConfig {
    /// Get the store URL with default fallback
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_CACHE_URL)
    }

    /// Get the persisted query TTL with default fallback
    pub fn persisted_query_ttl(&self) -> u64 {
        self.persisted_query_ttl
            .unwrap_or(DEFAULT_PERSISTED_QUERY_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.max_body_bytes(), DEFAULT_MAX_BODY_BYTES);
        assert!(config.secure_port.is_none());
    }

    #[test]
    fn test_server_config_serde() {
        let config = ServerConfig {
            port: Some(3000),
            secure_port: Some(3443),
            tls: Some(TlsConfig {
                cert: "cert.pem".to_string(),
                key: "key.pem".to_string(),
            }),
            log_level: Some(2),
            max_body_bytes: None,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"port\":3000"));
        assert!(json.contains("\"secure_port\":3443"));
        assert!(!json.contains("max_body_bytes"));

        let parsed: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.port, config.port);
        assert_eq!(parsed.tls, config.tls);
    }

    #[test]
    fn test_graphql_config_defaults() {
        let config = GraphQLConfig::default();
        assert_eq!(config.route(), "/graphql");
        assert!(config.introspection());
    }

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.url(), "memory://");
        assert_eq!(config.persisted_query_ttl(), 300);
    }
}
