//! Automatic persisted queries

use loomql_core::LoomError;
use loomql_types::GraphQLPayload;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{CacheOptions, KeyValueCache};

/// Only protocol version the server understands
const SUPPORTED_VERSION: u32 = 1;

/// How a payload's query text was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Query sent inline, no persisted-query extension
    Inline(String),
    /// Hash-only request served from the cache
    Hit(String),
    /// Query and hash sent together; store after a successful execution
    Register { query: String, hash: String },
    /// Hash-only request the cache could not answer
    NotFound,
}

impl Resolution {
    /// Query text to execute, if one was resolved
    pub fn query(&self) -> Option<&str> {
        match self {
            Resolution::Inline(query) | Resolution::Hit(query) => Some(query.as_str()),
            Resolution::Register { query, .. } => Some(query.as_str()),
            Resolution::NotFound => None,
        }
    }
}

/// Persisted query lookups and registrations over the query cache
#[derive(Clone)]
pub struct PersistedQueries {
    cache: Arc<dyn KeyValueCache>,
    ttl: u64,
}

impl PersistedQueries {
    /// Create a registry storing queries for `ttl` seconds
    pub fn new(cache: Arc<dyn KeyValueCache>, ttl: u64) -> Self {
        Self { cache, ttl }
    }

    /// Cache key for a query hash
    pub fn key(hash: &str) -> String {
        format!("apq:{}", hash.to_ascii_lowercase())
    }

    /// Hex-encoded SHA-256 of a query
    pub fn hash(query: &str) -> String {
        hex::encode(Sha256::digest(query.as_bytes()))
    }

    /// Work out which query a payload asks for.
    ///
    /// Cache failures on lookup are treated as misses.
    pub async fn resolve(&self, payload: &GraphQLPayload) -> Result<Resolution, LoomError> {
        let persisted = payload
            .persisted_query()
            .map_err(LoomError::BadRequest)?;

        let Some(persisted) = persisted else {
            return payload
                .query_text()
                .map(|q| Resolution::Inline(q.to_string()))
                .ok_or_else(|| LoomError::BadRequest("Request has no query".to_string()));
        };

        if persisted.version != SUPPORTED_VERSION {
            return Err(LoomError::BadRequest(format!(
                "Unsupported persisted query version {}",
                persisted.version
            )));
        }

        if let Some(query) = payload.query_text() {
            if !Self::hash(query).eq_ignore_ascii_case(&persisted.sha256_hash) {
                return Err(LoomError::BadRequest(
                    "Provided sha256Hash does not match query".to_string(),
                ));
            }
            return Ok(Resolution::Register {
                query: query.to_string(),
                hash: persisted.sha256_hash.to_ascii_lowercase(),
            });
        }

        match self.cache.get(&Self::key(&persisted.sha256_hash)).await {
            Ok(Some(query)) => {
                debug!(hash = %persisted.sha256_hash, "Persisted query hit");
                Ok(Resolution::Hit(query))
            }
            Ok(None) => Ok(Resolution::NotFound),
            Err(e) => {
                warn!("Persisted query lookup failed: {}", e);
                Ok(Resolution::NotFound)
            }
        }
    }

    /// Remember a query under its hash; failures only warn
    pub async fn register(&self, hash: &str, query: &str) {
        let result = self
            .cache
            .set(&Self::key(hash), query, CacheOptions::ttl(self.ttl))
            .await;
        match result {
            Ok(()) => debug!(hash, ttl = self.ttl, "Registered persisted query"),
            Err(e) => warn!("Failed to register persisted query: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::DownStore;
    use crate::cache::{CacheAdapter, MemoryStore};
    use loomql_core::SystemClock;
    use serde_json::json;

    const QUERY: &str = "{ __typename }";

    fn registry() -> PersistedQueries {
        let store = Arc::new(MemoryStore::new(Arc::new(SystemClock)));
        PersistedQueries::new(Arc::new(CacheAdapter::new(store)), 300)
    }

    fn payload(query: Option<&str>, extensions: serde_json::Value) -> GraphQLPayload {
        GraphQLPayload {
            query: query.map(str::to_string),
            extensions: Some(extensions),
            ..GraphQLPayload::default()
        }
    }

    fn apq(hash: &str) -> serde_json::Value {
        json!({"persistedQuery": {"version": 1, "sha256Hash": hash}})
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = PersistedQueries::hash("");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(PersistedQueries::key("ABC"), "apq:abc");
    }

    #[tokio::test]
    async fn test_inline_query() {
        let resolution = registry()
            .resolve(&GraphQLPayload::query(QUERY))
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::Inline(QUERY.to_string()));

        let err = registry()
            .resolve(&GraphQLPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LoomError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_register_then_hit() {
        let registry = registry();
        let hash = PersistedQueries::hash(QUERY);

        let miss = registry.resolve(&payload(None, apq(&hash))).await.unwrap();
        assert_eq!(miss, Resolution::NotFound);

        let register = registry
            .resolve(&payload(Some(QUERY), apq(&hash)))
            .await
            .unwrap();
        assert_eq!(
            register,
            Resolution::Register {
                query: QUERY.to_string(),
                hash: hash.clone()
            }
        );
        registry.register(&hash, QUERY).await;

        let hit = registry.resolve(&payload(None, apq(&hash))).await.unwrap();
        assert_eq!(hit.query(), Some(QUERY));
    }

    #[tokio::test]
    async fn test_hash_mismatch() {
        let err = registry()
            .resolve(&payload(Some(QUERY), apq("deadbeef")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[tokio::test]
    async fn test_unsupported_version() {
        let extensions = json!({"persistedQuery": {"version": 2, "sha256Hash": "abc"}});
        let err = registry()
            .resolve(&payload(None, extensions))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("version 2"));
    }

    #[tokio::test]
    async fn test_store_errors_are_misses() {
        let registry = PersistedQueries::new(
            Arc::new(CacheAdapter::new(Arc::new(DownStore))),
            300,
        );
        let hash = PersistedQueries::hash(QUERY);
        let resolution = registry.resolve(&payload(None, apq(&hash))).await.unwrap();
        assert_eq!(resolution, Resolution::NotFound);

        // registration failures are swallowed
        registry.register(&hash, QUERY).await;
    }
}
