//! Record store and key-value cache traits

use async_trait::async_trait;
use loomql_core::LoomError;
use loomql_types::{CacheRecord, StoreKind, WriteContext};

/// Options for a single cache write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Lifetime in seconds; `None` keeps the entry until deleted
    pub ttl: Option<u64>,
}

impl CacheOptions {
    /// Options with a lifetime in seconds
    pub fn ttl(seconds: u64) -> Self {
        Self { ttl: Some(seconds) }
    }
}

/// Trait for record stores backing the query cache
///
/// Stores persist [`CacheRecord`]s keyed by `id`. Expiration is driven by the
/// optional [`WriteContext`] passed with each write: a record whose
/// `expires_at` has passed must read back as absent.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by id
    async fn get(&self, id: &str) -> Result<Option<CacheRecord>, LoomError>;

    /// Insert or replace a record
    async fn put(&self, record: CacheRecord, context: Option<WriteContext>)
        -> Result<(), LoomError>;

    /// Remove a record; removing an absent id is not an error
    async fn delete(&self, id: &str) -> Result<(), LoomError>;

    /// Check that the store is reachable
    async fn health_check(&self) -> Result<(), LoomError>;

    /// Release resources
    async fn close(&self) -> Result<(), LoomError>;

    /// Backend kind
    fn store_kind(&self) -> StoreKind;
}

/// String cache keyed by string
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Cached value, if present and not expired
    async fn get(&self, key: &str) -> Result<Option<String>, LoomError>;

    /// Store a value
    async fn set(&self, key: &str, value: &str, options: CacheOptions) -> Result<(), LoomError>;

    /// Remove a value
    async fn delete(&self, key: &str) -> Result<(), LoomError>;
}
