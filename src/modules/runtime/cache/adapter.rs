//! Cache adapter over a record store

use async_trait::async_trait;
use loomql_core::{Clock, LoomError, SystemClock};
use loomql_types::{CacheRecord, WriteContext};
use std::sync::Arc;
use tracing::debug;

use super::traits::{CacheOptions, KeyValueCache, RecordStore};

/// Key-value view of a [`RecordStore`].
///
/// Values are stored verbatim in the record's `query` field under `id = key`;
/// a TTL becomes an absolute `expiresAt` on the write context.
#[derive(Clone)]
pub struct CacheAdapter {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl CacheAdapter {
    /// Create an adapter reading time from the system clock
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create an adapter with an explicit clock
    pub fn with_clock(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Store a value, extending `context` rather than replacing it.
    ///
    /// Fields already present on `context` survive; only `expiresAt` is set,
    /// and only for a non-zero `options.ttl`. A TTL of zero never expires.
    pub async fn set_in_context(
        &self,
        key: &str,
        value: &str,
        options: CacheOptions,
        context: Option<WriteContext>,
    ) -> Result<(), LoomError> {
        let mut context = context.unwrap_or_default();
        if let Some(ttl) = options.ttl.filter(|&ttl| ttl > 0) {
            let ttl_ms = i64::try_from(ttl).unwrap_or(i64::MAX).saturating_mul(1000);
            context.expires_at = Some(self.clock.now_millis().saturating_add(ttl_ms));
        }

        debug!(key, ttl = ?options.ttl, "Cache set");
        self.store
            .put(CacheRecord::new(key, value), Some(context))
            .await
    }

    /// Check the underlying store
    pub async fn health_check(&self) -> Result<(), LoomError> {
        self.store.health_check().await
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }
}

#[async_trait]
impl KeyValueCache for CacheAdapter {
    async fn get(&self, key: &str) -> Result<Option<String>, LoomError> {
        let record = self.store.get(key).await?;
        debug!(key, hit = record.is_some(), "Cache get");
        Ok(record.map(|r| r.query))
    }

    async fn set(&self, key: &str, value: &str, options: CacheOptions) -> Result<(), LoomError> {
        self.set_in_context(key, value, options, None).await
    }

    async fn delete(&self, key: &str) -> Result<(), LoomError> {
        debug!(key, "Cache delete");
        self.store.delete(key).await
    }
}
