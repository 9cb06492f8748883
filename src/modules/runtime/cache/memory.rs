//! Process-local record store

use async_trait::async_trait;
use loomql_core::{Clock, LoomError};
use loomql_types::{CacheRecord, StoreKind, WriteContext};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::RecordStore;

struct Entry {
    record: CacheRecord,
    expires_at: Option<i64>,
}

impl Entry {
    fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now_ms)
    }
}

/// In-memory record store.
///
/// Expired records are removed lazily: on read, and by [`MemoryStore::purge_expired`].
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of records that have not expired
    pub async fn len(&self) -> usize {
        let now = self.clock.now_millis();
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    /// Returns true if no live record is held
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired record, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<CacheRecord>, LoomError> {
        let now = self.clock.now_millis();
        {
            let entries = self.entries.read().await;
            match entries.get(id) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.record.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(id).is_some_and(|e| e.is_expired(now)) {
            entries.remove(id);
        }
        Ok(None)
    }

    async fn put(
        &self,
        record: CacheRecord,
        context: Option<WriteContext>,
    ) -> Result<(), LoomError> {
        let expires_at = context.and_then(|c| c.expires_at);
        let mut entries = self.entries.write().await;
        entries.insert(record.id.clone(), Entry { record, expires_at });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), LoomError> {
        self.entries.write().await.remove(id);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), LoomError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), LoomError> {
        self.entries.write().await.clear();
        Ok(())
    }

    fn store_kind(&self) -> StoreKind {
        StoreKind::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomql_core::ManualClock;

    fn store() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10_000));
        (MemoryStore::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_put_get_replace() {
        let (store, _) = store();
        store.put(CacheRecord::new("a", "one"), None).await.unwrap();
        store.put(CacheRecord::new("a", "two"), None).await.unwrap();
        assert_eq!(
            store.get("a").await.unwrap(),
            Some(CacheRecord::new("a", "two"))
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_expiry_is_lazy() {
        let (store, clock) = store();
        store
            .put(
                CacheRecord::new("a", "one"),
                Some(WriteContext::new().with_expires_at(15_000)),
            )
            .await
            .unwrap();
        store
            .put(
                CacheRecord::new("b", "two"),
                Some(WriteContext::new().with_expires_at(20_000)),
            )
            .await
            .unwrap();

        clock.set(15_000);
        assert!(store.get("a").await.unwrap().is_none());
        assert_eq!(store.len().await, 1);

        clock.set(20_000);
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_and_close() {
        let (store, _) = store();
        store.put(CacheRecord::new("a", "one"), None).await.unwrap();
        store.put(CacheRecord::new("b", "two"), None).await.unwrap();
        store.delete("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        store.close().await.unwrap();
        assert!(store.is_empty().await);
    }
}
