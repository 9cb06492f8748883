//! Query cache: record stores and the key-value adapter over them

mod adapter;
mod memory;
mod redis;
mod traits;

pub use adapter::CacheAdapter;
pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use traits::{CacheOptions, KeyValueCache, RecordStore};

use loomql_core::{Clock, LoomError};
use loomql_types::StoreKind;
use std::sync::Arc;
use tracing::info;

/// Open the record store a cache URL points at
pub async fn open_store(url: &str, clock: Arc<dyn Clock>) -> Result<Arc<dyn RecordStore>, LoomError> {
    let kind = StoreKind::from_url(url).map_err(LoomError::Config)?;
    let store: Arc<dyn RecordStore> = match kind {
        StoreKind::Memory => Arc::new(MemoryStore::new(clock)),
        StoreKind::Redis => Arc::new(RedisStore::connect(url, clock).await?),
    };
    info!(store = %kind, "Opened cache store");
    Ok(store)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use loomql_types::{CacheRecord, WriteContext};
    use tokio::sync::Mutex;

    /// Store that remembers every write verbatim
    #[derive(Default)]
    pub struct RecordingStore {
        pub writes: Mutex<Vec<(CacheRecord, Option<WriteContext>)>>,
    }

    #[async_trait]
    impl RecordStore for RecordingStore {
        async fn get(&self, _id: &str) -> Result<Option<CacheRecord>, LoomError> {
            Ok(None)
        }
        async fn put(
            &self,
            record: CacheRecord,
            context: Option<WriteContext>,
        ) -> Result<(), LoomError> {
            self.writes.lock().await.push((record, context));
            Ok(())
        }
        async fn delete(&self, _id: &str) -> Result<(), LoomError> {
            Ok(())
        }
        async fn health_check(&self) -> Result<(), LoomError> {
            Ok(())
        }
        async fn close(&self) -> Result<(), LoomError> {
            Ok(())
        }
        fn store_kind(&self) -> StoreKind {
            StoreKind::Memory
        }
    }

    /// Store whose every operation fails
    pub struct DownStore;

    #[async_trait]
    impl RecordStore for DownStore {
        async fn get(&self, _id: &str) -> Result<Option<CacheRecord>, LoomError> {
            Err(LoomError::Store("connection refused".to_string()))
        }
        async fn put(&self, _: CacheRecord, _: Option<WriteContext>) -> Result<(), LoomError> {
            Err(LoomError::Store("connection refused".to_string()))
        }
        async fn delete(&self, _id: &str) -> Result<(), LoomError> {
            Err(LoomError::Store("connection refused".to_string()))
        }
        async fn health_check(&self) -> Result<(), LoomError> {
            Err(LoomError::Store("connection refused".to_string()))
        }
        async fn close(&self) -> Result<(), LoomError> {
            Ok(())
        }
        fn store_kind(&self) -> StoreKind {
            StoreKind::Redis
        }
    }
}
