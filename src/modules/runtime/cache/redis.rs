//! Redis-backed record store

use async_trait::async_trait;
use loomql_core::{Clock, LoomError};
use loomql_types::{CacheRecord, StoreKind, WriteContext};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use std::sync::Arc;

use super::traits::RecordStore;

/// Record store keeping each record as a JSON string under its id.
///
/// Expiration is delegated to Redis: a write context with `expiresAt`
/// becomes a `PX` lifetime relative to the adapter's clock.
pub struct RedisStore {
    conn: ConnectionManager,
    clock: Arc<dyn Clock>,
}

impl RedisStore {
    /// Connect to the Redis server at `url`
    pub async fn connect(url: &str, clock: Arc<dyn Clock>) -> Result<Self, LoomError> {
        let client = Client::open(url)
            .map_err(|e| LoomError::Store(format!("Redis client creation failed: {}", e)))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| LoomError::Store(format!("Redis connection failed: {}", e)))?;

        Ok(Self { conn, clock })
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn get(&self, id: &str) -> Result<Option<CacheRecord>, LoomError> {
        let mut conn = self.conn.clone();
        let result: RedisResult<Option<String>> = conn.get(id).await;
        match result {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| LoomError::Store(format!("Corrupt record '{}': {}", id, e))),
            Ok(None) => Ok(None),
            Err(e) => Err(LoomError::Store(format!("GET failed: {}", e))),
        }
    }

    async fn put(
        &self,
        record: CacheRecord,
        context: Option<WriteContext>,
    ) -> Result<(), LoomError> {
        let payload = serde_json::to_string(&record)?;
        let mut conn = self.conn.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(&record.id).arg(payload);

        if let Some(expires_at) = context.and_then(|c| c.expires_at) {
            let remaining = expires_at - self.clock.now_millis();
            if remaining <= 0 {
                return self.delete(&record.id).await;
            }
            cmd.arg("PX").arg(remaining);
        }

        let result: RedisResult<()> = cmd.query_async(&mut conn).await;
        result.map_err(|e| LoomError::Store(format!("SET failed: {}", e)))
    }

    async fn delete(&self, id: &str) -> Result<(), LoomError> {
        let mut conn = self.conn.clone();
        let result: RedisResult<i64> = conn.del(id).await;
        result
            .map(|_| ())
            .map_err(|e| LoomError::Store(format!("DEL failed: {}", e)))
    }

    async fn health_check(&self) -> Result<(), LoomError> {
        let mut conn = self.conn.clone();
        let result: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match result {
            Ok(response) if response == "PONG" => Ok(()),
            Ok(response) => Err(LoomError::Store(format!(
                "Unexpected PING response: {}",
                response
            ))),
            Err(e) => Err(LoomError::Store(format!(
                "Redis health check failed: {}",
                e
            ))),
        }
    }

    async fn close(&self) -> Result<(), LoomError> {
        // ConnectionManager closes its connection on drop
        Ok(())
    }

    fn store_kind(&self) -> StoreKind {
        StoreKind::Redis
    }
}
