//! Distributed cache tier on Redis

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::error::{AppError, AppResult};

const SCAN_BATCH: usize = 200;

/// Shared tier reached through a multiplexed connection manager
#[derive(Clone)]
pub struct RedisTier {
    conn_manager: ConnectionManager,
    key_prefix: String,
}

impl RedisTier {
    /// Connect to Redis. Every key this tier touches is namespaced under `key_prefix`.
    pub async fn connect(redis_url: &str, key_prefix: &str) -> AppResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AppError::Configuration(format!("Invalid Redis URL: {}", e)))?;

        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            conn_manager,
            key_prefix: key_prefix.to_string(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    pub async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let mut conn = self.conn_manager.clone();
        let value: Option<Vec<u8>> = conn.get(self.full_key(key)).await?;
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> AppResult<()> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn
            .set_ex(self.full_key(key), value, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn.del(self.full_key(key)).await?;
        Ok(())
    }

    /// Delete every key starting with `prefix`, returning how many were removed
    pub async fn delete_by_prefix(&self, prefix: &str) -> AppResult<u64> {
        let mut conn = self.conn_manager.clone();
        let pattern = format!("{}*", self.full_key(prefix));
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = conn.del(&keys).await?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::debug!(pattern = %pattern, removed = removed, "Redis prefix invalidation");
        Ok(removed)
    }

    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn_manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
