//! Two-tier read cache
//!
//! A bounded in-process tier answers first; the optional Redis tier is shared
//! between instances. The cache is never authoritative: every failure is
//! logged and treated as a miss so callers fall back to the store.

pub mod keys;
mod redis_tier;

pub use redis_tier::RedisTier;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use shared::StockKey;
use uuid::Uuid;

use crate::config::CacheConfig;

struct LocalEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Bounded in-process tier with per-entry expiry
struct LocalTier {
    entries: Mutex<HashMap<String, LocalEntry>>,
    max_items: usize,
    max_ttl: Duration,
}

impl LocalTier {
    fn new(max_items: usize, max_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_items: max_items.max(1),
            max_ttl,
        }
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if entries.len() >= self.max_items && !entries.contains_key(key) {
            entries.retain(|_, entry| entry.expires_at > now);
            if entries.len() >= self.max_items {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key.to_string(),
            LocalEntry {
                value,
                expires_at: now + ttl.min(self.max_ttl),
            },
        );
    }

    fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    fn delete_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub local_enabled: bool,
    pub distributed_enabled: bool,
    pub local_items: usize,
    pub local_hits: u64,
    pub distributed_hits: u64,
    pub misses: u64,
    pub errors: u64,
}

#[derive(Default)]
struct Counters {
    local_hits: AtomicU64,
    distributed_hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

/// Read-through, write-invalidate cache in front of the store
pub struct TwoTierCache {
    local: Option<LocalTier>,
    distributed: Option<RedisTier>,
    counters: Counters,
}

impl TwoTierCache {
    pub fn new(config: &CacheConfig, distributed: Option<RedisTier>) -> Self {
        let local = config
            .l1_enabled
            .then(|| LocalTier::new(config.l1_max_items, config.l1_ttl()));

        Self {
            local,
            distributed,
            counters: Counters::default(),
        }
    }

    /// In-process tier only
    pub fn local_only(config: &CacheConfig) -> Self {
        Self::new(config, None)
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            local: None,
            distributed: None,
            counters: Counters::default(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(local) = &self.local {
            if let Some(value) = local.get(key) {
                self.counters.local_hits.fetch_add(1, Ordering::Relaxed);
                return Some(value);
            }
        }

        if let Some(distributed) = &self.distributed {
            match distributed.get(key).await {
                Ok(Some(value)) => {
                    self.counters.distributed_hits.fetch_add(1, Ordering::Relaxed);
                    if let Some(local) = &self.local {
                        local.set(key, value.clone(), local.max_ttl);
                    }
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => self.record_error("get", key, &e),
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        if let Some(distributed) = &self.distributed {
            if let Err(e) = distributed.set(key, &value, ttl).await {
                self.record_error("set", key, &e);
            }
        }
        if let Some(local) = &self.local {
            local.set(key, value, ttl);
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Some(local) = &self.local {
            local.delete(key);
        }
        if let Some(distributed) = &self.distributed {
            if let Err(e) = distributed.delete(key).await {
                self.record_error("delete", key, &e);
            }
        }
    }

    pub async fn delete_by_prefix(&self, prefix: &str) {
        if let Some(local) = &self.local {
            local.delete_by_prefix(prefix);
        }
        if let Some(distributed) = &self.distributed {
            if let Err(e) = distributed.delete_by_prefix(prefix).await {
                self.record_error("delete_by_prefix", prefix, &e);
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                self.delete(key).await;
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set(key, bytes, ttl).await,
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to encode cache entry"),
        }
    }

    /// Drop the record's entry and every stock list and low-stock entry of the tenant
    pub async fn invalidate_stock(&self, tenant_id: &str, key: &StockKey) {
        self.delete(&keys::stock(tenant_id, key)).await;
        self.delete_by_prefix(&keys::stock_list_prefix(tenant_id)).await;
        self.delete_by_prefix(&keys::low_stock_prefix(tenant_id)).await;
    }

    pub async fn invalidate_warehouse(&self, tenant_id: &str, warehouse_id: Uuid) {
        self.delete(&keys::warehouse(tenant_id, warehouse_id)).await;
    }

    /// Whether the distributed tier answers
    pub async fn ping(&self) -> bool {
        match &self.distributed {
            Some(distributed) => distributed.ping().await.is_ok(),
            None => true,
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            local_enabled: self.local.is_some(),
            distributed_enabled: self.distributed.is_some(),
            local_items: self.local.as_ref().map_or(0, LocalTier::len),
            local_hits: self.counters.local_hits.load(Ordering::Relaxed),
            distributed_hits: self.counters.distributed_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    fn record_error(&self, op: &str, key: &str, error: &crate::error::AppError) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(op = op, key = %key, error = %error, "Distributed cache operation failed");
    }
}
