use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("command failed: {0}")]
    Command(String),
}

/// Byte-oriented key-value cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError>;

    /// Stores `value` under `key`, optionally expiring after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheStoreError>;

    async fn delete(&self, key: &str) -> Result<(), CacheStoreError>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

/// Thread-safe in-process cache store, used when no external cache is configured.
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<DashMap<String, StoredValue>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // Re-checks under the write lock; a concurrent set may have replaced the entry.
    fn evict_if_expired(&self, key: &str) {
        let now = Utc::now();
        self.entries
            .remove_if(key, |_, current| current.expires_at.is_some_and(|expiry| now >= expiry));
    }

    /// Drop every entry whose TTL has elapsed.
    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        self.entries
            .retain(|_, stored| stored.expires_at.map_or(true, |expiry| now < expiry));
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
        if let Some(entry) = self.entries.get(key) {
            let stored = entry.value().clone();
            match stored.expires_at {
                Some(expiry) if Utc::now() >= expiry => {
                    drop(entry); // Release the read lock
                    self.evict_if_expired(key);
                }
                _ => return Ok(Some(stored.bytes)),
            }
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheStoreError> {
        let stored = StoredValue {
            bytes: value,
            expires_at: ttl.map(|ttl| Utc::now() + ttl),
        };
        self.entries.insert(key.to_string(), stored);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheStoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
