//! In-memory durable store and fast cache.
//!
//! Suitable for tests and single-process deployments. Data is lost on
//! restart.

use crate::error::SessionResult;
use crate::traits::{DurableStore, FastCache};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Durable store backed by a shared `HashMap`.
///
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDurableStore {
    data: Arc<RwLock<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    pub async fn contains(&self, sid: &str) -> bool {
        self.data.read().await.contains_key(sid)
    }

    pub async fn remove(&self, sid: &str) -> Option<String> {
        self.data.write().await.remove(sid)
    }

    /// Number of `put` calls served so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DurableStore for MemoryDurableStore {
    async fn get(&self, sid: &str) -> SessionResult<Option<String>> {
        Ok(self.data.read().await.get(sid).cloned())
    }

    async fn put(&self, sid: &str, value: String) -> SessionResult<()> {
        self.data.write().await.insert(sid.to_string(), value);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<tokio::time::Instant>,
}

/// Fast cache backed by a shared `HashMap`, with an optional entry TTL.
#[derive(Debug, Clone, Default)]
pub struct MemoryFastCache {
    data: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Option<Duration>,
}

impl MemoryFastCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire entries `ttl` after they were written.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub async fn contains(&self, key: &str) -> bool {
        matches!(self.get(key).await, Ok(Some(_)))
    }

    pub async fn remove(&self, key: &str) -> Option<String> {
        self.data.write().await.remove(key).map(|entry| entry.value)
    }

    pub async fn clear(&self) {
        self.data.write().await.clear();
    }

    /// Drop expired entries.
    pub async fn cleanup_expired(&self) -> usize {
        let mut data = self.data.write().await;
        let before = data.len();
        let now = tokio::time::Instant::now();
        data.retain(|_, entry| entry.expires_at.is_none_or(|exp| exp > now));
        before - data.len()
    }
}

#[async_trait]
impl FastCache for MemoryFastCache {
    async fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let data = self.data.read().await;
        match data.get(key) {
            Some(entry)
                if entry
                    .expires_at
                    .is_none_or(|exp| tokio::time::Instant::now() <= exp) =>
            {
                Ok(Some(entry.value.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String) -> SessionResult<()> {
        let expires_at = self.ttl.map(|ttl| tokio::time::Instant::now() + ttl);
        self.data
            .write()
            .await
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> SessionResult<()> {
        self.remove(key).await;
        Ok(())
    }
}
