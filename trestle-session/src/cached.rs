//! Read-through session backend over a durable store and a fast cache.

use crate::codec::{self, SessionData};
use crate::error::SessionResult;
use crate::traits::{DurableStore, FastCache, SessionBackend};
use async_trait::async_trait;
use std::sync::Arc;
use trestle_log::{error, warn};

const CACHE_PREFIX: &str = "session:";

/// Session backend with a durable source of truth and a best-effort cache.
///
/// Reads try the cache first and fall through to the durable store on a
/// miss, repopulating the cache. Writes go to the cache, then to the
/// durable store; if the durable write fails the cache entry is dropped
/// again. Cache failures are logged and otherwise ignored; durable store
/// failures are returned to the caller.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trestle_session::{CachedSessionBackend, MemoryDurableStore, MemoryFastCache};
///
/// let backend = CachedSessionBackend::new(
///     Arc::new(MemoryDurableStore::new()),
///     Arc::new(MemoryFastCache::new()),
/// );
/// assert_eq!(backend.cache_key("abc"), "session:abc");
/// ```
pub struct CachedSessionBackend<D, C>
where
    D: DurableStore,
    C: FastCache,
{
    durable: Arc<D>,
    cache: Arc<C>,
}

impl<D, C> CachedSessionBackend<D, C>
where
    D: DurableStore,
    C: FastCache,
{
    pub fn new(durable: Arc<D>, cache: Arc<C>) -> Self {
        Self { durable, cache }
    }

    pub fn durable(&self) -> &Arc<D> {
        &self.durable
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    /// Cache key for session `sid`.
    pub fn cache_key(&self, sid: &str) -> String {
        format!("{}{}", CACHE_PREFIX, sid)
    }

    async fn cached(&self, key: &str) -> Option<SessionData> {
        let encoded = match self.cache.get(key).await {
            Ok(Some(encoded)) => encoded,
            Ok(None) => return None,
            Err(e) => {
                warn!(target: "trestle::session", "Session cache read failed for '{}': {}", key, e);
                return None;
            }
        };

        match codec::decode(&encoded) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(target: "trestle::session", "Discarding cached session '{}': {}", key, e);
                None
            }
        }
    }

    async fn fill_cache(&self, key: &str, encoded: String) {
        if let Err(e) = self.cache.set(key, encoded).await {
            warn!(target: "trestle::session", "Session cache write failed for '{}': {}", key, e);
        }
    }
}

#[async_trait]
impl<D, C> SessionBackend for CachedSessionBackend<D, C>
where
    D: DurableStore,
    C: FastCache,
{
    async fn get_by_sid(&self, sid: &str) -> SessionResult<Option<SessionData>> {
        let key = self.cache_key(sid);
        if let Some(data) = self.cached(&key).await {
            return Ok(Some(data));
        }

        let encoded = match self.durable.get(sid).await {
            Ok(Some(encoded)) => encoded,
            Ok(None) => return Ok(None),
            Err(e) => {
                error!(target: "trestle::session", "Session store read failed for '{}': {}", sid, e);
                return Err(e);
            }
        };

        let data = codec::decode(&encoded)?;
        self.fill_cache(&key, encoded).await;
        Ok(Some(data))
    }

    async fn put(&self, sid: &str, data: &SessionData) -> SessionResult<()> {
        let encoded = codec::encode(data)?;
        let key = self.cache_key(sid);
        self.fill_cache(&key, encoded.clone()).await;

        if let Err(e) = self.durable.put(sid, encoded).await {
            error!(target: "trestle::session", "Session store write failed for '{}': {}", sid, e);
            // Never serve data from the cache that the store did not accept.
            if let Err(e) = self.cache.delete(&key).await {
                warn!(target: "trestle::session", "Session cache delete failed for '{}': {}", key, e);
            }
            return Err(e);
        }
        Ok(())
    }
}
