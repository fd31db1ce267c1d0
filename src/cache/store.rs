//! Cache Store Module
//!
//! Typed read-through cache over a byte-level backend. The cache is strictly an
//! optimization: every backend fault, timeout or decode failure degrades to a
//! miss (reads) or a no-op (writes) and is never surfaced to callers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{CacheBackend, CacheKey, CacheStats, StatsRecorder, DEFAULT_TTL};
use crate::config::Config;
use crate::error::CacheFault;

/// Cached result of a paginated query: one page of records plus the total count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64) -> Self {
        Self { items, total }
    }
}

// == Cache Store ==
/// Typed cache shared by every domain service of a process.
///
/// Cloning is cheap; clones share the backend and the statistics.
#[derive(Clone)]
pub struct CacheStore {
    /// Byte-level backend
    backend: Arc<dyn CacheBackend>,
    /// TTL applied when a write does not name one
    default_ttl: Duration,
    /// Upper bound of a single backend round-trip
    op_timeout: Duration,
    /// Effectiveness counters
    stats: Arc<StatsRecorder>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore.
    ///
    /// # Arguments
    /// * `backend` - Shared backend connection
    /// * `default_ttl` - TTL of writes without an explicit one
    /// * `op_timeout` - Bound applied to every backend call
    pub fn new(backend: Arc<dyn CacheBackend>, default_ttl: Duration, op_timeout: Duration) -> Self {
        Self {
            backend,
            default_ttl,
            op_timeout,
            stats: Arc::new(StatsRecorder::new()),
        }
    }

    /// Creates a new CacheStore with TTL and timeout taken from the Config.
    pub fn from_config(backend: Arc<dyn CacheBackend>, config: &Config) -> Self {
        let ttl = match config.cache_ttl() {
            ttl if ttl.is_zero() => DEFAULT_TTL,
            ttl => ttl,
        };
        Self::new(backend, ttl, config.cache_timeout())
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Get ==
    /// Reads and decodes the value stored under `key`.
    ///
    /// Returns `None` on a miss, and also when the backend is unreachable, slow
    /// or holds bytes of a different shape.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.try_get(key).await {
            Ok(Some(value)) => {
                self.stats.record_hit();
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                self.stats.record_miss();
                debug!(key = %key, "Cache miss");
                None
            }
            Err(fault) => {
                self.stats.record_fault();
                self.stats.record_miss();
                debug!(key = %key, error = %fault, "Cache read degraded to miss");
                None
            }
        }
    }

    // == Set ==
    /// Encodes and stores `value` under `key` for `ttl` (default TTL if None).
    ///
    /// Values that encode to JSON `null` are never stored, so absence is not
    /// cached.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T, ttl: Option<Duration>) {
        match self.try_set(key, value, ttl.unwrap_or(self.default_ttl)).await {
            Ok(true) => {
                self.stats.record_write();
                debug!(key = %key, "Cache write");
            }
            Ok(false) => debug!(key = %key, "Cache write skipped for empty value"),
            Err(fault) => {
                self.stats.record_fault();
                debug!(key = %key, error = %fault, "Cache write dropped");
            }
        }
    }

    // == Delete ==
    /// Removes `key`. A missing key is not an error.
    pub async fn delete(&self, key: &CacheKey) {
        match self.bounded(self.backend.del(key.as_str())).await {
            Ok(removed) => {
                self.stats.record_invalidation();
                debug!(key = %key, removed, "Cache invalidation");
            }
            Err(fault) => {
                self.stats.record_fault();
                debug!(key = %key, error = %fault, "Cache invalidation dropped");
            }
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    async fn try_get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, CacheFault> {
        let Some(bytes) = self.bounded(self.backend.get(key.as_str())).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(CacheFault::Decode)
    }

    async fn try_set<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> Result<bool, CacheFault> {
        let bytes = serde_json::to_vec(value).map_err(CacheFault::Encode)?;
        if bytes == b"null" {
            return Ok(false);
        }
        self.bounded(self.backend.set_ex(key.as_str(), bytes, ttl))
            .await
            .map(|()| true)
    }

    async fn bounded<R>(
        &self,
        call: impl Future<Output = Result<R, CacheFault>>,
    ) -> Result<R, CacheFault> {
        tokio::time::timeout(self.op_timeout, call)
            .await
            .map_err(|_| CacheFault::Timeout(self.op_timeout))?
    }
}
