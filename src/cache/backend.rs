//! Cache Backend Module
//!
//! Byte-level key/value contract every cache backend implements.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheFault;

/// Raw `GET` / `SET EX` / `DEL` operations of a shared cache.
///
/// Implementations report every failure as a [`CacheFault`]; deciding what a
/// fault means is left to `CacheStore`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the stored bytes, `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheFault>;

    /// Stores bytes under `key` for `ttl`, replacing any previous value.
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheFault>;

    /// Removes `key`. Returns whether a value was removed.
    async fn del(&self, key: &str) -> Result<bool, CacheFault>;
}
