//! In-Memory Backend Module
//!
//! Process-local cache backend: HashMap storage with TTL expiration and a
//! capacity bound.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{CacheBackend, CacheEntry, Clock, SystemClock, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::CacheFault;

// == Memory Backend ==
/// Cache backend living in the service process.
#[derive(Debug)]
pub struct MemoryBackend {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Time source for expiry
    clock: Arc<dyn Clock>,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// When false every call fails with `CacheFault::Unavailable`
    available: AtomicBool,
}

impl MemoryBackend {
    // == Constructor ==
    /// Creates a new backend holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    /// Creates a new backend reading time from `clock`.
    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            max_entries,
            available: AtomicBool::new(true),
        }
    }

    // == Availability ==
    /// Simulates an outage (`false`) or recovery (`true`) of the backend.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), CacheFault> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheFault::Unavailable("memory backend switched off".to_string()))
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    // == Length ==
    /// Returns the number of stored entries, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Makes room for one more entry: drops expired entries first, then the
    /// entry closest to expiry.
    fn make_room(entries: &mut HashMap<String, CacheEntry>, max_entries: usize, now: u64) {
        if entries.len() < max_entries {
            return;
        }
        entries.retain(|_, entry| !entry.is_expired_at(now));
        if entries.len() < max_entries {
            return;
        }
        let victim = entries
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone());
        if let Some(victim) = victim {
            entries.remove(&victim);
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheFault> {
        self.ensure_available()?;
        let now = self.clock.now_ms();

        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired_at(now) => {
                    return Ok(Some(entry.payload.clone()));
                }
                Some(_) => {}
            }
        }

        // Expired: drop it so it is not counted against capacity
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheFault> {
        self.ensure_available()?;

        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheFault::Backend(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheFault::Backend(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }
        if self.max_entries == 0 {
            return Err(CacheFault::Backend("Cache has zero capacity".to_string()));
        }

        let now = self.clock.now_ms();
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            Self::make_room(&mut entries, self.max_entries, now);
        }
        entries.insert(key.to_string(), CacheEntry::new(value, now, ttl));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, CacheFault> {
        self.ensure_available()?;
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_backend_set_and_get() {
        let backend = MemoryBackend::new(100);

        backend.set_ex("key1", b"value1".to_vec(), TTL).await.unwrap();
        let value = backend.get("key1").await.unwrap();

        assert_eq!(value, Some(b"value1".to_vec()));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_backend_get_nonexistent() {
        let backend = MemoryBackend::new(100);
        assert_eq!(backend.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_backend_delete() {
        let backend = MemoryBackend::new(100);

        backend.set_ex("key1", b"value1".to_vec(), TTL).await.unwrap();
        assert!(backend.del("key1").await.unwrap());

        assert!(backend.is_empty().await);
        assert_eq!(backend.get("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_backend_delete_nonexistent_is_not_an_error() {
        let backend = MemoryBackend::new(100);
        assert!(!backend.del("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn test_backend_overwrite() {
        let backend = MemoryBackend::new(100);

        backend.set_ex("key1", b"value1".to_vec(), TTL).await.unwrap();
        backend.set_ex("key1", b"value2".to_vec(), TTL).await.unwrap();

        assert_eq!(backend.get("key1").await.unwrap(), Some(b"value2".to_vec()));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_backend_ttl_expiration() {
        let clock = Arc::new(ManualClock::new(0));
        let backend = MemoryBackend::with_clock(100, clock.clone());

        backend
            .set_ex("key1", b"value1".to_vec(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(backend.get("key1").await.unwrap().is_some());

        clock.advance(Duration::from_millis(1_000));

        assert_eq!(backend.get("key1").await.unwrap(), None);
        assert!(backend.is_empty().await, "Expired entry should be dropped on read");
    }

    #[tokio::test]
    async fn test_backend_capacity_evicts_closest_to_expiry() {
        let clock = Arc::new(ManualClock::new(0));
        let backend = MemoryBackend::with_clock(2, clock.clone());

        backend.set_ex("short", b"a".to_vec(), Duration::from_secs(10)).await.unwrap();
        backend.set_ex("long", b"b".to_vec(), Duration::from_secs(100)).await.unwrap();
        backend.set_ex("new", b"c".to_vec(), Duration::from_secs(50)).await.unwrap();

        assert_eq!(backend.len().await, 2);
        assert_eq!(backend.get("short").await.unwrap(), None);
        assert!(backend.get("long").await.unwrap().is_some());
        assert!(backend.get("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_backend_cleanup_expired() {
        let clock = Arc::new(ManualClock::new(0));
        let backend = MemoryBackend::with_clock(100, clock.clone());

        backend.set_ex("key1", b"v".to_vec(), Duration::from_secs(1)).await.unwrap();
        backend.set_ex("key2", b"v".to_vec(), Duration::from_secs(10)).await.unwrap();

        clock.advance(Duration::from_secs(2));

        assert_eq!(backend.cleanup_expired().await, 1);
        assert_eq!(backend.len().await, 1);
        assert!(backend.get("key2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_backend_unavailable() {
        let backend = MemoryBackend::new(100);
        backend.set_available(false);

        assert!(matches!(
            backend.get("key1").await,
            Err(CacheFault::Unavailable(_))
        ));
        assert!(backend.set_ex("key1", b"v".to_vec(), TTL).await.is_err());

        backend.set_available(true);
        assert!(backend.set_ex("key1", b"v".to_vec(), TTL).await.is_ok());
    }

    #[tokio::test]
    async fn test_backend_key_too_long() {
        let backend = MemoryBackend::new(100);
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);

        let result = backend.set_ex(&long_key, b"value".to_vec(), TTL).await;
        assert!(matches!(result, Err(CacheFault::Backend(_))));
    }
}
