//! Cache Entry Module
//!
//! Defines the structure for individual in-memory cache entries with TTL support.

use std::time::Duration;

use crate::cache::clock::duration_ms;

// == Cache Entry ==
/// Represents a single stored payload with its expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized payload as handed over by the cache store
    pub payload: Vec<u8>,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry written at `now_ms` that lives for `ttl`.
    pub fn new(payload: Vec<u8>, now_ms: u64, ttl: Duration) -> Self {
        Self {
            payload,
            expires_at: now_ms.saturating_add(duration_ms(ttl)),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is expired once `now_ms >= expires_at`, so a zero TTL entry is
    /// never readable.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new(b"value".to_vec(), 1_000, Duration::from_secs(60));

        assert_eq!(entry.payload, b"value");
        assert_eq!(entry.expires_at, 61_000);
        assert!(!entry.is_expired_at(1_000));
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(b"value".to_vec(), 0, Duration::from_secs(1));

        assert!(!entry.is_expired_at(999));
        assert!(entry.is_expired_at(1_000));
        assert!(entry.is_expired_at(5_000));
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let entry = CacheEntry::new(b"value".to_vec(), 500, Duration::ZERO);
        assert!(entry.is_expired_at(500), "Entry should be expired at boundary");
    }
}
