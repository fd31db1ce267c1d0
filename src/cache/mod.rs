//! Cache Module
//!
//! Read-through caching with TTL expiration over a pluggable backend.

mod backend;
mod clock;
mod entry;
mod key;
mod memory;
mod page;
#[cfg(feature = "redis")]
mod redis;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::time::Duration;

// Re-export public types
pub use backend::CacheBackend;
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key::{CacheKey, KeyCategory, ListScope};
pub use memory::MemoryBackend;
pub use page::{PageQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
#[cfg(feature = "redis")]
pub use redis::RedisBackend;
pub use stats::{CacheStats, StatsRecorder};
pub use store::{CacheStore, Paginated};

// == Public Constants ==
/// TTL used when none is configured
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 512;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
