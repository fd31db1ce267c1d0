//! Redis Backend Module
//!
//! Shared cache backend speaking `GET` / `SET PX` / `DEL` through a pooled
//! Redis connection.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::AsyncCommands;
use bb8_redis::RedisConnectionManager;
use tracing::info;

use crate::cache::CacheBackend;
use crate::error::CacheFault;

// == Redis Backend ==
/// Cache backend shared by every instance of a service.
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool<RedisConnectionManager>,
}

impl RedisBackend {
    // == Constructor ==
    /// Creates a backend for `url` without opening a connection.
    ///
    /// Connections are established on first use, so a Redis outage at startup
    /// only turns the first cache calls into misses.
    ///
    /// # Arguments
    /// * `url` - Redis URL, e.g. `redis://127.0.0.1:6379`
    /// * `connect_timeout` - How long a call may wait for a pooled connection
    pub fn connect_lazy(url: &str, connect_timeout: Duration) -> Result<Self, CacheFault> {
        let manager = RedisConnectionManager::new(url)
            .map_err(|e| CacheFault::Unavailable(format!("invalid redis url: {e}")))?;
        let pool = Pool::builder()
            .connection_timeout(connect_timeout)
            .build_unchecked(manager);

        info!(url, "Redis cache backend configured");
        Ok(Self { pool })
    }
}

/// TTL in whole milliseconds for `SET PX`. Redis rejects `PX 0`, so the
/// floor is 1 ms.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn backend_fault(err: impl std::fmt::Display) -> CacheFault {
    CacheFault::Backend(err.to_string())
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheFault> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheFault::Unavailable(e.to_string()))?;
        conn.get::<_, Option<Vec<u8>>>(key).await.map_err(backend_fault)
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheFault> {
        let millis = ttl_millis(ttl);
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheFault::Unavailable(e.to_string()))?;
        conn.pset_ex::<_, _, ()>(key, value, millis)
            .await
            .map_err(backend_fault)
    }

    async fn del(&self, key: &str) -> Result<bool, CacheFault> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheFault::Unavailable(e.to_string()))?;
        let removed: i64 = conn.del(key).await.map_err(backend_fault)?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_keeps_sub_second_precision() {
        assert_eq!(ttl_millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(ttl_millis(Duration::from_millis(250)), 250);
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = RedisBackend::connect_lazy("not a url", Duration::from_millis(50));
        assert!(matches!(result, Err(CacheFault::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_fault() {
        // Port 1 is reserved; nothing listens there
        let backend =
            RedisBackend::connect_lazy("redis://127.0.0.1:1", Duration::from_millis(200)).unwrap();

        assert!(backend.get("saldo:id:1").await.is_err());
        assert!(backend
            .set_ex("saldo:id:1", b"{}".to_vec(), Duration::from_secs(5))
            .await
            .is_err());
    }
}
