//! Redis-backed cache store.

use super::service::{CacheError, CacheResult, CacheStore};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisResult, aio::ConnectionManager};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Redis cache store for targets, counters, rate windows and event logs.
///
/// Uses `ConnectionManager` for connection reuse and automatic reconnects.
/// Every command is bounded by `op_timeout`; errors are returned to the
/// caller, which decides whether to degrade.
///
/// Requires Redis 7 or newer (`EXPIRE … NX`).
pub struct RedisCache {
    client: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `connect_timeout` - bound on establishing the connection
    /// - `op_timeout` - bound on every subsequent command
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established in time, or the PING health check fails.
    pub async fn connect(
        redis_url: &str,
        connect_timeout: Duration,
        op_timeout: Duration,
    ) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::ConnectionError("Timed out connecting to Redis".into()))?
            .map_err(|e| {
                CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
            })?;

        let cache = Self {
            client: manager,
            op_timeout,
        };

        let mut conn = cache.client.clone();
        cache
            .run(conn.ping::<()>())
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");
        Ok(cache)
    }

    /// Bounds a Redis command by the operation timeout.
    async fn run<T, F>(&self, command: F) -> CacheResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::OperationError(e.to_string())),
            Err(_) => Err(CacheError::Timeout(self.op_timeout)),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.client.clone();
        self.run(conn.get::<_, Option<String>>(key)).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut conn = self.client.clone();
        self.run(conn.set_ex::<_, _, ()>(key, value, ttl_seconds.max(1)))
            .await?;
        debug!("Cache SET: {} (TTL: {}s)", key, ttl_seconds);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.client.clone();
        self.run(conn.del::<_, u64>(keys)).await
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.client.clone();
        self.run(conn.incr::<_, _, i64>(key, 1)).await
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool> {
        let mut conn = self.client.clone();
        self.run(conn.expire::<_, bool>(key, ttl_seconds.max(1) as i64))
            .await
    }

    async fn incr_window(&self, key: &str, window_seconds: u64) -> CacheResult<i64> {
        let mut conn = self.client.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .incr(key, 1)
            .cmd("EXPIRE")
            .arg(key)
            .arg(window_seconds.max(1))
            .arg("NX")
            .ignore();

        let (count,): (i64,) = self.run(pipe.query_async(&mut conn)).await?;
        Ok(count)
    }

    async fn push_capped(&self, key: &str, value: &str, cap: usize) -> CacheResult<()> {
        let mut conn = self.client.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .lpush(key, value)
            .ignore()
            .ltrim(key, 0, cap.max(1) as isize - 1)
            .ignore();

        self.run(pipe.query_async::<()>(&mut conn)).await
    }

    async fn list_range(&self, key: &str, limit: usize) -> CacheResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.client.clone();
        self.run(conn.lrange::<_, Vec<String>>(key, 0, limit as isize - 1))
            .await
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        self.run(conn.ping::<()>()).await.is_ok()
    }
}
