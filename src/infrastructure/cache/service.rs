//! Cache store trait and error types.

use async_trait::async_trait;
use std::time::Duration;

/// Errors that can occur during cache operations.
///
/// Always transient from the core's point of view: callers log them and fall
/// back to the durable path or carry on without the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    #[error("Cache operation error: {0}")]
    OperationError(String),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Shared, externally-owned key/value tier in front of the durable store.
///
/// Keys are namespaced per concern (see [`super::keys`]); implementations must
/// tolerate other processes writing to the same keyspace. Every call has a
/// bounded latency.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed store
/// - [`crate::infrastructure::cache::MemoryCache`] - in-process store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()>;

    /// Removes all `keys` in one round-trip. Returns how many existed.
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    /// Atomically increments an integer counter, creating it at 1.
    async fn incr(&self, key: &str) -> CacheResult<i64>;

    /// Sets a TTL on an existing key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool>;

    /// Increments a window counter and, only when it has no TTL yet, sets one.
    ///
    /// Both steps happen atomically, so concurrent first requests cannot leave
    /// a counter without expiry and later requests cannot extend the window.
    async fn incr_window(&self, key: &str, window_seconds: u64) -> CacheResult<i64>;

    /// Prepends `value` to a list and trims it to the `cap` newest entries.
    async fn push_capped(&self, key: &str, value: &str, cap: usize) -> CacheResult<()>;

    /// Returns up to `limit` newest list entries, newest first.
    async fn list_range(&self, key: &str, limit: usize) -> CacheResult<Vec<String>>;

    /// Checks if the cache backend is reachable.
    async fn health_check(&self) -> bool;
}
