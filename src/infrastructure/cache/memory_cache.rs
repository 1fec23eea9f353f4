//! In-process cache store.
//!
//! Backs single-node deployments without Redis and the integration tests.
//! Expiry runs on the tokio clock, so `tokio::time::pause` and `advance`
//! drive TTLs deterministically.

use super::service::{CacheError, CacheResult, CacheStore};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Slot {
    Text(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Writes between full sweeps of expired entries.
const SWEEP_EVERY: u64 = 1024;

/// Cache store kept in a process-local map.
///
/// Expired entries are dropped on access, and every [`SWEEP_EVERY`] writes
/// the whole map is swept so keys that are never read again do not pile up.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    writes: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining time to live of `key`, or `None` if the key is absent or persistent.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.lock().ok()?;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Number of stored entries, expired ones included until they are swept.
    pub fn entry_count(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::OperationError("memory cache lock poisoned".into()))
    }

    /// Locks the map for a write, sweeping expired entries when one is due.
    fn lock_for_write(&self, now: Instant) -> CacheResult<MutexGuard<'_, HashMap<String, Entry>>> {
        let mut entries = self.lock()?;
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            entries.retain(|_, entry| entry.is_live(now));
        }
        Ok(entries)
    }

    /// Returns the live entry for `key`, evicting it first if it has expired.
    fn live<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }

    fn deadline(now: Instant, ttl_seconds: u64) -> Instant {
        now + Duration::from_secs(ttl_seconds.max(1))
    }

    fn wrong_type(key: &str) -> CacheError {
        CacheError::OperationError(format!("wrong value type at key {key}"))
    }

    fn bump(entries: &mut HashMap<String, Entry>, key: &str, now: Instant) -> CacheResult<(i64, bool)> {
        match Self::live(entries, key, now) {
            Some(entry) => {
                let Slot::Text(raw) = &mut entry.slot else {
                    return Err(Self::wrong_type(key));
                };
                let current: i64 = raw.parse().map_err(|_| {
                    CacheError::OperationError(format!("value at key {key} is not an integer"))
                })?;
                let next = current + 1;
                *raw = next.to_string();
                Ok((next, entry.expires_at.is_some()))
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        slot: Slot::Text("1".to_string()),
                        expires_at: None,
                    },
                );
                Ok((1, false))
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.lock()?;
        match Self::live(&mut entries, key, Instant::now()) {
            Some(Entry {
                slot: Slot::Text(value),
                ..
            }) => Ok(Some(value.clone())),
            Some(_) => Err(Self::wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let now = Instant::now();
        self.lock_for_write(now)?.insert(
            key.to_string(),
            Entry {
                slot: Slot::Text(value.to_string()),
                expires_at: Some(Self::deadline(now, ttl_seconds)),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| entry.is_live(now))
            .count();
        Ok(removed as u64)
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let now = Instant::now();
        let mut entries = self.lock_for_write(now)?;
        let (count, _) = Self::bump(&mut entries, key, now)?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        match Self::live(&mut entries, key, now) {
            Some(entry) => {
                entry.expires_at = Some(Self::deadline(now, ttl_seconds));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn incr_window(&self, key: &str, window_seconds: u64) -> CacheResult<i64> {
        let now = Instant::now();
        let mut entries = self.lock_for_write(now)?;
        let (count, has_ttl) = Self::bump(&mut entries, key, now)?;
        if !has_ttl && let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Self::deadline(now, window_seconds));
        }
        Ok(count)
    }

    async fn push_capped(&self, key: &str, value: &str, cap: usize) -> CacheResult<()> {
        let now = Instant::now();
        let mut entries = self.lock_for_write(now)?;
        if Self::live(&mut entries, key, now).is_none() {
            entries.insert(
                key.to_string(),
                Entry {
                    slot: Slot::List(VecDeque::new()),
                    expires_at: None,
                },
            );
        }
        let Some(Entry {
            slot: Slot::List(list),
            ..
        }) = entries.get_mut(key)
        else {
            return Err(Self::wrong_type(key));
        };
        list.push_front(value.to_string());
        list.truncate(cap.max(1));
        Ok(())
    }

    async fn list_range(&self, key: &str, limit: usize) -> CacheResult<Vec<String>> {
        let mut entries = self.lock()?;
        match Self::live(&mut entries, key, Instant::now()) {
            Some(Entry {
                slot: Slot::List(list),
                ..
            }) => Ok(list.iter().take(limit).cloned().collect()),
            Some(_) => Err(Self::wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn health_check(&self) -> bool {
        self.lock().is_ok()
    }
}
