//! Tunable policy values consumed by the core services.

use chrono::Duration;

/// Policy knobs shared by the code generator, caches and limiters.
///
/// Built from [`crate::config::Config::policy`]; `Default` mirrors the
/// configuration defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub code_length: usize,
    pub max_generation_attempts: u32,
    pub anonymous_cache_ttl_seconds: u64,
    pub owner_cache_ttl_seconds: u64,
    pub retention_days: i64,
    pub rate_window_seconds: u64,
    pub rate_max_requests: u64,
    pub analytics_max_events: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            code_length: 7,
            max_generation_attempts: 5,
            anonymous_cache_ttl_seconds: 86_400,
            owner_cache_ttl_seconds: 604_800,
            retention_days: 30,
            rate_window_seconds: 3_600,
            rate_max_requests: 100,
            analytics_max_events: 1_000,
        }
    }
}

impl Policy {
    /// Cache TTL tier: owned links are expected to be reused more.
    pub fn cache_ttl_for(&self, owner: Option<&str>) -> u64 {
        match owner {
            Some(_) => self.owner_cache_ttl_seconds,
            None => self.anonymous_cache_ttl_seconds,
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::days(self.retention_days)
    }
}
