//! Short link entity and its write-side companions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A short code mapped to a destination URL.
///
/// The durable store owns this record. Caches only ever hold a projection of
/// `target` (and, separately, a realtime click counter).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortLink {
    pub code: String,
    pub target: String,
    pub owner: Option<String>,
    pub is_custom: bool,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
    pub metadata: BTreeMap<String, String>,
}

impl ShortLink {
    /// A link resolves only while it is active and unexpired.
    pub fn is_resolvable(&self, now: DateTime<Utc>) -> bool {
        self.active && now < self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns true if `owner` owns this link. Anonymous links have no owner.
    pub fn is_owned_by(&self, owner: Option<&str>) -> bool {
        matches!((self.owner.as_deref(), owner), (Some(a), Some(b)) if a == b)
    }

    /// Whole seconds left until expiry, zero once expired.
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }
}

/// Input for inserting a new link.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShortLink {
    pub code: String,
    pub target: String,
    pub owner: Option<String>,
    pub is_custom: bool,
    pub expires_at: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
}

/// Owner-initiated partial update.
///
/// `None` fields are left unchanged. `metadata` entries are merged into the
/// existing bag, never replacing it. Click counts only move through
/// [`crate::domain::repositories::LinkRepository::increment_clicks`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPatch {
    pub target: Option<String>,
    pub active: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: BTreeMap<String, String>,
}

impl LinkPatch {
    pub fn is_empty(&self) -> bool {
        self.target.is_none()
            && self.active.is_none()
            && self.expires_at.is_none()
            && self.metadata.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link(active: bool, expires_in: Duration) -> ShortLink {
        let now = Utc::now();
        ShortLink {
            code: "abc123".to_string(),
            target: "https://example.com/page".to_string(),
            owner: None,
            is_custom: false,
            click_count: 0,
            created_at: now,
            expires_at: now + expires_in,
            active,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_active_unexpired_link_is_resolvable() {
        assert!(link(true, Duration::days(1)).is_resolvable(Utc::now()));
    }

    #[test]
    fn test_inactive_link_is_not_resolvable() {
        let link = link(false, Duration::days(1));
        assert!(!link.is_resolvable(Utc::now()));
        assert!(!link.is_expired(Utc::now()));
    }

    #[test]
    fn test_expired_link_is_not_resolvable() {
        let link = link(true, Duration::seconds(-1));
        assert!(link.is_expired(Utc::now()));
        assert!(!link.is_resolvable(Utc::now()));
        assert_eq!(link.seconds_until_expiry(Utc::now()), 0);
    }

    #[test]
    fn test_ownership() {
        let mut owned = link(true, Duration::days(1));
        owned.owner = Some("user-1".to_string());

        assert!(owned.is_owned_by(Some("user-1")));
        assert!(!owned.is_owned_by(Some("user-2")));
        assert!(!owned.is_owned_by(None));

        let anonymous = link(true, Duration::days(1));
        assert!(!anonymous.is_owned_by(None));
    }

    #[test]
    fn test_empty_patch() {
        assert!(LinkPatch::default().is_empty());

        let patch = LinkPatch {
            active: Some(false),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
