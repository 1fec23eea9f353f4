//! Click analytics read from the realtime tier.
//!
//! Aggregates are computed on read from the bounded `analytics:<code>` event
//! log, so they cover at most the newest `ANALYTICS_MAX_EVENTS` clicks. The
//! durable count is exact.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;

use crate::application::services::click_accounting::ClickAccounting;
use crate::application::services::link_service::LinkService;
use crate::domain::actor::Actor;
use crate::domain::click_event::ClickEvent;
use crate::error::AppError;

const TOP_REFERRERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferrerCount {
    pub referrer: String,
    pub count: u64,
}

/// Activity over the last hour and day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeStats {
    pub clicks_last_hour: u64,
    pub clicks_last_24_hours: u64,
    /// Clicks of the last day keyed by UTC hour of day.
    pub hourly: BTreeMap<u32, u64>,
    pub top_referrers: Vec<ReferrerCount>,
    pub devices: BTreeMap<String, u64>,
}

/// Distribution of clicks over a window of days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub days: u32,
    pub total: u64,
    pub devices: BTreeMap<String, u64>,
    pub browsers: BTreeMap<String, u64>,
    pub referrers: BTreeMap<String, u64>,
    pub hourly: BTreeMap<u32, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkStats {
    pub code: String,
    pub target: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub durable_clicks: i64,
    pub realtime_clicks: i64,
    pub realtime: RealtimeStats,
}

pub struct AnalyticsService {
    links: Arc<LinkService>,
    clicks: Arc<ClickAccounting>,
}

impl AnalyticsService {
    pub fn new(links: Arc<LinkService>, clicks: Arc<ClickAccounting>) -> Self {
        Self { links, clicks }
    }

    /// Counters and realtime analytics for a link owned by `actor`.
    ///
    /// # Errors
    ///
    /// [`AppError::NotFound`] or [`AppError::Forbidden`].
    pub async fn link_stats(&self, actor: &Actor, code: &str) -> Result<LinkStats, AppError> {
        let link = self.links.owned_link(actor, code).await?;
        let realtime_clicks = self.clicks.realtime_clicks(code).await;
        let events = self.clicks.recent_events(code).await;

        Ok(LinkStats {
            realtime: realtime_stats(&events, Utc::now()),
            code: link.code,
            target: link.target,
            active: link.active,
            created_at: link.created_at,
            expires_at: link.expires_at,
            durable_clicks: link.click_count,
            realtime_clicks,
        })
    }

    /// Distribution over the last `days` days for a link owned by `actor`.
    pub async fn summary(
        &self,
        actor: &Actor,
        code: &str,
        days: u32,
    ) -> Result<AnalyticsSummary, AppError> {
        self.links.owned_link(actor, code).await?;
        let events = self.clicks.recent_events(code).await;
        Ok(summarize(&events, days, Utc::now()))
    }
}

fn since(events: &[ClickEvent], cutoff: DateTime<Utc>) -> impl Iterator<Item = &ClickEvent> {
    events.iter().filter(move |e| e.timestamp >= cutoff)
}

fn tally<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

fn hourly<'a>(events: impl Iterator<Item = &'a ClickEvent>) -> BTreeMap<u32, u64> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(event.timestamp.hour()).or_insert(0) += 1;
    }
    counts
}

fn top_referrers<'a>(events: impl Iterator<Item = &'a ClickEvent>, limit: usize) -> Vec<ReferrerCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for event in events {
        *counts.entry(event.referrer.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<ReferrerCount> = counts
        .into_iter()
        .map(|(referrer, count)| ReferrerCount {
            referrer: referrer.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.referrer.cmp(&b.referrer)));
    ranked.truncate(limit);
    ranked
}

pub fn realtime_stats(events: &[ClickEvent], now: DateTime<Utc>) -> RealtimeStats {
    let hour_ago = now - Duration::hours(1);
    let day_ago = now - Duration::hours(24);

    RealtimeStats {
        clicks_last_hour: since(events, hour_ago).count() as u64,
        clicks_last_24_hours: since(events, day_ago).count() as u64,
        hourly: hourly(since(events, day_ago)),
        top_referrers: top_referrers(since(events, day_ago), TOP_REFERRERS),
        devices: tally(since(events, day_ago).map(|e| e.device.as_str())),
    }
}

pub fn summarize(events: &[ClickEvent], days: u32, now: DateTime<Utc>) -> AnalyticsSummary {
    let cutoff = now - Duration::days(i64::from(days));

    AnalyticsSummary {
        days,
        total: since(events, cutoff).count() as u64,
        devices: tally(since(events, cutoff).map(|e| e.device.as_str())),
        browsers: tally(since(events, cutoff).map(|e| e.browser.as_str())),
        referrers: tally(since(events, cutoff).map(|e| e.referrer.as_str())),
        hourly: hourly(since(events, cutoff)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile/15E148 Safari/604.1";
    const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 30, 0).unwrap()
    }

    fn events() -> Vec<ClickEvent> {
        let now = now();
        vec![
            ClickEvent::at(now - Duration::minutes(5), Some(IPHONE), Some("https://t.co/x")),
            ClickEvent::at(now - Duration::minutes(50), Some(FIREFOX), Some("https://t.co/y")),
            ClickEvent::at(now - Duration::hours(3), Some(FIREFOX), None),
            ClickEvent::at(now - Duration::hours(30), Some(IPHONE), Some("https://news.example/")),
            ClickEvent::at(now - Duration::days(40), Some(FIREFOX), None),
        ]
    }

    #[test]
    fn test_realtime_windows() {
        let stats = realtime_stats(&events(), now());

        assert_eq!(stats.clicks_last_hour, 2);
        assert_eq!(stats.clicks_last_24_hours, 3);
        assert_eq!(stats.hourly.get(&12), Some(&1));
        assert_eq!(stats.hourly.get(&11), Some(&1));
        assert_eq!(stats.hourly.get(&9), Some(&1));
        assert_eq!(stats.devices.get("mobile"), Some(&1));
        assert_eq!(stats.devices.get("desktop"), Some(&2));
    }

    #[test]
    fn test_top_referrers_ranked_by_count() {
        let stats = realtime_stats(&events(), now());

        assert_eq!(
            stats.top_referrers,
            vec![
                ReferrerCount {
                    referrer: "t.co".to_string(),
                    count: 2
                },
                ReferrerCount {
                    referrer: "direct".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_summary_respects_day_window() {
        let summary = summarize(&events(), 30, now());

        assert_eq!(summary.total, 4);
        assert_eq!(summary.browsers.get("firefox"), Some(&2));
        assert_eq!(summary.browsers.get("safari"), Some(&2));
        assert_eq!(summary.referrers.get("news.example"), Some(&1));
    }

    #[test]
    fn test_empty_log() {
        let stats = realtime_stats(&[], now());
        assert_eq!(stats.clicks_last_24_hours, 0);
        assert!(stats.top_referrers.is_empty());
        assert!(stats.hourly.is_empty());
    }
}
