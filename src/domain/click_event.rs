//! Click analytics event with coarse client classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Referrer recorded when the request carried none.
pub const DIRECT_REFERRER: &str = "direct";

/// Coarse device class derived from the User-Agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mobile,
    Tablet,
    Desktop,
}

impl Device {
    pub fn classify(user_agent: Option<&str>) -> Self {
        let ua = user_agent.unwrap_or_default().to_ascii_lowercase();
        if ua.contains("mobile") {
            Self::Mobile
        } else if ua.contains("tablet") || ua.contains("ipad") {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

/// Coarse browser family derived from the User-Agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Edge,
    Chrome,
    Firefox,
    Safari,
    Other,
}

impl Browser {
    /// Edge and Chrome both advertise "Safari"; Edge also advertises "Chrome",
    /// so the more specific tokens are checked first.
    pub fn classify(user_agent: Option<&str>) -> Self {
        let ua = user_agent.unwrap_or_default().to_ascii_lowercase();
        if ua.contains("edg/") || ua.contains("edge/") {
            Self::Edge
        } else if ua.contains("chrome") || ua.contains("crios") {
            Self::Chrome
        } else if ua.contains("firefox") || ua.contains("fxios") {
            Self::Firefox
        } else if ua.contains("safari") {
            Self::Safari
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edge => "edge",
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Safari => "safari",
            Self::Other => "other",
        }
    }
}

/// A single resolution, appended to the bounded `analytics:<code>` log.
///
/// Holds no raw User-Agent or address, only coarse classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub timestamp: DateTime<Utc>,
    pub device: Device,
    pub browser: Browser,
    pub referrer: String,
}

impl ClickEvent {
    /// Classifies request headers into an event stamped with the current time.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let event = ClickEvent::new(Some("Mozilla/5.0 (iPhone) Mobile Safari"), Some("https://t.co/x"));
    /// assert_eq!(event.device, Device::Mobile);
    /// assert_eq!(event.referrer, "t.co");
    /// ```
    pub fn new(user_agent: Option<&str>, referer: Option<&str>) -> Self {
        Self::at(Utc::now(), user_agent, referer)
    }

    pub fn at(timestamp: DateTime<Utc>, user_agent: Option<&str>, referer: Option<&str>) -> Self {
        Self {
            timestamp,
            device: Device::classify(user_agent),
            browser: Browser::classify(user_agent),
            referrer: coarse_referrer(referer),
        }
    }
}

/// Reduces a Referer header to its host, or [`DIRECT_REFERRER`].
fn coarse_referrer(referer: Option<&str>) -> String {
    referer
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .and_then(|r| Url::parse(r).ok())
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .unwrap_or_else(|| DIRECT_REFERRER.to_string())
}
