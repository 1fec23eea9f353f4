//! Business logic services for the application layer.

pub mod analytics_service;
pub mod click_accounting;
pub mod link_service;
pub mod rate_limiter;
pub mod reclamation;
pub mod resolution_cache;

pub use analytics_service::AnalyticsService;
pub use click_accounting::{ClickAccounting, DurableIncrement};
pub use link_service::{CodeSource, CreateLink, LinkService};
pub use rate_limiter::RateLimiter;
pub use reclamation::Reclaimer;
pub use resolution_cache::ResolutionCache;
