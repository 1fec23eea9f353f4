//! Application layer services implementing business logic.
//!
//! Services receive their collaborators as injected `Arc<dyn …>` capabilities
//! and expose a clean API to HTTP handlers and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::LinkService`] - Link creation, resolution and owner management
//! - [`services::ResolutionCache`] - Cache-aside reads and durable-first writes
//! - [`services::ClickAccounting`] - Realtime and durable click counting
//! - [`services::RateLimiter`] - Per-actor fixed-window request budgets
//! - [`services::AnalyticsService`] - Realtime click analytics
//! - [`services::Reclaimer`] - Expired link reclamation

pub mod services;
