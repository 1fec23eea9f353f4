//! Domain layer containing business entities and logic.
//!
//! Independent of infrastructure and presentation concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`actor`] - Request actor identities
//! - [`policy`] - Tunable TTLs, limits and generator settings
//! - [`outcome`] - Caller-visible result variants
//! - [`click_event`] - Click analytics event model
//! - [`click_worker`] - Deferred durable click increments
//!
//! # Click Processing Flow
//!
//! 1. A redirect resolves through [`crate::application::services::ResolutionCache`]
//! 2. [`crate::application::services::ClickAccounting`] bumps the realtime counter
//!    and appends a [`click_event::ClickEvent`]
//! 3. On a cache hit a [`click_worker::ClickTask`] is queued; on a miss the durable
//!    increment happens inline
//! 4. [`click_worker::run_click_worker`] applies queued increments with retry

pub mod actor;
pub mod click_event;
pub mod click_worker;
pub mod entities;
pub mod outcome;
pub mod policy;
pub mod repositories;
