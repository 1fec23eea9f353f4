//! HTTP middleware and extractors.
//!
//! - [`actor`] - resolves the caller identity for rate limiting and ownership
//! - [`tracing`] - request/response logging

pub mod actor;
pub mod tracing;

pub use actor::RequestActor;
