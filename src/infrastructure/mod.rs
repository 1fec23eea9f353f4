//! Infrastructure layer for external integrations.
//!
//! Implements the interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`cache`] - Shared cache tier (Redis and in-process implementations)
//! - [`persistence`] - Durable link storage (PostgreSQL and in-process implementations)

pub mod cache;
pub mod persistence;
