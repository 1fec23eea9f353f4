//! Data Transfer Objects for API requests and responses.
//!
//! Request DTOs are validated with `validator` before reaching the services.

pub mod health;
pub mod link;
pub mod metadata;
pub mod shorten;
pub mod stats;
pub mod update_link;
