//! Core domain entities.
//!
//! Entities follow the "New Type" pattern with separate structs for creation
//! and partial updates:
//! - [`ShortLink`] - the canonical record
//! - [`NewShortLink`] - input for inserts
//! - [`LinkPatch`] - owner-initiated field updates

pub mod link;

pub use link::{LinkPatch, NewShortLink, ShortLink};
