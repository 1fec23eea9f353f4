//! REST API layer for HTTP request/response handling.
//!
//! This layer translates HTTP requests into service operations and renders
//! their outcomes.
//!
//! # Modules
//!
//! - [`dto`] - Data Transfer Objects for request/response serialization
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Actor extraction and request tracing
//! - [`response`] - Outcome to HTTP status mapping
//! - [`routes`] - Route configuration

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
