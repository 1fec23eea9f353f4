//! Utility functions for code generation, URL processing, and request handling.
//!
//! - [`code_generator`] - Short code generation and custom code validation
//! - [`url_normalizer`] - Target URL normalization and sanitization
//! - [`client_ip`] - Client address resolution for anonymous actors
//! - [`db_error`] - Database error classification

pub mod client_ip;
pub mod code_generator;
pub mod db_error;
pub mod url_normalizer;
