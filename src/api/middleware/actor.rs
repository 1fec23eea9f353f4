//! Request actor extraction.
//!
//! Authentication happens upstream. A trusted identity header marks the
//! caller as a user; otherwise the caller is identified by network address.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};

use crate::domain::actor::Actor;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

const MAX_IDENTITY_LEN: usize = 128;

/// Extractor resolving the [`Actor`] behind a request.
///
/// # Errors
///
/// Rejects with [`AppError::Validation`] when the identity header is
/// oversized or no client address can be determined.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

impl FromRequestParts<AppState> for RequestActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = parts
            .headers
            .get(&state.http.identity_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(id) = identity {
            if id.len() > MAX_IDENTITY_LEN {
                return Err(AppError::validation("identity header is too long"));
            }
            return Ok(Self(Actor::User(id.to_string())));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        client_ip(&parts.headers, peer, state.http.behind_proxy)
            .map(|ip| Self(Actor::Anonymous(ip)))
            .ok_or_else(|| AppError::validation("cannot determine client address"))
    }
}
