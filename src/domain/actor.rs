//! Request actors and their rate-limit identities.

use std::fmt;
use std::net::IpAddr;

/// The party issuing a request.
///
/// Authenticated and anonymous actors live in separate key namespaces, so a
/// user and an address never share a rate budget even if the strings collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Actor {
    /// Stable identity asserted by the upstream authentication layer.
    User(String),
    /// Network-address-derived identity.
    Anonymous(IpAddr),
}

impl Actor {
    /// Namespaced identity used in `rate:<key>` counters.
    pub fn key(&self) -> String {
        match self {
            Self::User(id) => format!("user:{id}"),
            Self::Anonymous(ip) => format!("ip:{ip}"),
        }
    }

    /// Owner recorded on links this actor creates.
    pub fn owner(&self) -> Option<&str> {
        match self {
            Self::User(id) => Some(id),
            Self::Anonymous(_) => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
