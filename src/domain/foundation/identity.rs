//! Identity types resolved from a validated credential token.
//!
//! These are domain types with no provider dependencies; any token scheme
//! can populate them via the `TokenVerifier` port.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{StoreId, UserId};

/// Verified identity of a connected client.
///
/// The store affiliation is fixed at authentication time and holds for the
/// lifetime of the connection it authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The unique user identifier from the token subject.
    pub user_id: UserId,

    /// The store (tenant) this connection is affiliated with.
    pub store_id: StoreId,

    /// The user's role within the store.
    pub role: Role,
}

/// Role of a user within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Staff,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
        };
        write!(f, "{}", s)
    }
}

/// Authentication errors that can occur during token verification.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No credential token was supplied with the handshake.
    #[error("Missing credential token")]
    MissingToken,

    /// The token is malformed, has a bad signature, or carries unusable claims.
    #[error("Invalid token")]
    InvalidToken,

    /// The token has expired (separate from InvalidToken for specific handling).
    #[error("Token expired")]
    TokenExpired,
}

impl AuthError {
    /// Returns true if the client should obtain a fresh token and reconnect.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }
}
