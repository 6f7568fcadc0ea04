//! TokenVerifier port - validates a credential token into an identity.
//!
//! The lifecycle handler only sees this interface; whether the production
//! verifier checks an HS256 signature or a test double looks up a map is an
//! adapter concern.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, Identity};

/// Port for verifying an opaque credential token.
///
/// Verification must have no side effects on failure: a rejected token
/// leaves no trace in any registry.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a token and resolve the identity it carries.
    ///
    /// Any malformed, expired, or invalid-signature token is an `AuthError`.
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn TokenVerifier) {}
}
