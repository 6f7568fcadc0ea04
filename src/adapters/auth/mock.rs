//! Mock token verifier for tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, Identity};
use crate::ports::TokenVerifier;

/// Test double mapping literal token strings to identities.
///
/// Unknown tokens are rejected as `InvalidToken`, matching the production
/// verifier's behavior for bad signatures.
#[derive(Debug, Default)]
pub struct MockTokenVerifier {
    identities: HashMap<String, Identity>,
}

impl MockTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token that resolves to the given identity.
    pub fn with_identity(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.identities.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl TokenVerifier for MockTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.identities
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
