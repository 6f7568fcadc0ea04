//! Shared-secret JWT adapter for credential verification.
//!
//! Tokens are HS256 JWTs signed with the secret from `auth.token_secret`.
//! Verification checks the signature and expiry and maps the claims to the
//! domain `Identity` type. Claims layout:
//!
//! - `sub` - user identifier
//! - `store_id` - store (tenant) affiliation
//! - `role` - `admin` | `manager` | `staff`
//! - `exp` - Unix expiry, enforced with configured leeway

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, Identity, Role, StoreId, UserId};
use crate::ports::TokenVerifier;

/// Claims carried by a Storeline credential token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject - the user ID
    sub: String,

    /// Store affiliation
    store_id: String,

    /// Role within the store
    role: Role,

    /// Expiry timestamp (Unix epoch seconds)
    exp: i64,

    /// Issued at timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
}

/// HS256 token verifier backed by a shared signing secret.
///
/// This is the production implementation of `TokenVerifier`. Verification
/// is pure in-memory work; the `async` surface exists only to match the
/// port contract.
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    /// Create a verifier from the shared secret.
    ///
    /// `leeway_secs` tolerates clock skew between the token issuer and
    /// this service when checking expiry.
    pub fn new(secret: &str, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        let claims = data.claims;
        let user_id = UserId::new(claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let store_id = StoreId::new(claims.store_id).map_err(|_| AuthError::InvalidToken)?;

        Ok(Identity {
            user_id,
            store_id,
            role: claims.role,
        })
    }
}
