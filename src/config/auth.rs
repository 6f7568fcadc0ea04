//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Authentication configuration (shared-secret token verification)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared signing secret for credential tokens
    pub token_secret: String,

    /// Clock-skew leeway applied to expiry checks, in seconds
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// Production requires a secret of at least 32 bytes.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.token_secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_TOKEN_SECRET"));
        }
        if *environment == Environment::Production && self.token_secret.len() < 32 {
            return Err(ValidationError::WeakTokenSecret);
        }
        Ok(())
    }
}

fn default_leeway() -> u64 {
    30
}
