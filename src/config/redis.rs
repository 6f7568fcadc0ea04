//! Redis configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Redis configuration (pub/sub channel)
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Pub/sub channel name carrying notification events
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl RedisConfig {
    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.channel.trim().is_empty() {
            return Err(ValidationError::EmptyChannel);
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            channel: default_channel(),
        }
    }
}

fn default_channel() -> String {
    "storeline.events".to_string()
}
