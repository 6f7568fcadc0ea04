//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the
//! `STORELINE_NOTIFY` prefix and nested keys use double underscores.
//!
//! # Example
//!
//! ```no_run
//! use storeline_notify::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod error;
mod redis;
mod server;
mod socket;

pub use auth::AuthConfig;
pub use error::{ConfigError, ValidationError};
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};
pub use socket::SocketConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, CORS)
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication configuration (token secret)
    pub auth: AuthConfig,

    /// Redis configuration (pub/sub channel)
    pub redis: RedisConfig,

    /// Socket lifecycle tuning (idle eviction)
    #[serde(default)]
    pub socket: SocketConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Reads a `.env` file if present, then environment variables such as
    /// `STORELINE_NOTIFY__SERVER__PORT=8080` or
    /// `STORELINE_NOTIFY__REDIS__URL=redis://localhost:6379`.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("STORELINE_NOTIFY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.redis.validate()?;
        self.socket.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("STORELINE_NOTIFY__AUTH__TOKEN_SECRET", "dev-secret");
        env::set_var("STORELINE_NOTIFY__REDIS__URL", "redis://localhost:6379");
    }

    fn clear_env() {
        env::remove_var("STORELINE_NOTIFY__AUTH__TOKEN_SECRET");
        env::remove_var("STORELINE_NOTIFY__REDIS__URL");
        env::remove_var("STORELINE_NOTIFY__SERVER__PORT");
        env::remove_var("STORELINE_NOTIFY__SOCKET__IDLE_TIMEOUT_SECS");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.auth.token_secret, "dev-secret");
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_applied() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.socket.idle_timeout_secs, 60);
        assert_eq!(config.redis.channel, "storeline.events");
    }

    #[test]
    fn test_custom_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("STORELINE_NOTIFY__SERVER__PORT", "3000");
        env::set_var("STORELINE_NOTIFY__SOCKET__IDLE_TIMEOUT_SECS", "120");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.socket.idle_timeout_secs, 120);
    }
}
