//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid listen address")]
    InvalidListenAddress,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Channel name cannot be empty")]
    EmptyChannel,

    #[error("Token secret must be at least 32 bytes in production")]
    WeakTokenSecret,

    #[error("Idle timeout must be greater than zero")]
    InvalidIdleTimeout,

    #[error("Sweep interval must be greater than zero and at most the idle timeout")]
    InvalidSweepInterval,
}
