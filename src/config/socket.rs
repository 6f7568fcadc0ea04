//! Socket lifecycle configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Socket lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SocketConfig {
    /// Connections idle longer than this are forcibly closed, in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// How often the idle sweep runs, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl SocketConfig {
    /// Idle threshold as a Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Sweep cadence as a Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate socket configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.idle_timeout_secs == 0 {
            return Err(ValidationError::InvalidIdleTimeout);
        }
        if self.sweep_interval_secs == 0 || self.sweep_interval_secs > self.idle_timeout_secs {
            return Err(ValidationError::InvalidSweepInterval);
        }
        Ok(())
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    15
}
