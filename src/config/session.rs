//! Session lifecycle configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Session lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Seconds of inactivity after which a session is reaped
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Seconds between idle sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Capacity of the event broadcast channel
    #[serde(default = "default_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SessionConfig {
    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.idle_timeout_secs == 0 {
            return Err(ValidationError::InvalidIdleTimeout);
        }
        if self.sweep_interval_secs == 0 || self.sweep_interval_secs > self.idle_timeout_secs {
            return Err(ValidationError::InvalidSweepInterval);
        }
        if self.event_channel_capacity == 0 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            event_channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    1800
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    128
}
