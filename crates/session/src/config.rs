use std::time::Duration;

use wsmux_core::config::secs_or;
use wsmux_core::ConfigError;

/// Default heartbeat period for the main channel.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 200;

/// Default time without input before the user counts as idle.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Timing knobs shared by every session a manager opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Interval between activity updates on the main channel.
    pub heartbeat_period: Duration,
    /// Used by [`IdleTracker`](crate::IdleTracker) built from these settings.
    pub idle_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            heartbeat_period: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl SessionSettings {
    /// Load settings from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `WSMUX_HEARTBEAT_SECS`    | `200`   |
    /// | `WSMUX_IDLE_TIMEOUT_SECS` | `60`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            heartbeat_period: secs_or("WSMUX_HEARTBEAT_SECS", DEFAULT_HEARTBEAT_SECS)?,
            idle_timeout: secs_or("WSMUX_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)?,
        })
    }
}
