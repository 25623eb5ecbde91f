//! Retry schedule for channel connections.
//!
//! A channel task asks its [`Backoff`] how long to wait after each failed
//! attempt. The wait doubles up to a ceiling and starts over once the
//! channel is connected again.

use std::time::Duration;

use wsmux_core::config::secs_or;
use wsmux_core::ConfigError;

/// Retry timing shared by every channel of a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Wait after the first failed attempt.
    pub initial_delay: Duration,
    /// Ceiling for the wait.
    pub max_delay: Duration,
    /// Growth factor applied after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Defaults, with the ceiling taken from `WSMUX_RECONNECT_MAX_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            max_delay: secs_or("WSMUX_RECONNECT_MAX_SECS", defaults.max_delay.as_secs())?,
            ..defaults
        })
    }
}

/// Per-channel retry state.
#[derive(Debug)]
pub struct Backoff {
    config: ReconnectConfig,
    next: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            next: config.initial_delay,
            config,
            failures: 0,
        }
    }

    /// Record a failed attempt and return how long to wait before the
    /// next one.
    pub fn failed(&mut self) -> Duration {
        self.failures += 1;
        let wait = self.next.min(self.config.max_delay);
        self.next = wait.mul_f64(self.config.multiplier).min(self.config.max_delay);
        wait
    }

    /// Failed attempts since the last successful connection.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// The channel is connected; the next outage starts from the beginning.
    pub fn connected(&mut self) {
        self.next = self.config.initial_delay;
        self.failures = 0;
    }
}
