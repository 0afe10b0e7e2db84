//! Tick clock configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SyncError;

/// Clock mode and timer settings, fixed at `init()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynchronizeConfig {
    /// The host drives ticks with `next_tick()`; otherwise an internal
    /// timer advances them (experimental).
    pub synchronous: bool,
    /// Watchdog window in synchronous mode
    pub watchdog_timeout_ms: u64,
    /// Tick period in asynchronous mode
    pub async_tick_interval_ms: u64,
}

impl Default for SynchronizeConfig {
    fn default() -> Self {
        Self {
            synchronous: true,
            watchdog_timeout_ms: 5000,
            async_tick_interval_ms: 100,
        }
    }
}

impl SynchronizeConfig {
    /// Host-driven ticks guarded by a watchdog
    pub fn synchronous(watchdog_timeout_ms: u64) -> Self {
        Self {
            synchronous: true,
            watchdog_timeout_ms,
            ..Self::default()
        }
    }

    /// Timer-driven ticks
    pub fn asynchronous(async_tick_interval_ms: u64) -> Self {
        Self {
            synchronous: false,
            async_tick_interval_ms,
            ..Self::default()
        }
    }

    /// Reject zero-length timer periods
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.synchronous && self.watchdog_timeout_ms == 0 {
            return Err(SyncError::InvalidConfig {
                reason: "watchdogTimeoutMs must be greater than 0".to_string(),
            });
        }
        if !self.synchronous && self.async_tick_interval_ms == 0 {
            return Err(SyncError::InvalidConfig {
                reason: "asyncTickIntervalMs must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Watchdog window
    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    /// Asynchronous tick period
    pub fn async_tick_interval(&self) -> Duration {
        Duration::from_millis(self.async_tick_interval_ms)
    }
}
