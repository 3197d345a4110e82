use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::CoalescerConfig;
use crate::constants::DEFAULT_SYNC_POLL_INTERVAL;
use crate::Error;
use crate::Result;

/// Upper bound on sync polls per coalescing window
const MAX_POLLS_PER_WINDOW: u64 = 40;

/// Resource controller parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Interval between `has_synced` checks while waiting for the initial
    /// replica sync (unit: milliseconds)
    #[serde(default = "default_sync_poll_interval_ms")]
    pub sync_poll_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sync_poll_interval_ms: default_sync_poll_interval_ms(),
        }
    }
}

impl ControllerConfig {
    pub fn sync_poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync_poll_interval_ms)
    }

    /// # Errors
    /// Returns `Error::InvalidConfig` when the poll interval is zero or so
    /// small relative to the coalescing window that polling would dominate.
    pub fn validate(
        &self,
        coalescer: &CoalescerConfig,
    ) -> Result<()> {
        if self.sync_poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "controller.sync_poll_interval_ms must be greater than 0".into(),
            ));
        }

        if self.sync_poll_interval_ms * MAX_POLLS_PER_WINDOW < coalescer.window_ms {
            return Err(Error::InvalidConfig(format!(
                "controller.sync_poll_interval_ms ({}) is too small for coalescer.window_ms ({})",
                self.sync_poll_interval_ms, coalescer.window_ms
            )));
        }
        Ok(())
    }
}

fn default_sync_poll_interval_ms() -> u64 {
    DEFAULT_SYNC_POLL_INTERVAL.as_millis() as u64
}
