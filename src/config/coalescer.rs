use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_COALESCING_WINDOW;
use crate::Error;
use crate::Result;

/// Change coalescing parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CoalescerConfig {
    /// All triggers for one stream key arriving within this window collapse
    /// into a single producer invocation (unit: milliseconds)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
        }
    }
}

impl CoalescerConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_ms == 0 {
            return Err(Error::InvalidConfig("coalescer.window_ms must be greater than 0".into()));
        }
        Ok(())
    }
}

fn default_window_ms() -> u64 {
    DEFAULT_COALESCING_WINDOW.as_millis() as u64
}
