use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_SUBSCRIBER_BUFFER_SIZE;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PublisherConfig {
    /// Per-subscriber channel capacity
    ///
    /// Payloads published while a subscriber's buffer is full are dropped for
    /// that subscriber only.
    #[serde(default = "default_subscriber_buffer_size")]
    pub subscriber_buffer_size: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer_size: default_subscriber_buffer_size(),
        }
    }
}

impl PublisherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.subscriber_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "publisher.subscriber_buffer_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_subscriber_buffer_size() -> usize {
    DEFAULT_SUBSCRIBER_BUFFER_SIZE
}
