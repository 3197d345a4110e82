use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,

    /// Address the SSE endpoint binds to
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Interval between SSE keep-alive comments (unit: seconds)
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            listen_address: default_listen_address(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_address.parse().map_err(|e| {
            Error::InvalidConfig(format!(
                "server.listen_address {} is not a socket address: {}",
                self.listen_address, e
            ))
        })
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.socket_addr()?;
        if self.keep_alive_secs == 0 {
            return Err(Error::InvalidConfig("server.keep_alive_secs must be greater than 0".into()));
        }
        Ok(())
    }
}

fn default_server_enabled() -> bool {
    true
}

fn default_listen_address() -> String {
    "127.0.0.1:7080".to_string()
}

fn default_keep_alive_secs() -> u64 {
    15
}
