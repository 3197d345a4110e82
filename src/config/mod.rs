//! Configuration management for the stream dispatch layer.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`KSTREAM__` prefix)
//! - Component-wise validation
mod coalescer;
mod controller;
mod monitoring;
mod publisher;
mod server;
pub use coalescer::*;
pub use controller::*;
pub use monitoring::*;
pub use publisher::*;
pub use server::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

const ENV_PREFIX: &str = "KSTREAM";

/// Main configuration container for the stream dispatch components
///
/// Merge order (later sources override earlier):
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StreamNodeConfig {
    /// Change coalescing window
    #[serde(default)]
    pub coalescer: CoalescerConfig,
    /// Resource controller sync behaviour
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Subscriber channel sizing
    #[serde(default)]
    pub publisher: PublisherConfig,
    /// SSE endpoint
    #[serde(default)]
    pub server: ServerConfig,
    /// Metrics and monitoring settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl StreamNodeConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// # Note
    /// Validation is deferred so further overrides can be applied via
    /// `with_override_config()`. Callers MUST call `validate()` before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("KSTREAM__COALESCER__WINDOW_MS", "500");
    /// let cfg = StreamNodeConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Environment variables are re-applied on top so they keep the highest
    /// priority.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.coalescer.validate()?;
        self.controller.validate(&self.coalescer)?;
        self.publisher.validate()?;
        self.server.validate()?;
        self.monitoring.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
