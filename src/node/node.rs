//! Process-wide container of the stream dispatch layer.
//!
//! ## Key Responsibilities
//! - Owns the validated configuration
//! - Shares one [`SharedCache`] and one [`StreamRegistry`] across controllers
//! - Keeps one [`EventCoalescer`] per cluster and kind, so producers of the
//!   same stream key are serialized across every controller built for it
//! - Hands out [`ControllerBuilder`]s wired to that shared state
//! - Runs the SSE and metrics servers until the shutdown signal fires
//!
//! ## Example Usage
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let node = StreamNode::from_env(shutdown_rx)?;
//! let pods = node.controller("Pod", cluster, replica, projection).build();
//! node.start_stream_server(Arc::new(pods))?;
//! node.start_metrics_server();
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;

use super::ControllerBuilder;
use crate::async_task::spawn_task;
use crate::metrics;
use crate::network;
use crate::ClusterRef;
use crate::EventCoalescer;
use crate::Projection;
use crate::Result;
use crate::SharedCache;
use crate::StreamActivator;
use crate::StreamKey;
use crate::StreamNodeConfig;
use crate::StreamRegistry;
use crate::SynchronizedReplica;

pub struct StreamNode {
    config: Arc<StreamNodeConfig>,
    shared_cache: SharedCache,
    registry: StreamRegistry,
    /// Keyed by the collection stream key of each cluster and kind
    coalescers: DashMap<StreamKey, EventCoalescer>,
    shutdown_signal: watch::Receiver<()>,
}

impl StreamNode {
    /// Validates `config` and creates empty shared state
    pub fn new(
        config: StreamNodeConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Result<Self> {
        let config = config.validate()?;
        let registry = StreamRegistry::new(config.publisher.clone());
        Ok(Self {
            config: Arc::new(config),
            shared_cache: SharedCache::new(),
            registry,
            coalescers: DashMap::new(),
            shutdown_signal,
        })
    }

    /// Loads configuration from defaults, `CONFIG_PATH` and the environment
    pub fn from_env(shutdown_signal: watch::Receiver<()>) -> Result<Self> {
        Self::new(StreamNodeConfig::new()?, shutdown_signal)
    }

    pub fn config(&self) -> &StreamNodeConfig {
        &self.config
    }

    pub fn shared_cache(&self) -> &SharedCache {
        &self.shared_cache
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    /// Builder for a controller of `kind` on `cluster`, sharing this node's
    /// cache, registry and timings.
    ///
    /// Every builder for the same cluster and kind receives the same
    /// coalescer.
    pub fn controller<S: SynchronizedReplica>(
        &self,
        kind: impl Into<String>,
        cluster: ClusterRef,
        replica: Arc<S>,
        projection: Arc<dyn Projection<S::Object>>,
    ) -> ControllerBuilder<S> {
        let kind = kind.into();
        let window = self.config.coalescer.window();
        let coalescer = self
            .coalescers
            .entry(StreamKey::collection(&cluster, &kind))
            .or_insert_with(|| EventCoalescer::new(window))
            .clone();

        ControllerBuilder::new(kind, cluster, replica, projection)
            .coalescing_window(window)
            .sync_poll_interval(self.config.controller.sync_poll_interval())
            .registry(self.registry.clone())
            .shared_cache(self.shared_cache.clone())
            .coalescer(coalescer)
    }

    /// Starts the SSE listener when enabled, returning its bound address.
    pub fn start_stream_server(
        &self,
        activator: Arc<dyn StreamActivator>,
    ) -> Result<Option<SocketAddr>> {
        if !self.config.server.enabled {
            debug!("Stream server disabled");
            return Ok(None);
        }

        let (bound, server) = network::serve(
            self.config.server.socket_addr()?,
            self.registry.clone(),
            activator,
            self.config.server.keep_alive(),
            self.shutdown_signal.clone(),
        )?;
        spawn_task("stream_server", async move {
            server.await;
            Ok(())
        });
        Ok(Some(bound))
    }

    /// Starts the Prometheus endpoint when enabled
    pub fn start_metrics_server(&self) -> Option<JoinHandle<()>> {
        if !self.config.monitoring.prometheus_enabled {
            return None;
        }
        let port = self.config.monitoring.prometheus_port;
        let shutdown_signal = self.shutdown_signal.clone();
        info!(port, "Starting metrics server");
        Some(spawn_task("metrics_server", async move {
            metrics::start_server(port, shutdown_signal).await;
            Ok(())
        }))
    }
}
