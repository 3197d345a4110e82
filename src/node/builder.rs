//! Fluent construction of [`ResourceController`]s.
//!
//! A standalone builder starts from the crate defaults and a private
//! registry and cache. Builders handed out by [`StreamNode::controller`]
//! come pre-wired with the node's shared state and configured timings.
//!
//! ## Example
//! ```ignore
//! let controller = node
//!     .controller("Pod", ClusterRef::new("kubeconfig", "prod"), replica, projection)
//!     .cache_key("podInformer")
//!     .additional_stream(StreamKey::from("prod-pod-metrics"), move || publish_metrics())
//!     .build();
//! ```
//!
//! [`StreamNode::controller`]: crate::StreamNode::controller

use std::sync::Arc;
use std::time::Duration;

use crate::constants::DEFAULT_COALESCING_WINDOW;
use crate::constants::DEFAULT_SYNC_POLL_INTERVAL;
use crate::AdditionalStream;
use crate::ClusterRef;
use crate::EventCoalescer;
use crate::Projection;
use crate::ResourceController;
use crate::Result;
use crate::SharedCache;
use crate::StreamKey;
use crate::StreamRegistry;
use crate::SynchronizedReplica;

pub struct ControllerBuilder<S: SynchronizedReplica> {
    kind: String,
    cluster: ClusterRef,
    replica: Arc<S>,
    projection: Arc<dyn Projection<S::Object>>,
    cache_key: Option<String>,
    coalescing_window: Duration,
    sync_poll_interval: Duration,
    registry: Option<StreamRegistry>,
    shared_cache: Option<SharedCache>,
    coalescer: Option<EventCoalescer>,
    additional_streams: Vec<AdditionalStream>,
}

impl<S: SynchronizedReplica> ControllerBuilder<S> {
    pub fn new(
        kind: impl Into<String>,
        cluster: ClusterRef,
        replica: Arc<S>,
        projection: Arc<dyn Projection<S::Object>>,
    ) -> Self {
        Self {
            kind: kind.into(),
            cluster,
            replica,
            projection,
            cache_key: None,
            coalescing_window: DEFAULT_COALESCING_WINDOW,
            sync_poll_interval: DEFAULT_SYNC_POLL_INTERVAL,
            registry: None,
            shared_cache: None,
            coalescer: None,
            additional_streams: Vec::new(),
        }
    }

    /// Idempotency cache key; defaults to `{kind}Informer`
    pub fn cache_key(
        mut self,
        cache_key: impl Into<String>,
    ) -> Self {
        self.cache_key = Some(cache_key.into());
        self
    }

    pub fn coalescing_window(
        mut self,
        window: Duration,
    ) -> Self {
        self.coalescing_window = window;
        self
    }

    pub fn sync_poll_interval(
        mut self,
        interval: Duration,
    ) -> Self {
        self.sync_poll_interval = interval;
        self
    }

    pub fn registry(
        mut self,
        registry: StreamRegistry,
    ) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn shared_cache(
        mut self,
        cache: SharedCache,
    ) -> Self {
        self.shared_cache = Some(cache);
        self
    }

    /// Shares an existing coalescer instead of creating one per controller.
    ///
    /// Overrides `coalescing_window`.
    pub fn coalescer(
        mut self,
        coalescer: EventCoalescer,
    ) -> Self {
        self.coalescer = Some(coalescer);
        self
    }

    /// Adds a caller-defined stream re-produced on every change of the kind
    pub fn additional_stream<F>(
        mut self,
        key: StreamKey,
        producer: F,
    ) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.additional_streams.push(AdditionalStream {
            key,
            producer: Arc::new(producer),
        });
        self
    }

    pub fn build(self) -> ResourceController<S> {
        let cache_key = self
            .cache_key
            .unwrap_or_else(|| format!("{}Informer", self.kind));
        let coalescer = self
            .coalescer
            .unwrap_or_else(|| EventCoalescer::new(self.coalescing_window));

        ResourceController::new(
            self.kind,
            self.cluster,
            cache_key,
            self.replica,
            self.projection,
            coalescer,
            self.registry.unwrap_or_default(),
            self.shared_cache.unwrap_or_default(),
            self.sync_poll_interval,
            self.additional_streams,
        )
    }
}
