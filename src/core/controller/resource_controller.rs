use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::interval;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::change_handler::ChangeHandler;
use crate::metrics::CONTROLLER_STARTS;
use crate::ClusterRef;
use crate::EventCoalescer;
use crate::Producer;
use crate::Projection;
use crate::Resource;
use crate::ResourceEventHandler;
use crate::Result;
use crate::SharedCache;
use crate::RouteType;
use crate::StreamActivator;
use crate::StreamError;
use crate::StreamKey;
use crate::StreamQuery;
use crate::StreamRegistry;
use crate::SynchronizedReplica;

/// Producer for a caller-defined stream, re-run on every change of the kind
pub type StreamProducer = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Extra stream fanned out from every change notification
#[derive(Clone)]
pub struct AdditionalStream {
    pub key: StreamKey,
    pub producer: StreamProducer,
}

impl fmt::Debug for AdditionalStream {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("AdditionalStream").field("key", &self.key).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    /// Change handler attached and watch running
    Starting,
    /// Initial sync observed; re-entered on every change
    Synced,
}

pub(super) struct ControllerInner<S: SynchronizedReplica> {
    pub(super) kind: String,
    pub(super) cluster: ClusterRef,
    pub(super) cache_key: String,
    pub(super) collection_key: StreamKey,
    pub(super) replica: Arc<S>,
    pub(super) projection: Arc<dyn Projection<S::Object>>,
    pub(super) coalescer: EventCoalescer,
    pub(super) registry: StreamRegistry,
    pub(super) cache: SharedCache,
    pub(super) sync_poll_interval: Duration,
    pub(super) additional_streams: Vec<AdditionalStream>,
    pub(super) state: RwLock<ControllerState>,
}

/// Binds one kind's replica to the coalescer and the stream registry
///
/// Cloning yields another handle onto the same controller. The replica keeps
/// the controller's change handler alive for as long as it lives; there is no
/// teardown while the process runs.
pub struct ResourceController<S: SynchronizedReplica> {
    inner: Arc<ControllerInner<S>>,
}

impl<S: SynchronizedReplica> Clone for ResourceController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: SynchronizedReplica> fmt::Debug for ResourceController<S> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ResourceController")
            .field("kind", &self.inner.kind)
            .field("cluster", &self.inner.cluster)
            .field("state", &*self.inner.state.read())
            .finish_non_exhaustive()
    }
}

impl<S: SynchronizedReplica> ResourceController<S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        kind: String,
        cluster: ClusterRef,
        cache_key: String,
        replica: Arc<S>,
        projection: Arc<dyn Projection<S::Object>>,
        coalescer: EventCoalescer,
        registry: StreamRegistry,
        cache: SharedCache,
        sync_poll_interval: Duration,
        additional_streams: Vec<AdditionalStream>,
    ) -> Self {
        let collection_key = StreamKey::collection(&cluster, &kind);
        Self {
            inner: Arc::new(ControllerInner {
                kind,
                cluster,
                cache_key,
                collection_key,
                replica,
                projection,
                coalescer,
                registry,
                cache,
                sync_poll_interval,
                additional_streams,
                state: RwLock::new(ControllerState::Uninitialized),
            }),
        }
    }

    pub fn kind(&self) -> &str {
        &self.inner.kind
    }

    pub fn cluster(&self) -> &ClusterRef {
        &self.inner.cluster
    }

    pub fn state(&self) -> ControllerState {
        *self.inner.state.read()
    }

    pub fn coalescer(&self) -> &EventCoalescer {
        &self.inner.coalescer
    }

    pub fn replica(&self) -> &Arc<S> {
        &self.inner.replica
    }

    /// Key of the shared idempotency flag guarding this controller's watch
    pub fn idempotency_key(&self) -> String {
        self.inner.cluster.idempotency_key(&self.inner.cache_key)
    }

    pub fn collection_key(&self) -> &StreamKey {
        &self.inner.collection_key
    }

    pub fn detail_key(
        &self,
        namespace: &str,
        name: &str,
    ) -> StreamKey {
        StreamKey::detail(namespace, name)
    }

    pub fn yaml_key(
        &self,
        namespace: &str,
        name: &str,
    ) -> StreamKey {
        StreamKey::yaml(namespace, name)
    }

    /// Attaches the change handler and begins the watch, once per
    /// (connection, cluster, cache key) across the whole process.
    ///
    /// Returns `Ok(false)` when another controller already started the same
    /// triple. On failure the flag is released so a later call can retry.
    pub fn start(&self) -> Result<bool> {
        let key = self.idempotency_key();
        if !self.inner.cache.check_and_set(&key) {
            CONTROLLER_STARTS.with_label_values(&["skipped"]).inc();
            debug!(key = %key, kind = %self.inner.kind, "Controller already started");
            self.transition(ControllerState::Uninitialized, ControllerState::Starting);
            return Ok(false);
        }

        // A handler left behind by a failed watch start only duplicates
        // triggers, which the coalescer merges.
        let handler: Arc<dyn ResourceEventHandler<S::Object>> =
            Arc::new(ChangeHandler::new(self.inner.clone()));
        let started = self
            .inner
            .replica
            .add_event_handler(handler)
            .and_then(|_| self.inner.replica.start());

        if let Err(e) = started {
            self.inner.cache.remove(&key);
            CONTROLLER_STARTS.with_label_values(&["failed"]).inc();
            error!(key = %key, kind = %self.inner.kind, "Failed to start controller: {:?}", e);
            return Err(e);
        }

        self.transition(ControllerState::Uninitialized, ControllerState::Starting);
        CONTROLLER_STARTS.with_label_values(&["started"]).inc();
        info!(key = %key, kind = %self.inner.kind, cluster = %self.inner.cluster, "Controller started");
        Ok(true)
    }

    /// Polls until the replica reports its initial sync, then publishes one
    /// collection snapshot before returning.
    ///
    /// Returns `false` if `cancel` fired first. Cancellation is a soft
    /// failure: it is logged and leaves no partial state behind.
    pub async fn wait_for_sync(
        &self,
        cancel: &CancellationToken,
    ) -> bool {
        let mut ticker = interval(self.inner.sync_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(kind = %self.inner.kind, cluster = %self.inner.cluster, "Cancelled before replica sync");
                    return false;
                }
                _ = ticker.tick() => {
                    if self.inner.replica.has_synced() {
                        break;
                    }
                }
            }
        }

        *self.inner.state.write() = ControllerState::Synced;
        self.inner
            .coalescer
            .run_now(self.inner.collection_key.clone(), list_producer(&self.inner))
            .await;
        debug!(kind = %self.inner.kind, "Replica synced, snapshot published");
        true
    }

    /// Whether `kind` is namespace-scoped on this controller's cluster.
    ///
    /// Answers from the cluster-reported set of cluster-scoped kinds. When the
    /// set has not been loaded yet every kind is assumed namespaced.
    pub fn is_namespaced(
        &self,
        kind: &str,
    ) -> bool {
        match self.inner.cache.non_namespaced_kinds(&self.inner.cluster) {
            Some(kinds) => !kinds.iter().any(|k| k.eq_ignore_ascii_case(kind)),
            None => true,
        }
    }

    /// Current collection snapshot
    pub fn snapshot(&self) -> Vec<S::Object> {
        self.inner.replica.list()
    }

    /// Resolves once every armed window of this controller has fired
    pub async fn flush(&self) {
        self.inner.coalescer.wait_idle().await;
    }

    fn transition(
        &self,
        from: ControllerState,
        to: ControllerState,
    ) {
        let mut state = self.inner.state.write();
        if *state == from {
            *state = to;
        }
    }
}

/// A controller serves every route of its own cluster and kind: start once,
/// then wait for the sync publish before the connection begins streaming.
/// Requests for any other cluster or kind are rejected before starting.
#[async_trait]
impl<S: SynchronizedReplica> StreamActivator for ResourceController<S> {
    async fn activate(
        &self,
        route: RouteType,
        query: &StreamQuery,
        cancel: CancellationToken,
    ) -> Result<()> {
        let cluster = query.cluster_ref()?;
        let kind = query.kind()?;
        if cluster != self.inner.cluster || kind != self.inner.kind {
            return Err(StreamError::RouteMismatch(format!(
                "requested {kind} on {cluster}, serving {} on {}",
                self.inner.kind, self.inner.cluster
            ))
            .into());
        }

        self.start()?;
        if !self.wait_for_sync(&cancel).await {
            debug!(kind = %self.inner.kind, ?route, "Stream opened without sync");
        }
        Ok(())
    }
}

impl<S: SynchronizedReplica> ControllerInner<S> {
    pub(super) fn publish_list(&self) -> Result<()> {
        let items = self.replica.list();
        let payload = self.projection.render_list(&items)?;
        self.registry.publish(&self.collection_key, payload);
        Ok(())
    }

    pub(super) fn publish_detail(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        let item = self.replica.get(namespace, name);
        let payload = self.projection.render_detail(item.as_ref())?;
        self.registry.publish(&StreamKey::detail(namespace, name), payload);
        Ok(())
    }

    pub(super) fn publish_yaml(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        let item = self.replica.get(namespace, name);
        let payload = self.projection.render_yaml(item.as_ref())?;
        self.registry.publish(&StreamKey::yaml(namespace, name), payload);
        Ok(())
    }

    /// Schedules every stream affected by a change to `obj`
    pub(super) fn schedule_for(
        self: &Arc<Self>,
        obj: &S::Object,
    ) {
        self.coalescer
            .schedule(self.collection_key.clone(), list_producer(self));

        let (namespace, name) = (obj.namespace().to_string(), obj.name().to_string());
        self.coalescer.schedule(
            StreamKey::detail(&namespace, &name),
            detail_producer(self, namespace.clone(), name.clone()),
        );
        self.coalescer.schedule(
            StreamKey::yaml(&namespace, &name),
            yaml_producer(self, namespace, name),
        );

        for stream in &self.additional_streams {
            let producer = stream.producer.clone();
            self.coalescer
                .schedule(stream.key.clone(), Box::new(move || producer()));
        }
    }
}

fn list_producer<S: SynchronizedReplica>(inner: &Arc<ControllerInner<S>>) -> Producer {
    let inner = inner.clone();
    Box::new(move || inner.publish_list())
}

fn detail_producer<S: SynchronizedReplica>(
    inner: &Arc<ControllerInner<S>>,
    namespace: String,
    name: String,
) -> Producer {
    let inner = inner.clone();
    Box::new(move || inner.publish_detail(&namespace, &name))
}

fn yaml_producer<S: SynchronizedReplica>(
    inner: &Arc<ControllerInner<S>>,
    namespace: String,
    name: String,
) -> Producer {
    let inner = inner.clone();
    Box::new(move || inner.publish_yaml(&namespace, &name))
}
