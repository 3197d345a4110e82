use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube_stream::ClusterRef;
use kube_stream::InMemoryReplica;
use kube_stream::Projection;
use kube_stream::Resource;
use kube_stream::ResourceController;
use kube_stream::SerdeProjection;
use kube_stream::StreamNode;
use kube_stream::StreamNodeConfig;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::timeout;

pub const CONFIG_ID: &str = "kubeconfig";
pub const CLUSTER_ID: &str = "prod";

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for integration test.");
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pod {
    pub metadata: ObjectMeta,
    pub phase: String,
}

impl Pod {
    pub fn new(
        namespace: &str,
        name: &str,
        phase: &str,
    ) -> Self {
        Self {
            metadata: ObjectMeta {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            phase: phase.to_string(),
        }
    }
}

impl Resource for Pod {
    fn name(&self) -> &str {
        &self.metadata.name
    }

    fn namespace(&self) -> &str {
        &self.metadata.namespace
    }
}

pub struct TestNode {
    pub node: StreamNode,
    pub replica: Arc<InMemoryReplica<Pod>>,
    pub controller: ResourceController<InMemoryReplica<Pod>>,
    pub shutdown_tx: watch::Sender<()>,
}

/// Node with a fast window and an SSE listener on an ephemeral port
pub fn start_node(pods: Vec<Pod>) -> TestNode {
    let mut config = StreamNodeConfig::default();
    config.coalescer.window_ms = 50;
    config.controller.sync_poll_interval_ms = 10;
    config.server.listen_address = "127.0.0.1:0".to_string();
    config.server.keep_alive_secs = 1;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let node = StreamNode::new(config, shutdown_rx).expect("valid config");
    let replica = Arc::new(InMemoryReplica::with_items(pods));
    let projection: Arc<dyn Projection<Pod>> = Arc::new(SerdeProjection::new());
    let controller = node
        .controller("Pod", ClusterRef::new(CONFIG_ID, CLUSTER_ID), replica.clone(), projection)
        .build();

    TestNode {
        node,
        replica,
        controller,
        shutdown_tx,
    }
}

pub fn stream_url(
    addr: SocketAddr,
    route: &str,
    extra: &str,
) -> String {
    format!(
        "http://{}/stream/{}?config={}&cluster={}&kind=Pod{}",
        addr, route, CONFIG_ID, CLUSTER_ID, extra
    )
}

/// Accumulates an SSE body until `needle` appears
pub struct EventReader {
    chunks: futures::stream::BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    body: String,
}

impl EventReader {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            chunks: response.bytes_stream().boxed(),
            body: String::new(),
        }
    }

    pub async fn wait_for(
        &mut self,
        needle: &str,
    ) {
        let found = timeout(Duration::from_secs(5), async {
            loop {
                if self.body.contains(needle) {
                    return true;
                }
                match self.chunks.next().await {
                    Some(Ok(chunk)) => self.body.push_str(&String::from_utf8_lossy(&chunk)),
                    _ => return false,
                }
            }
        })
        .await
        .unwrap_or(false);
        assert!(found, "`{}` not found in stream body: {:?}", needle, self.body);
        // Later waits only look at what arrives after this match
        if let Some(pos) = self.body.find(needle) {
            self.body.drain(..pos + needle.len());
        }
    }
}
