use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::test_utils::TestResource;
use crate::ClusterRef;
use crate::Error;
use crate::InMemoryReplica;
use crate::MockStreamActivator;
use crate::Projection;
use crate::SerdeProjection;
use crate::StreamNode;
use crate::StreamNodeConfig;

fn config() -> StreamNodeConfig {
    let mut config = StreamNodeConfig::default();
    config.server.listen_address = "127.0.0.1:0".to_string();
    config
}

#[tokio::test]
async fn test_new_rejects_invalid_config() {
    let (_shutdown_tx, shutdown_rx) = watch::channel(());
    let mut config = config();
    config.coalescer.window_ms = 0;

    assert!(matches!(StreamNode::new(config, shutdown_rx), Err(Error::InvalidConfig(_))));
}

#[tokio::test]
async fn test_controllers_share_node_state_and_timings() {
    let (_shutdown_tx, shutdown_rx) = watch::channel(());
    let mut config = config();
    config.coalescer.window_ms = 120;
    let node = StreamNode::new(config, shutdown_rx).unwrap();
    let replica = Arc::new(InMemoryReplica::<TestResource>::new());
    let projection: Arc<dyn Projection<TestResource>> = Arc::new(SerdeProjection::new());

    let first = node
        .controller("Pod", ClusterRef::new("c", "k"), replica.clone(), projection.clone())
        .build();
    let second = node
        .controller("Pod", ClusterRef::new("c", "k"), replica.clone(), projection)
        .build();

    assert_eq!(first.coalescer().window(), Duration::from_millis(120));
    assert!(first.start().unwrap());
    assert!(!second.start().unwrap());
    assert!(node.shared_cache().has("c-k-PodInformer"));
    assert_eq!(replica.start_count(), 1);

    let _subscription = node.registry().subscribe(first.collection_key().clone());
    assert_eq!(node.registry().stream_count(), 1);
}

#[tokio::test]
async fn test_controllers_of_same_kind_share_one_coalescer() {
    let (_shutdown_tx, shutdown_rx) = watch::channel(());
    let node = StreamNode::new(config(), shutdown_rx).unwrap();
    let replica = Arc::new(InMemoryReplica::<TestResource>::new());
    let projection: Arc<dyn Projection<TestResource>> = Arc::new(SerdeProjection::new());
    let cluster = ClusterRef::new("c", "k");

    let first = node
        .controller("Pod", cluster.clone(), replica.clone(), projection.clone())
        .build();
    let second = node
        .controller("Pod", cluster.clone(), replica.clone(), projection.clone())
        .build();
    let services = node
        .controller("Service", cluster, replica.clone(), projection)
        .build();

    let key = first.collection_key().clone();
    assert!(first.coalescer().schedule(key.clone(), Box::new(|| Ok(()))));

    assert!(second.coalescer().is_pending(&key));
    assert!(!second.coalescer().schedule(key.clone(), Box::new(|| Ok(()))));
    assert!(!services.coalescer().is_pending(&key));

    second.coalescer().wait_idle().await;
    assert_eq!(first.coalescer().invocation_count(), 1);
    assert_eq!(services.coalescer().invocation_count(), 0);
}

#[tokio::test]
async fn test_stream_server_disabled_returns_none() {
    let (_shutdown_tx, shutdown_rx) = watch::channel(());
    let mut config = config();
    config.server.enabled = false;
    let node = StreamNode::new(config, shutdown_rx).unwrap();

    let bound = node.start_stream_server(Arc::new(MockStreamActivator::new())).unwrap();

    assert!(bound.is_none());
}

#[tokio::test]
async fn test_stream_server_binds_and_stops_on_shutdown() {
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let node = StreamNode::new(config(), shutdown_rx).unwrap();

    let bound = node
        .start_stream_server(Arc::new(MockStreamActivator::new()))
        .unwrap()
        .expect("server enabled");
    assert_ne!(bound.port(), 0);
    assert!(tokio::net::TcpStream::connect(bound).await.is_ok());

    shutdown_tx.send(()).unwrap();
}

#[tokio::test]
async fn test_metrics_server_disabled_by_default() {
    let (_shutdown_tx, shutdown_rx) = watch::channel(());
    let node = StreamNode::new(config(), shutdown_rx).unwrap();

    assert!(node.start_metrics_server().is_none());
}
