use std::sync::Arc;
use std::time::Duration;

use kube_stream::ControllerBuilder;
use kube_stream::Projection;
use kube_stream::ResourceChange;
use kube_stream::SerdeProjection;
use tokio_util::sync::CancellationToken;

use crate::common::enable_logger;
use crate::common::start_node;
use crate::common::Pod;

#[tokio::test]
async fn test_burst_of_changes_is_published_once() {
    enable_logger();
    let test_node = start_node(vec![]);
    let projection: Arc<dyn Projection<Pod>> = Arc::new(SerdeProjection::new());
    // Own coalescer with a wide window so the whole burst lands inside it
    let controller =
        ControllerBuilder::new("Pod", test_node.controller.cluster().clone(), test_node.replica.clone(), projection)
            .coalescing_window(Duration::from_millis(500))
            .registry(test_node.node.registry().clone())
            .build();
    let mut list = test_node.node.registry().subscribe(controller.collection_key().clone());

    assert!(controller.start().unwrap());
    assert!(controller.wait_for_sync(&CancellationToken::new()).await);
    assert_eq!(list.recv().await.as_deref(), Some(&b"[]"[..]));

    for i in 0..100 {
        test_node
            .replica
            .apply(ResourceChange::Added(Pod::new("default", &format!("pod-{i}"), "Pending")));
    }
    controller.flush().await;

    let payload = list.try_recv().expect("one coalesced publish");
    let pods: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(pods.as_array().unwrap().len(), 100);
    assert!(list.try_recv().is_none());
}

#[tokio::test]
async fn test_cluster_scoped_kinds_come_from_shared_cache() {
    enable_logger();
    let test_node = start_node(vec![]);

    assert!(test_node.controller.is_namespaced("Node"));

    test_node.node.shared_cache().set_non_namespaced_kinds(
        test_node.controller.cluster(),
        vec!["Node".to_string(), "PersistentVolume".to_string()],
    );

    assert!(!test_node.controller.is_namespaced("node"));
    assert!(test_node.controller.is_namespaced("Pod"));
}
