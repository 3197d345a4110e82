use std::sync::Arc;

use kube_stream::ResourceChange;
use kube_stream::StreamActivator;

use crate::common::enable_logger;
use crate::common::start_node;
use crate::common::stream_url;
use crate::common::EventReader;
use crate::common::Pod;

#[tokio::test]
async fn test_list_stream_starts_with_synced_snapshot_then_follows_changes() {
    enable_logger();
    let test_node = start_node(vec![Pod::new("default", "pod-a", "Running")]);
    let activator: Arc<dyn StreamActivator> = Arc::new(test_node.controller.clone());
    let addr = test_node
        .node
        .start_stream_server(activator)
        .expect("server started")
        .expect("server enabled");

    let response = reqwest::get(stream_url(addr, "list", "")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let mut events = EventReader::new(response);
    events.wait_for("\"name\":\"pod-a\"").await;

    test_node
        .replica
        .apply(ResourceChange::Added(Pod::new("default", "pod-b", "Pending")));
    events.wait_for("\"name\":\"pod-b\"").await;

    assert_eq!(test_node.replica.start_count(), 1);
    test_node.shutdown_tx.send(()).unwrap();
}

#[tokio::test]
async fn test_detail_streams_follow_item_lifecycle() {
    enable_logger();
    let test_node = start_node(vec![Pod::new("default", "pod-a", "Pending")]);
    let activator: Arc<dyn StreamActivator> = Arc::new(test_node.controller.clone());
    let addr = test_node
        .node
        .start_stream_server(activator)
        .unwrap()
        .unwrap();

    let detail = reqwest::get(stream_url(addr, "details", "&namespace=default&name=pod-a"))
        .await
        .unwrap();
    let yaml = reqwest::get(stream_url(addr, "yaml", "&namespace=default&name=pod-a"))
        .await
        .unwrap();
    let mut detail = EventReader::new(detail);
    let mut yaml = EventReader::new(yaml);

    test_node.replica.apply(ResourceChange::Updated {
        old: Pod::new("default", "pod-a", "Pending"),
        new: Pod::new("default", "pod-a", "Running"),
    });
    detail.wait_for("\"phase\":\"Running\"").await;
    yaml.wait_for("phase: Running").await;

    test_node
        .replica
        .apply(ResourceChange::Deleted(Pod::new("default", "pod-a", "Running")));
    detail.wait_for("{}").await;

    test_node.shutdown_tx.send(()).unwrap();
}

#[tokio::test]
async fn test_second_connection_reuses_started_watch() {
    enable_logger();
    let test_node = start_node(vec![Pod::new("default", "pod-a", "Running")]);
    let activator: Arc<dyn StreamActivator> = Arc::new(test_node.controller.clone());
    let addr = test_node
        .node
        .start_stream_server(activator)
        .unwrap()
        .unwrap();

    let first = reqwest::get(stream_url(addr, "list", "")).await.unwrap();
    let second = reqwest::get(stream_url(addr, "list", "")).await.unwrap();
    EventReader::new(first).wait_for("pod-a").await;
    EventReader::new(second).wait_for("pod-a").await;

    assert_eq!(test_node.replica.start_count(), 1);
    assert_eq!(test_node.replica.handler_count(), 1);
    test_node.shutdown_tx.send(()).unwrap();
}

#[tokio::test]
async fn test_bad_requests_are_rejected() {
    enable_logger();
    let test_node = start_node(vec![]);
    let activator: Arc<dyn StreamActivator> = Arc::new(test_node.controller.clone());
    let addr = test_node
        .node
        .start_stream_server(activator)
        .unwrap()
        .unwrap();

    let missing_name = reqwest::get(stream_url(addr, "details", "&namespace=default"))
        .await
        .unwrap();
    let unknown_route = reqwest::get(stream_url(addr, "logs", "")).await.unwrap();
    let other_kind = reqwest::get(format!("http://{addr}/stream/list?config=c&cluster=k&kind=Service"))
        .await
        .unwrap();

    assert_eq!(missing_name.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(unknown_route.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(other_kind.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(test_node.replica.start_count(), 0);
}
