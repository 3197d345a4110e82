use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::time::timeout;

use super::*;
use crate::PublisherConfig;
use crate::StreamKey;

fn payload(s: &'static str) -> Bytes {
    Bytes::from_static(s.as_bytes())
}

#[tokio::test]
async fn test_subscriber_receives_payloads_in_publish_order() {
    let registry = StreamRegistry::default();
    let key = StreamKey::from("cfg-prod-Pod");
    let mut subscription = registry.subscribe(key.clone());

    for p in ["one", "two", "three"] {
        assert_eq!(registry.publish(&key, payload(p)), 1);
    }

    assert_eq!(subscription.recv().await, Some(payload("one")));
    assert_eq!(subscription.recv().await, Some(payload("two")));
    assert_eq!(subscription.recv().await, Some(payload("three")));
}

#[tokio::test]
async fn test_every_subscriber_of_a_key_receives_the_payload() {
    let registry = StreamRegistry::default();
    let key = StreamKey::from("ns-pod-a");
    let mut first = registry.subscribe(key.clone());
    let mut second = registry.subscribe(key.clone());
    assert_ne!(first.id(), second.id());

    assert_eq!(registry.publish(&key, payload("{}")), 2);

    assert_eq!(first.try_recv(), Some(payload("{}")));
    assert_eq!(second.try_recv(), Some(payload("{}")));
}

#[tokio::test]
async fn test_publish_without_subscribers_is_discarded() {
    let registry = StreamRegistry::default();

    assert_eq!(registry.publish(&StreamKey::from("nobody"), payload("x")), 0);
    assert_eq!(registry.stream_count(), 0);
}

#[tokio::test]
async fn test_new_subscriber_sees_no_history() {
    let registry = StreamRegistry::default();
    let key = StreamKey::from("k");
    let _early = registry.subscribe(key.clone());
    registry.publish(&key, payload("before"));

    let mut late = registry.subscribe(key.clone());
    registry.publish(&key, payload("after"));

    assert_eq!(late.try_recv(), Some(payload("after")));
    assert_eq!(late.try_recv(), None);
}

#[tokio::test]
async fn test_keys_are_isolated() {
    let registry = StreamRegistry::default();
    let mut a = registry.subscribe(StreamKey::from("a"));
    let mut b = registry.subscribe(StreamKey::from("b"));

    registry.publish(&StreamKey::from("a"), payload("for-a"));

    assert_eq!(a.try_recv(), Some(payload("for-a")));
    assert_eq!(b.try_recv(), None);
}

#[tokio::test]
async fn test_dropping_subscription_unregisters_it() {
    let registry = StreamRegistry::default();
    let key = StreamKey::from("k");
    let first = registry.subscribe(key.clone());
    let second = registry.subscribe(key.clone());
    assert_eq!(registry.subscriber_count(&key), 2);

    drop(first);
    assert_eq!(registry.subscriber_count(&key), 1);

    drop(second);
    assert_eq!(registry.subscriber_count(&key), 0);
    assert_eq!(registry.stream_count(), 0);
}

#[tokio::test]
async fn test_full_buffer_drops_payload_without_blocking() {
    let registry = StreamRegistry::new(PublisherConfig {
        subscriber_buffer_size: 2,
    });
    let key = StreamKey::from("k");
    let mut stalled = registry.subscribe(key.clone());
    let mut reader = registry.subscribe(key.clone());

    for (i, p) in ["1", "2", "3", "4"].into_iter().enumerate() {
        let delivered = timeout(Duration::from_millis(100), async { registry.publish(&key, payload(p)) })
            .await
            .expect("publish never blocks");
        // The stalled subscriber stops accepting once its buffer is full
        assert_eq!(delivered, if i < 2 { 2 } else { 1 });
        assert_eq!(reader.try_recv(), Some(payload(p)));
    }

    assert_eq!(stalled.try_recv(), Some(payload("1")));
    assert_eq!(stalled.try_recv(), Some(payload("2")));
    assert_eq!(stalled.try_recv(), None);
    assert_eq!(registry.subscriber_count(&key), 2);
}

#[tokio::test]
async fn test_subscription_is_a_stream() {
    let registry = StreamRegistry::default();
    let key = StreamKey::from("k");
    let subscription = registry.subscribe(key.clone());

    registry.publish(&key, payload("a"));
    registry.publish(&key, payload("b"));

    let received: Vec<Bytes> = subscription.take(2).collect().await;
    assert_eq!(received, vec![payload("a"), payload("b")]);
}

#[test]
fn test_zero_buffer_size_is_clamped() {
    let registry = StreamRegistry::new(PublisherConfig {
        subscriber_buffer_size: 0,
    });
    let key = StreamKey::from("k");
    let mut subscription = registry.subscribe(key.clone());

    assert_eq!(registry.publish(&key, payload("x")), 1);
    assert_eq!(subscription.try_recv(), Some(payload("x")));
}
