use std::pin::Pin;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use bytes::Bytes;
use dashmap::DashMap;
use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use tracing::trace;

use crate::metrics::ACTIVE_SUBSCRIBERS;
use crate::metrics::DROPPED_PAYLOADS;
use crate::metrics::PUBLISHED_PAYLOADS;
use crate::PublisherConfig;
use crate::StreamKey;

/// Internal subscriber state
#[derive(Debug)]
struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Bytes>,
}

#[derive(Debug)]
struct RegistryInner {
    /// Subscribers grouped by stream key
    subscribers: DashMap<StreamKey, Vec<Subscriber>>,

    /// Next subscriber ID (monotonically increasing)
    next_id: AtomicU64,

    buffer_size: usize,
}

/// Process-wide registry of named broadcast streams
///
/// Cloning yields another handle onto the same registry.
#[derive(Debug, Clone)]
pub struct StreamRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new(PublisherConfig::default())
    }
}

impl StreamRegistry {
    pub fn new(config: PublisherConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                buffer_size: config.subscriber_buffer_size.max(1),
            }),
        }
    }

    /// Attaches a new receiver to `key`.
    ///
    /// The subscription only sees payloads published after this call. It is
    /// unregistered when dropped.
    pub fn subscribe(
        &self,
        key: StreamKey,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.buffer_size);

        self.inner
            .subscribers
            .entry(key.clone())
            .or_default()
            .push(Subscriber { id, sender });
        ACTIVE_SUBSCRIBERS.inc();

        trace!(subscriber_id = id, key = %key, "Subscriber registered");

        Subscription {
            id,
            key,
            receiver,
            registry: self.inner.clone(),
        }
    }

    /// Delivers `payload` to every subscriber of `key` without blocking.
    ///
    /// Returns the number of subscribers that accepted the payload.
    pub fn publish(
        &self,
        key: &StreamKey,
        payload: Bytes,
    ) -> usize {
        let mut delivered = 0;
        let mut pruned = 0;
        let now_empty = match self.inner.subscribers.get_mut(key) {
            Some(mut subscribers) => {
                subscribers.retain(|s| match s.sender.try_send(payload.clone()) {
                    Ok(()) => {
                        delivered += 1;
                        true
                    }
                    Err(TrySendError::Full(_)) => {
                        DROPPED_PAYLOADS.inc();
                        trace!(subscriber_id = s.id, key = %key, "Subscriber buffer full, payload dropped");
                        true
                    }
                    Err(TrySendError::Closed(_)) => {
                        pruned += 1;
                        false
                    }
                });
                subscribers.is_empty()
            }
            None => {
                trace!(key = %key, "No subscribers, payload discarded");
                return 0;
            }
        };

        if now_empty {
            self.inner.subscribers.remove_if(key, |_, s| s.is_empty());
        }
        if pruned > 0 {
            ACTIVE_SUBSCRIBERS.sub(pruned as i64);
            debug!(key = %key, pruned, "Pruned closed subscribers");
        }

        PUBLISHED_PAYLOADS.inc();
        trace!(key = %key, delivered, "Payload published");
        delivered
    }

    /// Number of active subscribers for `key`
    pub fn subscriber_count(
        &self,
        key: &StreamKey,
    ) -> usize {
        self.inner.subscribers.get(key).map(|s| s.len()).unwrap_or(0)
    }

    /// Number of keys with at least one subscriber
    pub fn stream_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

/// Receiving end of one stream subscription
///
/// Yields payloads until dropped; there is no replay of earlier publishes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    key: StreamKey,
    receiver: mpsc::Receiver<Bytes>,
    registry: Arc<RegistryInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    /// Waits for the next payload
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.receiver.recv().await
    }

    /// Returns a payload if one is already buffered
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Bytes;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let id = self.id;
        let mut removed = false;
        // The retain sticks even when the list stays non-empty
        self.registry.subscribers.remove_if_mut(&self.key, |_key, subscribers| {
            let before = subscribers.len();
            subscribers.retain(|s| s.id != id);
            removed = subscribers.len() < before;
            subscribers.is_empty()
        });
        if removed {
            ACTIVE_SUBSCRIBERS.dec();
        }
        trace!(subscriber_id = id, key = %self.key, "Subscriber unregistered");
    }
}
