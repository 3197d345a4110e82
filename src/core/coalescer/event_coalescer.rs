use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::error;
use tracing::trace;
use tracing::Instrument;

use crate::metrics::PRODUCER_FAILURES;
use crate::metrics::STREAM_TRIGGERS;
use crate::Result;
use crate::StreamKey;

/// Deferred work bound to one stream key
pub type Producer = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

/// Per-key timer state
#[derive(Default)]
struct KeySlot {
    /// Set while a window is armed and its producer has not started yet
    pending: AtomicBool,
    /// Serializes producer runs of the same key
    run_lock: Mutex<()>,
}

struct CoalescerInner {
    window: Duration,
    slots: DashMap<StreamKey, Arc<KeySlot>>,
    /// Number of armed windows whose producer has not finished
    in_flight: watch::Sender<usize>,
    invocations: AtomicU64,
    runtime: Option<Handle>,
}

impl CoalescerInner {
    /// Drops the slot of `key` once nothing else references it.
    ///
    /// The caller holds one reference besides the map. A concurrent trigger
    /// clones the slot under the same shard lock, so a slot it holds is kept.
    fn release_slot(
        &self,
        key: &StreamKey,
    ) {
        self.slots.remove_if(key, |_, slot| {
            !slot.pending.load(Ordering::Acquire) && Arc::strong_count(slot) == 2
        });
    }
}

/// Decrements the in-flight count even if a producer panics
struct InFlightGuard(Arc<CoalescerInner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Per-key rate limiter for stream producers
///
/// Cloning yields another handle onto the same timers.
#[derive(Clone)]
pub struct EventCoalescer {
    inner: Arc<CoalescerInner>,
}

impl std::fmt::Debug for EventCoalescer {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("EventCoalescer")
            .field("window", &self.inner.window)
            .field("in_flight", &*self.inner.in_flight.borrow())
            .finish_non_exhaustive()
    }
}

impl EventCoalescer {
    /// Creates a coalescer firing `window` after the first trigger of a key.
    ///
    /// Timers run on the runtime current at construction, so triggers may
    /// come from threads outside tokio.
    pub fn new(window: Duration) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            inner: Arc::new(CoalescerInner {
                window,
                slots: DashMap::new(),
                in_flight,
                invocations: AtomicU64::new(0),
                runtime: Handle::try_current().ok(),
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Registers that `producer` should run for `key`.
    ///
    /// Arms a window timer if none is pending for `key` and returns `true`.
    /// Returns `false` when the trigger merged into a pending window; the
    /// supplied producer is then discarded.
    pub fn schedule(
        &self,
        key: StreamKey,
        producer: Producer,
    ) -> bool {
        let slot = self.inner.slots.entry(key.clone()).or_default().clone();

        if slot.pending.swap(true, Ordering::AcqRel) {
            STREAM_TRIGGERS.with_label_values(&["merged"]).inc();
            trace!(key = %key, "Trigger merged into pending window");
            return false;
        }

        let runtime = match self.inner.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => runtime,
            None => {
                slot.pending.store(false, Ordering::Release);
                self.inner.release_slot(&key);
                error!(key = %key, "No async runtime available, trigger dropped");
                return false;
            }
        };

        STREAM_TRIGGERS.with_label_values(&["scheduled"]).inc();
        self.inner.in_flight.send_modify(|n| *n += 1);
        let guard = InFlightGuard(self.inner.clone());
        let window = self.inner.window;
        trace!(key = %key, window_ms = window.as_millis() as u64, "Trigger scheduled");

        runtime.spawn(
            async move {
                sleep(window).await;

                let running = slot.run_lock.lock().await;
                // Cleared before running so changes made while producing re-arm
                slot.pending.store(false, Ordering::Release);
                guard.0.invocations.fetch_add(1, Ordering::Relaxed);
                run_producer(&key, producer);
                drop(running);
                guard.0.release_slot(&key);
                drop(guard);
            }
            .in_current_span(),
        );
        true
    }

    /// Runs `producer` for `key` immediately, ordered after any producer of
    /// the same key that is already running.
    ///
    /// Does not touch the pending window of `key`.
    pub async fn run_now(
        &self,
        key: StreamKey,
        producer: Producer,
    ) {
        let slot = self.inner.slots.entry(key.clone()).or_default().clone();
        let running = slot.run_lock.lock().await;
        self.inner.invocations.fetch_add(1, Ordering::Relaxed);
        run_producer(&key, producer);
        drop(running);
        self.inner.release_slot(&key);
    }

    /// Resolves once no window is armed and no producer is running.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Number of armed windows whose producer has not finished
    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    /// Number of keys currently holding timer state
    pub fn tracked_keys(&self) -> usize {
        self.inner.slots.len()
    }

    /// Total producer invocations, coalesced and immediate
    pub fn invocation_count(&self) -> u64 {
        self.inner.invocations.load(Ordering::Relaxed)
    }

    pub fn is_pending(
        &self,
        key: &StreamKey,
    ) -> bool {
        self.inner
            .slots
            .get(key)
            .map(|slot| slot.pending.load(Ordering::Acquire))
            .unwrap_or(false)
    }
}

fn run_producer(
    key: &StreamKey,
    producer: Producer,
) {
    if let Err(e) = producer() {
        PRODUCER_FAILURES.inc();
        error!(key = %key, "Producer failed, publish skipped: {:?}", e);
    }
}
