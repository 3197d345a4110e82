use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use tracing::trace;

use super::Resource;
use super::ResourceChange;
use super::ResourceEventHandler;
use super::SynchronizedReplica;
use crate::Result;

/// Replica held entirely in memory and fed through [`InMemoryReplica::apply`].
///
/// Embedders bridge their own watch client into it; tests drive it directly.
/// The store is mutated before handlers run, so anything a handler schedules
/// reads post-change state.
pub struct InMemoryReplica<R: Resource> {
    items: RwLock<BTreeMap<(String, String), R>>,
    handlers: RwLock<Vec<Arc<dyn ResourceEventHandler<R>>>>,
    synced: AtomicBool,
    starts: AtomicUsize,
}

impl<R: Resource> Default for InMemoryReplica<R> {
    fn default() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            handlers: RwLock::new(Vec::new()),
            synced: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
        }
    }
}

impl<R: Resource> InMemoryReplica<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with an initial list and marks it synced, without
    /// notifying handlers.
    pub fn with_items(items: impl IntoIterator<Item = R>) -> Self {
        let replica = Self::new();
        {
            let mut store = replica.items.write();
            for item in items {
                store.insert(identity(&item), item);
            }
        }
        replica.mark_synced();
        replica
    }

    pub fn mark_synced(&self) {
        self.synced.store(true, Ordering::Release);
    }

    /// Applies one change to the store, then fans it out to every handler.
    pub fn apply(
        &self,
        change: ResourceChange<R>,
    ) {
        {
            let mut store = self.items.write();
            match &change {
                ResourceChange::Added(obj) => {
                    store.insert(identity(obj), obj.clone());
                }
                ResourceChange::Updated { old, new } => {
                    store.remove(&identity(old));
                    store.insert(identity(new), new.clone());
                }
                ResourceChange::Deleted(obj) => {
                    store.remove(&identity(obj));
                }
            }
        }

        let handlers = self.handlers.read().clone();
        trace!(handlers = handlers.len(), "Dispatching replica change");
        for handler in handlers {
            handler.on_change(&change);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Number of times the watch was started
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::Acquire)
    }
}

impl<R: Resource> SynchronizedReplica for InMemoryReplica<R> {
    type Object = R;

    fn list(&self) -> Vec<R> {
        self.items.read().values().cloned().collect()
    }

    fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Option<R> {
        self.items
            .read()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    fn add_event_handler(
        &self,
        handler: Arc<dyn ResourceEventHandler<R>>,
    ) -> Result<()> {
        self.handlers.write().push(handler);
        Ok(())
    }

    fn start(&self) -> Result<()> {
        let starts = self.starts.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(starts, "In-memory replica started");
        Ok(())
    }
}

fn identity<R: Resource>(obj: &R) -> (String, String) {
    (obj.namespace().to_string(), obj.name().to_string())
}
