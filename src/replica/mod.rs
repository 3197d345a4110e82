//! Synchronized replica capability.
//!
//! A replica is a locally cached, eventually-consistent mirror of one
//! resource collection, kept current by a watch stream owned by the
//! control-plane client. This layer only consumes it: snapshot reads, an
//! initial-sync signal, and raw change notifications.

mod memory_replica;
pub use memory_replica::*;


use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Identity accessors every tracked object exposes
pub trait Resource: Clone + Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Empty for cluster-scoped objects
    fn namespace(&self) -> &str;
}

/// Raw change notification delivered by a replica
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceChange<R> {
    Added(R),
    Updated { old: R, new: R },
    Deleted(R),
}

impl<R: Resource> ResourceChange<R> {
    /// Object whose identity keys the item-level streams.
    ///
    /// Updates resolve to the pre-change value so subscribers keyed by an
    /// object's old name still see the transition.
    pub fn identity_source(&self) -> &R {
        match self {
            ResourceChange::Added(obj) => obj,
            ResourceChange::Updated { old, .. } => old,
            ResourceChange::Deleted(obj) => obj,
        }
    }
}

/// Callback attached to a replica's change feed
pub trait ResourceEventHandler<R>: Send + Sync {
    fn on_change(
        &self,
        change: &ResourceChange<R>,
    );
}

#[cfg_attr(test, automock(type Object = crate::test_utils::TestResource;))]
pub trait SynchronizedReplica: Send + Sync + 'static {
    type Object: Resource;

    /// Current snapshot of the whole collection
    fn list(&self) -> Vec<Self::Object>;

    /// Current value of one item, `None` once it no longer exists
    fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Option<Self::Object>;

    /// Whether the initial list has been fully loaded
    fn has_synced(&self) -> bool;

    fn add_event_handler(
        &self,
        handler: Arc<dyn ResourceEventHandler<Self::Object>>,
    ) -> Result<()>;

    /// Begins the underlying watch.
    ///
    /// Must not block: implementations hand the watch loop to their own
    /// task and report only failures to establish it.
    fn start(&self) -> Result<()>;
}
