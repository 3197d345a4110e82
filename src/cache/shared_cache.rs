use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

use crate::constants::NON_NAMESPACED_KINDS_SUFFIX;
use crate::ClusterRef;

/// Shared key-presence store with atomic check-and-set semantics
///
/// Cloning is cheap and every clone observes the same entries. Inject one
/// instance per process; tests create their own to start from a clean slate.
///
/// Presence flags and per-cluster kind lists live in separate maps, so no
/// flag key can collide with a kind list key.
#[derive(Debug, Clone, Default)]
pub struct SharedCache {
    flags: Arc<DashMap<String, ()>>,
    /// Kinds reported as cluster-scoped, keyed `config-cluster-nonNamespacedResources`
    kinds: Arc<DashMap<String, Arc<[String]>>>,
}

impl SharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as present.
    ///
    /// Returns `true` only for the caller that inserted the key; every
    /// concurrent or later caller observes `false`. The check and the insert
    /// happen under the same shard lock.
    pub fn check_and_set(
        &self,
        key: &str,
    ) -> bool {
        match self.flags.entry(key.to_string()) {
            Entry::Occupied(_) => {
                trace!(key, "Cache key already present");
                false
            }
            Entry::Vacant(v) => {
                v.insert(());
                trace!(key, "Cache key set");
                true
            }
        }
    }

    pub fn has(
        &self,
        key: &str,
    ) -> bool {
        self.flags.contains_key(key)
    }

    /// Removes `key`, returning whether it was present
    pub fn remove(
        &self,
        key: &str,
    ) -> bool {
        self.flags.remove(key).is_some()
    }

    /// Drops every flag and every kind list
    pub fn clear(&self) {
        self.flags.clear();
        self.kinds.clear();
    }

    /// Number of presence flags
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Records the kinds `cluster` reports as cluster-scoped.
    pub fn set_non_namespaced_kinds(
        &self,
        cluster: &ClusterRef,
        kinds: Vec<String>,
    ) {
        self.kinds.insert(non_namespaced_kinds_key(cluster), kinds.into());
    }

    pub fn non_namespaced_kinds(
        &self,
        cluster: &ClusterRef,
    ) -> Option<Arc<[String]>> {
        self.kinds
            .get(&non_namespaced_kinds_key(cluster))
            .map(|kinds| kinds.value().clone())
    }
}

pub(crate) fn non_namespaced_kinds_key(cluster: &ClusterRef) -> String {
    format!("{}-{}", cluster.key_prefix(), NON_NAMESPACED_KINDS_SUFFIX)
}
