//! Process-wide shared state.
//!
//! Holds the idempotency flags that guarantee one watch subscription per
//! (connection, cluster, controller) triple, and the out-of-band list of
//! cluster-scoped kinds reported by each cluster.

mod shared_cache;
pub use shared_cache::*;
