use std::time::Duration;

/// Coalescing window applied when no configuration overrides it
pub const DEFAULT_COALESCING_WINDOW: Duration = Duration::from_millis(250);

/// Poll interval used while waiting for a replica's initial sync
pub const DEFAULT_SYNC_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Per-subscriber channel capacity before payloads are dropped
pub const DEFAULT_SUBSCRIBER_BUFFER_SIZE: usize = 16;

/// Suffix appended to an item key to form its YAML stream
pub const YAML_STREAM_SUFFIX: &str = "yaml";

/// Suffix of the shared cache entry holding cluster-scoped kinds
pub const NON_NAMESPACED_KINDS_SUFFIX: &str = "nonNamespacedResources";
