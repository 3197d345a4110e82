//! Stream dispatch error hierarchy
//!
//! Errors are scoped to a single key, kind or connection. Nothing raised from
//! this layer is fatal to the process; callers decide whether to retry.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Synchronized replica failures (watch establishment, handler wiring)
    #[error(transparent)]
    Replica(#[from] ReplicaError),

    /// List/detail/YAML rendering failures
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// Stream routing failures
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ReplicaError {
    /// Underlying watch could not be established
    #[error("Failed to start watch for {kind}: {reason}")]
    WatchStartFailed { kind: String, reason: String },

    /// Change handler could not be attached to the replica
    #[error("Failed to register change handler: {0}")]
    HandlerRegistration(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Caller-supplied list transform rejected the snapshot
    #[error("List transform failed: {0}")]
    Transform(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Unknown route type: {0}")]
    UnknownRoute(String),

    #[error("Missing query parameter: {0}")]
    MissingParameter(&'static str),

    /// Request names a cluster or kind the activating controller does not serve
    #[error("Stream request does not match controller: {0}")]
    RouteMismatch(String),

    /// SSE listener could not bind its address
    #[error("Failed to bind stream server: {0}")]
    Bind(String),
}

// ============== Conversion Implementations ============== //
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Projection(ProjectionError::Json(e))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Projection(ProjectionError::Yaml(e))
    }
}
