//! Server-sent-event transport for stream subscribers.
//!
//! One HTTP connection serves one stream key. The handler subscribes before
//! activating the kind's controller, so the synchronization publish issued at
//! the end of activation always reaches the new subscriber.
mod sse_server;
pub use sse_server::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::ClusterRef;
use crate::Result;
use crate::RouteType;
use crate::StreamError;
use crate::StreamKey;

/// Query string of a stream request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamQuery {
    pub config: Option<String>,
    pub cluster: Option<String>,
    pub kind: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
}

impl StreamQuery {
    pub fn cluster_ref(&self) -> Result<ClusterRef> {
        let config = required(&self.config, "config")?;
        let cluster = required(&self.cluster, "cluster")?;
        Ok(ClusterRef::new(config, cluster))
    }

    pub fn kind(&self) -> Result<&str> {
        required(&self.kind, "kind")
    }

    /// Key of the stream this request subscribes to
    pub fn stream_key(
        &self,
        route: RouteType,
    ) -> Result<StreamKey> {
        route.stream_key(
            &self.cluster_ref()?,
            self.kind()?,
            self.namespace.as_deref(),
            self.name.as_deref(),
        )
    }
}

fn required<'a>(
    value: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StreamError::MissingParameter(name).into())
}

/// Per-kind hook run for every new stream connection.
///
/// Implementations start the kind's controller and wait for its replica to
/// sync. `cancel` fires when the client disconnects.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StreamActivator: Send + Sync + 'static {
    async fn activate(
        &self,
        route: RouteType,
        query: &StreamQuery,
        cancel: CancellationToken,
    ) -> Result<()>;
}
