use std::future::Future;

use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::Instrument;

/// Spawns a named background task, logging its failure instead of
/// propagating it.
pub(crate) fn spawn_task<Fut>(
    name: &str,
    task: Fut,
) -> JoinHandle<()>
where
    Fut: Future<Output = crate::Result<()>> + Send + 'static,
{
    // Clone the name so it can be safely moved into the async block
    let name = name.to_string();
    tokio::spawn(
        async move {
            match task.await {
                Ok(()) => debug!("spawned task: {name} finished"),
                Err(e) => error!("spawned task: {name} stopped or encountered an error: {:?}", e),
            }
        }
        .in_current_span(),
    )
}
