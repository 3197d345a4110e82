use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use futures::Stream;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::sync::DropGuard;
use tracing::debug;
use tracing::info;
use tracing::warn;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::sse::Event;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use super::StreamActivator;
use super::StreamQuery;
use crate::Error;
use crate::Result;
use crate::RouteType;
use crate::StreamError;
use crate::StreamRegistry;
use crate::Subscription;

/// `GET /stream/{list|details|yaml}` routes
pub fn stream_routes(
    registry: StreamRegistry,
    activator: Arc<dyn StreamActivator>,
    keep_alive: Duration,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path!("stream" / String)
        .and(warp::get())
        .and(warp::query::<StreamQuery>())
        .and(warp::any().map(move || registry.clone()))
        .and(warp::any().map(move || activator.clone()))
        .and_then(
            move |route: String, query: StreamQuery, registry: StreamRegistry, activator: Arc<dyn StreamActivator>| {
                stream_handler(route, query, registry, activator, keep_alive)
            },
        )
}

/// Binds the SSE listener.
///
/// Returns the bound address and the server future, which resolves once
/// `shutdown_signal` fires.
pub fn serve(
    addr: SocketAddr,
    registry: StreamRegistry,
    activator: Arc<dyn StreamActivator>,
    keep_alive: Duration,
    mut shutdown_signal: watch::Receiver<()>,
) -> Result<(SocketAddr, impl Future<Output = ()> + Send + 'static)> {
    let routes = stream_routes(registry, activator, keep_alive);
    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async move {
            let _ = shutdown_signal.changed().await;
            info!("Stream server shutting down");
        })
        .map_err(|e| StreamError::Bind(e.to_string()))?;
    info!(%bound, "Stream server listening");
    Ok((bound, server))
}

async fn stream_handler(
    route: String,
    query: StreamQuery,
    registry: StreamRegistry,
    activator: Arc<dyn StreamActivator>,
    keep_alive: Duration,
) -> std::result::Result<Response, Infallible> {
    let route_type = match route.parse::<RouteType>() {
        Ok(route_type) => route_type,
        Err(e) => return Ok(error_reply(StatusCode::NOT_FOUND, &e)),
    };
    let key = match query.stream_key(route_type) {
        Ok(key) => key,
        Err(e) => return Ok(error_reply(StatusCode::BAD_REQUEST, &e)),
    };

    // Subscribe before activation so the sync publish is not missed
    let subscription = registry.subscribe(key.clone());
    let cancel = CancellationToken::new();
    // Dropping the handler future (client gone) or the stream cancels
    let guard = cancel.clone().drop_guard();

    if let Err(e) = activator.activate(route_type, &query, cancel).await {
        warn!(key = %key, "Stream activation failed: {:?}", e);
        let status = match &e {
            Error::Stream(StreamError::RouteMismatch(_)) => StatusCode::NOT_FOUND,
            Error::Stream(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        return Ok(error_reply(status, &e));
    }
    debug!(key = %key, subscriber_id = subscription.id(), "Stream connection opened");

    let events = SubscriberEvents {
        subscription,
        _cancel: guard,
    };
    let stream = warp::sse::keep_alive().interval(keep_alive).stream(events);
    Ok(warp::sse::reply(stream).into_response())
}

fn error_reply(
    status: StatusCode,
    error: &Error,
) -> Response {
    debug!(%status, "Rejecting stream request: {}", error);
    let body = serde_json::json!({ "error": error.to_string() });
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// One SSE event per published payload, for as long as the connection lives
struct SubscriberEvents {
    subscription: Subscription,
    _cancel: DropGuard,
}

impl Stream for SubscriberEvents {
    type Item = std::result::Result<Event, Infallible>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.subscription)
            .poll_next(cx)
            .map(|payload| payload.map(|p| Ok(Event::default().data(String::from_utf8_lossy(&p)))))
    }
}
