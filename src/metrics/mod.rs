use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;


lazy_static! {
    pub static ref STREAM_TRIGGERS: IntCounterVec = IntCounterVec::new(
        Opts::new("stream_triggers_total", "Coalescer triggers by outcome (scheduled|merged)"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref PRODUCER_FAILURES: IntCounter = IntCounter::new(
        "stream_producer_failures_total",
        "Producer invocations that failed and skipped their publish"
    )
    .expect("metric can not be created");

    pub static ref PUBLISHED_PAYLOADS: IntCounter = IntCounter::new(
        "stream_published_payloads_total",
        "Payloads published to streams with at least one subscriber"
    )
    .expect("metric can not be created");

    pub static ref DROPPED_PAYLOADS: IntCounter = IntCounter::new(
        "stream_dropped_payloads_total",
        "Payloads dropped because a subscriber buffer was full"
    )
    .expect("metric can not be created");

    pub static ref ACTIVE_SUBSCRIBERS: IntGauge = IntGauge::new(
        "stream_active_subscribers",
        "Currently attached stream subscribers"
    )
    .expect("metric can not be created");

    pub static ref CONTROLLER_STARTS: IntCounterVec = IntCounterVec::new(
        Opts::new("controller_starts_total", "Resource controller start attempts (started|skipped|failed)"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

pub(crate) fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(STREAM_TRIGGERS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(PRODUCER_FAILURES.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(PUBLISHED_PAYLOADS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(DROPPED_PAYLOADS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(ACTIVE_SUBSCRIBERS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(CONTROLLER_STARTS.clone()))
        .expect("collector can be registered");
}

/// Serves `/metrics` until `shutdown_signal` fires
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    REGISTER.call_once(|| register_custom_metrics(&REGISTRY));

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    info!(port, "Metrics server listening");
    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(encode_metrics(&REGISTRY))
}

pub(crate) fn encode_metrics(registry: &Registry) -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
