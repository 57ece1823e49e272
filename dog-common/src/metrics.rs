use axum::{routing::get, Router};
use health::HealthRegistry;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const EVENTS_SENT: &str = "dog_producer_events_sent_total";
pub const SEND_ERRORS: &str = "dog_producer_send_errors_total";
pub const ENCODE_ERRORS: &str = "dog_producer_encode_errors_total";

pub const MESSAGES_RECEIVED: &str = "dog_consumer_messages_received_total";
pub const DECODE_FAILURES: &str = "dog_consumer_decode_failures_total";
pub const MISSING_TOY: &str = "dog_consumer_missing_toy_total";
pub const TOYS_COUNTED: &str = "dog_consumer_toys_counted_total";
pub const POLL_ERRORS: &str = "dog_consumer_poll_errors_total";
pub const COMMIT_ERRORS: &str = "dog_consumer_commit_errors_total";

/// Serves `router` until the listener fails.
pub async fn serve(router: Router, bind: &str) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind).await?;

    axum::serve(listener, router).await?;

    Ok(())
}

/// Build a Router exposing `/metrics` and the `/_liveness` check.
pub fn setup_metrics_router(
    recorder_handle: PrometheusHandle,
    liveness: HealthRegistry,
) -> Router {
    Router::new()
        .route(
            "/metrics",
            get(move || std::future::ready(recorder_handle.render())),
        )
        .route(
            "/_liveness",
            get(move || std::future::ready(liveness.get_status())),
        )
}

pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(EXPONENTIAL_SECONDS)?
        .install_recorder()
}
