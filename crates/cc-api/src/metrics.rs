//! Prometheus metrics for HTTP traffic and gamification activity.

use std::{sync::LazyLock, time::Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use cc_gamify::RequirementType;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid uuid regex")
});
static NUMBER_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\d+").expect("valid number regex"));

/// Initialize Prometheus metrics exporter
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();

    // Configure histogram buckets for request duration (in seconds)
    let builder = builder.set_buckets_for_metric(
        Matcher::Full("http_request_duration_seconds".to_string()),
        &[
            0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ],
    )?;

    let handle = builder.install_recorder()?;

    Ok(handle)
}

/// Middleware to record HTTP request metrics
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let in_flight = gauge!(
        "http_requests_in_flight",
        "method" => method.clone(),
        "path" => path.clone()
    );
    in_flight.increment(1.0);

    let response = next.run(req).await;

    in_flight.decrement(1.0);

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path,
        "status" => status
    )
    .record(duration);

    response
}

/// Normalize URL paths to reduce cardinality in metrics
/// Replaces UUIDs and numeric IDs with placeholders
fn normalize_path(path: &str) -> String {
    let normalized = UUID_SEGMENT.replace_all(path, ":id");
    NUMBER_SEGMENT.replace_all(&normalized, "/:id").into_owned()
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (StatusCode::OK, handle.render())
}

/// Record the outcome of one engine operation
pub fn record_gamification_event(operation: &'static str, success: bool) {
    let status = if success { "success" } else { "failure" };

    counter!(
        "gamification_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

pub fn record_xp_awarded(points: i64) {
    counter!("gamification_xp_awarded_total").increment(points.unsigned_abs());
}

pub fn record_badges_granted(requirement_type: RequirementType, count: usize) {
    counter!(
        "gamification_badges_granted_total",
        "type" => requirement_type.as_str()
    )
    .increment(count as u64);
}

/// Record authentication events
pub fn record_auth_event(event_type: &'static str, method: &'static str, success: bool) {
    let status = if success { "success" } else { "failure" };

    counter!(
        "auth_events_total",
        "type" => event_type,
        "method" => method,
        "status" => status
    )
    .increment(1);
}
