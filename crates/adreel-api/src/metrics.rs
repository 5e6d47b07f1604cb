//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "adreel_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "adreel_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "adreel_http_requests_in_flight";

    // Batch/job metrics
    pub const BATCHES_CREATED_TOTAL: &str = "adreel_batches_created_total";
    pub const BATCHES_CANCELLED_TOTAL: &str = "adreel_batches_cancelled_total";
    pub const WORKER_TICKS_TOTAL: &str = "adreel_worker_ticks_total";
    pub const WORKER_TICKS_PROCESSED_TOTAL: &str = "adreel_worker_ticks_processed_total";

    // Queue metrics (doorbell)
    pub const QUEUE_LENGTH: &str = "adreel_queue_length";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "adreel_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a batch created at intake.
pub fn record_batch_created(output_type: &str) {
    let labels = [("output_type", output_type.to_string())];
    counter!(names::BATCHES_CREATED_TOTAL, &labels).increment(1);
}

/// Record a batch cancellation.
pub fn record_batch_cancelled() {
    counter!(names::BATCHES_CANCELLED_TOTAL).increment(1);
}

/// Record one `/worker` call, and whether it actually claimed a job.
pub fn record_worker_tick(processed: bool) {
    counter!(names::WORKER_TICKS_TOTAL).increment(1);
    if processed {
        counter!(names::WORKER_TICKS_PROCESSED_TOTAL).increment(1);
    }
}

/// Update doorbell queue length gauge.
pub fn set_queue_length(length: u64) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse path segments that vary per request into a fixed label so
/// cardinality stays bounded. No regex dependency: this API's only
/// dynamic segment is the batch id after `/batches/`.
fn sanitize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let mut out = Vec::with_capacity(segments.len());
    let mut prev_was_batches = false;
    for segment in segments {
        if prev_was_batches && !segment.is_empty() {
            out.push(":batch_id");
        } else {
            out.push(segment);
        }
        prev_was_batches = segment == "batches";
    }
    out.join("/")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_path_collapses_batch_id() {
        assert_eq!(sanitize_path("/batches/9f2c1e"), "/batches/:batch_id");
        assert_eq!(sanitize_path("/generate-batch"), "/generate-batch");
        assert_eq!(sanitize_path("/health"), "/health");
    }
}
