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
    pub const HTTP_REQUESTS_TOTAL: &str = "reelgen_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "reelgen_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "reelgen_http_requests_in_flight";

    // Generation metrics
    pub const GENERATIONS_TOTAL: &str = "reelgen_generations_total";
    pub const GENERATION_DURATION_SECONDS: &str = "reelgen_generation_duration_seconds";
    pub const JOBS_ENQUEUED_TOTAL: &str = "reelgen_jobs_enqueued_total";
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

/// Record a completed generation by action and outcome.
pub fn record_generation(action: &str, outcome: &str, duration_secs: f64) {
    let labels = [
        ("action", action.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::GENERATIONS_TOTAL, &labels).increment(1);
    histogram!(names::GENERATION_DURATION_SECONDS, "action" => action.to_string())
        .record(duration_secs);
}

/// Record job enqueued.
pub fn record_job_enqueued(job_type: &str) {
    let labels = [("type", job_type.to_string())];
    counter!(names::JOBS_ENQUEUED_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (replace ids with placeholders).
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(r"/(generation|claim|publish)/[A-Za-z0-9_-]+")
        .unwrap()
        .replace_all(path, "/$1/:id");
    let path = regex_lite::Regex::new(r"/user/[A-Za-z0-9_.@-]+/")
        .unwrap()
        .replace_all(&path, "/user/:user_id/");
    path.to_string()
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
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/v1/generation/a1b2c3d4e5"),
            "/v1/generation/:id"
        );
        assert_eq!(sanitize_path("/v1/claim/a1b2c3d4e5"), "/v1/claim/:id");
        assert_eq!(
            sanitize_path("/v1/user/user-123/generations"),
            "/v1/user/:user_id/generations"
        );
        assert_eq!(
            sanitize_path("/v1/community/generations"),
            "/v1/community/generations"
        );
    }
}
