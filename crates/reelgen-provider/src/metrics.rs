//! Provider request instrumentation.
//!
//! Every attempt is counted and timed, tagged by provider and endpoint path;
//! failed attempts are additionally tagged by the resulting status code.
//! Recording is a side effect only and can never fail the request.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const PROVIDER_REQUESTS_TOTAL: &str = "reelgen_provider_requests_total";
    pub const PROVIDER_ERRORS_TOTAL: &str = "reelgen_provider_errors_total";
    pub const PROVIDER_REQUEST_DURATION_SECONDS: &str =
        "reelgen_provider_request_duration_seconds";
}

/// Record the start of an attempt.
pub fn record_request(provider: &'static str, path: &str) {
    let labels = [("provider", provider.to_string()), ("path", path.to_string())];
    counter!(names::PROVIDER_REQUESTS_TOTAL, &labels).increment(1);
}

/// Record attempt latency, regardless of outcome.
pub fn record_duration(provider: &'static str, path: &str, duration_secs: f64) {
    let labels = [("provider", provider.to_string()), ("path", path.to_string())];
    histogram!(names::PROVIDER_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a failed attempt with its resulting status.
pub fn record_error(provider: &'static str, path: &str, status: u16) {
    let labels = [
        ("provider", provider.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    counter!(names::PROVIDER_ERRORS_TOTAL, &labels).increment(1);
}
