//! Metrics definitions for the gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gw_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: route templates only; unmatched paths collapse to `/other`
//! - `status`: 3 values (success, error, timeout)
//! - `outcome`: `success` plus the six rejection reasons
//! - `decision` / `reason`: allow/deny and the two deny reasons
//!
//! No principal identifiers or token material are ever used as labels.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Endpoint label for requests that matched no route.
pub const UNMATCHED_ENDPOINT: &str = "/other";

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // HTTP request buckets - gateway adds auth on top of a cheap handler
        .set_buckets_for_metric(
            Matcher::Prefix("gw_http".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP latency buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `gw_http_requests_total`, `gw_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// `endpoint` must already be bounded (a route template or
/// [`UNMATCHED_ENDPOINT`]).
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let status = categorize_status_code(status_code);

    histogram!("gw_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("gw_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        101 | 200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record the outcome of one token validation
///
/// Metric: `gw_token_validations_total`
/// Labels: `outcome` (`success` or a rejection reason label)
pub fn record_token_validation(outcome: &str) {
    counter!("gw_token_validations_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record one access-control decision
///
/// Metric: `gw_access_decisions_total`
/// Labels: `decision`, `reason` (`none` when allowed)
pub fn record_access_decision(decision: &str, reason: Option<&str>) {
    counter!("gw_access_decisions_total",
        "decision" => decision.to_string(),
        "reason" => reason.unwrap_or("none").to_string()
    )
    .increment(1);
}

// ============================================================================
// Channel Metrics
// ============================================================================

/// Set current open channel connections
///
/// Metric: `gw_channel_connections`
pub fn set_channel_connections(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("gw_channel_connections").set(count as f64);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // These tests exercise the recording paths. Without an installed
    // recorder the macros are no-ops, so they only prove nothing panics.

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, Duration::from_millis(3));
        record_http_request("GET", "/api/v1/me", 401, Duration::from_millis(1));
        record_http_request("GET", UNMATCHED_ENDPOINT, 404, Duration::from_millis(1));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(101), "success");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(403), "error");
        assert_eq!(categorize_status_code(404), "error");
        assert_eq!(categorize_status_code(500), "error");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
    }

    #[test]
    fn test_record_token_validation() {
        record_token_validation("success");
        record_token_validation("expired");
    }

    #[test]
    fn test_record_access_decision() {
        record_access_decision("allow", None);
        record_access_decision("deny", Some("insufficient_role"));
    }

    #[test]
    fn test_set_channel_connections() {
        set_channel_connections(0);
        set_channel_connections(3);
    }
}
