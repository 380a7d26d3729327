//! HTTP metrics middleware for capturing all request/response metrics
//!
//! This middleware captures metrics for ALL HTTP responses including
//! responses produced before handlers run:
//! - 401 from the transport gate
//! - 401/403 from access requirements
//! - 404 Not Found
//! - 405 Method Not Allowed

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::observability::metrics::{record_http_request, UNMATCHED_ENDPOINT};

/// Middleware that records HTTP request metrics for all responses
///
/// The endpoint label is the matched route template, so label cardinality is
/// bounded by the router. Requests that match no route are recorded under
/// [`UNMATCHED_ENDPOINT`].
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ENDPOINT.to_string(), |p| p.as_str().to_string());

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status_code = response.status().as_u16();
    record_http_request(&method, &endpoint, status_code, duration);

    response
}
