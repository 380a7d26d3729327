//! Health check handler.
//!
//! Liveness only: the gateway has no backing store, so being able to answer
//! is the whole check.

use crate::models::HealthResponse;
use axum::Json;
use tracing::instrument;

/// Health check handler.
///
/// ## Example Response
///
/// ```json
/// { "status": "healthy" }
/// ```
#[instrument(skip_all, name = "gw.health.check")]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
