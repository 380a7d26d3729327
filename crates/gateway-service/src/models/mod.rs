//! Gateway response models.

use serde::{Deserialize, Serialize};

/// Health check response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status.
    pub status: String,
}

/// Channel statistics.
///
/// Returned by the `/api/v1/admin/channel` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStatsResponse {
    /// Currently open channel connections.
    pub connections: usize,

    /// Configured expiry policy (`keep-open` or `disconnect`).
    pub expiry_policy: String,
}
