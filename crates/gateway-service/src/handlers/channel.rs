//! Channel handlers.
//!
//! The WebSocket upgrade for the real-time channel and the admin view of its
//! connection count.

use crate::auth::IdentityContext;
use crate::channel::run_session;
use crate::models::ChannelStatsResponse;
use crate::routes::AppState;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for the WebSocket handshake on the channel path.
///
/// The identity bound by the transport gate moves into the connection task
/// and stays fixed for the connection's lifetime.
#[instrument(skip_all, name = "gw.handlers.channel_connect")]
pub async fn channel_connect(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<IdentityContext>,
    ws: WebSocketUpgrade,
) -> Response {
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| run_session(socket, identity, hub))
}

/// Handler for GET /api/v1/admin/channel
#[instrument(skip_all, name = "gw.handlers.channel_stats")]
pub async fn channel_stats(State(state): State<Arc<AppState>>) -> Json<ChannelStatsResponse> {
    Json(ChannelStatsResponse {
        connections: state.hub.connection_count(),
        expiry_policy: state.hub.expiry_policy().as_str().to_string(),
    })
}
