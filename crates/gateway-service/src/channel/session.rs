//! One channel connection.
//!
//! The session loop multiplexes three sources: frames from the client, hub
//! broadcasts destined for the client, and (under the disconnect policy) the
//! bound token's expiry deadline.

use super::{ChannelHub, ChannelMessage};
use crate::auth::IdentityContext;
use crate::config::ChannelExpiryPolicy;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Close reason sent when the bound token expires mid-connection.
pub const EXPIRED_CLOSE_REASON: &str = "token expired";

/// Time remaining before a connection must close, or `None` if it may stay
/// open regardless of token expiry.
pub fn expiry_deadline(
    policy: ChannelExpiryPolicy,
    expires_at: DateTime<Utc>,
    clock_skew: Duration,
    now: DateTime<Utc>,
) -> Option<Duration> {
    match policy {
        ChannelExpiryPolicy::KeepOpen => None,
        ChannelExpiryPolicy::Disconnect => {
            // At most one of these is non-zero.
            let remaining = (expires_at - now).to_std().unwrap_or(Duration::ZERO);
            let past_due = (now - expires_at).to_std().unwrap_or(Duration::ZERO);
            Some(remaining.saturating_add(clock_skew).saturating_sub(past_due))
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Drive one upgraded connection until either side closes.
#[instrument(skip_all, name = "gw.channel.session", fields(connection_id = %Uuid::new_v4()))]
pub async fn run_session(socket: WebSocket, identity: IdentityContext, hub: Arc<ChannelHub>) {
    let (_guard, mut updates) = hub.join();
    let (mut sink, mut stream) = socket.split();

    let deadline = expiry_deadline(
        hub.expiry_policy(),
        identity.expires_at(),
        hub.clock_skew(),
        Utc::now(),
    )
    .map(|remaining| Instant::now() + remaining);

    tracing::debug!(
        target: "gw.channel",
        connections = hub.connection_count(),
        policy = hub.expiry_policy().as_str(),
        "Channel connection opened"
    );

    loop {
        tokio::select! {
            () = wait_for(deadline) => {
                tracing::debug!(target: "gw.channel", "Closing channel connection: token expired");
                let frame = CloseFrame {
                    code: close_code::POLICY,
                    reason: Cow::Borrowed(EXPIRED_CLOSE_REASON),
                };
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    tracing::debug!(target: "gw.channel", error = %e, "Failed to send close frame");
                }
                break;
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    hub.publish(ChannelMessage::new(identity.principal_id(), text));
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Ping/pong are answered by the websocket layer; binary is not part of the protocol.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(target: "gw.channel", error = %e, "Channel receive failed");
                    break;
                }
            },
            update = updates.recv() => match update {
                Ok(message) => {
                    let payload = match serde_json::to_string(&message) {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::error!(target: "gw.channel", error = %e, "Failed to encode channel message");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "gw.channel", skipped, "Channel subscriber lagged, messages dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!(target: "gw.channel", "Channel connection closed");
}
