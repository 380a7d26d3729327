//! Real-time channel.
//!
//! Every authenticated WebSocket connection to the channel path joins one
//! [`ChannelHub`]. Text frames a connection sends are re-published to all
//! connections as a [`ChannelMessage`]. The identity bound at handshake is
//! fixed for the connection's lifetime.

pub mod session;

use crate::config::ChannelExpiryPolicy;
use crate::observability::metrics::set_channel_connections;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub use session::run_session;

/// Messages buffered per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// One message fanned out to every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Principal that sent the message.
    pub from: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

impl ChannelMessage {
    pub fn new(from: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            message: message.into(),
            sent_at: Utc::now(),
        }
    }
}

/// Broadcast hub shared by all channel connections.
#[derive(Debug)]
pub struct ChannelHub {
    sender: broadcast::Sender<ChannelMessage>,
    connections: AtomicUsize,
    expiry_policy: ChannelExpiryPolicy,
    clock_skew: Duration,
}

impl ChannelHub {
    /// `clock_skew` extends the disconnect deadline the same way it extends
    /// token validity at handshake.
    pub fn new(expiry_policy: ChannelExpiryPolicy, clock_skew: Duration) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            connections: AtomicUsize::new(0),
            expiry_policy,
            clock_skew,
        }
    }

    pub fn expiry_policy(&self) -> ChannelExpiryPolicy {
        self.expiry_policy
    }

    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Number of currently open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    /// Publish to every subscriber. Returns how many received it.
    pub fn publish(&self, message: ChannelMessage) -> usize {
        // Err only means there are no subscribers right now.
        self.sender.send(message).unwrap_or(0)
    }

    /// Register a connection and subscribe it to broadcasts.
    ///
    /// The subscription is taken before the connection is counted, so every
    /// counted connection already receives what is published. The connection
    /// is deregistered when the guard drops.
    pub fn join(self: &Arc<Self>) -> (ConnectionGuard, broadcast::Receiver<ChannelMessage>) {
        let updates = self.sender.subscribe();
        let count = self.connections.fetch_add(1, Ordering::Relaxed) + 1;
        set_channel_connections(count);
        let guard = ConnectionGuard {
            hub: Arc::clone(self),
        };
        (guard, updates)
    }
}

/// Keeps a connection counted while alive.
#[derive(Debug)]
pub struct ConnectionGuard {
    hub: Arc<ChannelHub>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let count = self
            .hub
            .connections
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1);
        set_channel_connections(count);
    }
}
