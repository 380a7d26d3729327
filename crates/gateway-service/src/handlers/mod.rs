//! HTTP request handlers for the gateway.

pub mod channel;
pub mod health;
pub mod me;
pub mod metrics;

pub use channel::{channel_connect, channel_stats};
pub use health::health_check;
pub use me::get_me;
pub use metrics::metrics_handler;
