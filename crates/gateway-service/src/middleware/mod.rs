//! HTTP middleware for the gateway.
//!
//! # Components
//!
//! - `auth` - Transport gate: locate and validate credentials on every request
//! - `access` - Per-route access requirements
//! - `http_metrics` - Request metrics for every response

pub mod access;
pub mod auth;
pub mod http_metrics;

pub use access::require_access;
pub use auth::{authenticate, GateOutcome, IdentityExt, TransportGate};
pub use http_metrics::http_metrics_middleware;
