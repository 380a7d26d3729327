//! Gateway Service Library
//!
//! A token-authenticated HTTP gateway with a real-time WebSocket channel.
//! Every inbound request passes through a transport gate that locates a
//! bearer credential, verifies it against a fixed signing policy, and binds
//! the resulting identity to the request. Per-route access requirements then
//! decide whether the request proceeds.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware (gate, access) -> handlers/*.rs -> channel/
//!                       |
//!                       v
//!                    auth/ (locator, validator, access)
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `auth` - Credential location, token validation, access decisions
//! - `middleware` - Transport gate, access requirements, HTTP metrics
//! - `channel` - Real-time broadcast channel over WebSocket
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `models` - Response models
//! - `observability` - Metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod channel;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
