//! Observability for the gateway.
//!
//! Provides metrics definitions and the Prometheus recorder setup. Logging is
//! plain `tracing`; targets are prefixed `gw.`.

pub mod metrics;
