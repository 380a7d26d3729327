//! Common utilities and types shared across the gateway crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (claim shapes, lifetime window, constants)
pub mod jwt;
