//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. The gateway holds
//! two kinds of secrets:
//!
//! - The symmetric token signing key (loaded once at startup)
//! - Every credential located on an inbound request (bearer header or
//!   `access_token` query value)
//!
//! Both implement `Debug` with redaction, so any struct that derives `Debug`
//! around them is safe to pass to `tracing`. Reading the value requires an
//! explicit `expose_secret()` call, which keeps the places that touch raw key
//! material easy to audit.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Policy {
//!     issuer: String,
//!     signing_key: SecretString,
//! }
//!
//! let policy = Policy {
//!     issuer: "shop-api".to_string(),
//!     signing_key: SecretString::from("0123456789abcdef0123456789abcdef"),
//! };
//!
//! // Safe - the key is redacted
//! println!("{:?}", policy);
//!
//! let key_bytes: &[u8] = policy.signing_key.expose_secret().as_bytes();
//! assert_eq!(key_bytes.len(), 32);
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
