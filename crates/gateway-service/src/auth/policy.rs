//! Signing policy.
//!
//! The parameters every token is checked against: expected issuer, expected
//! audience, the symmetric signing secret, and the clock skew tolerance.
//! Built once at startup, wrapped in `Arc`, and shared read-only by all
//! concurrent validations. There is no runtime rotation; a new secret means a
//! process restart.

use crate::config::Config;
use common::secret::{ExposeSecret, SecretBox};
use std::fmt;
use std::time::Duration;

/// Immutable token validation parameters.
pub struct SigningPolicy {
    issuer: String,
    audience: String,
    secret: SecretBox<[u8]>,
    clock_skew: Duration,
}

impl SigningPolicy {
    /// Create a policy from its parts.
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        secret: Vec<u8>,
        clock_skew: Duration,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            secret: SecretBox::from(secret.into_boxed_slice()),
            clock_skew,
        }
    }

    /// Build the policy from loaded configuration.
    ///
    /// The signing key string is used as raw UTF-8 bytes.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.token_issuer.clone(),
            config.token_audience.clone(),
            config.token_signing_key.expose_secret().as_bytes().to_vec(),
            config.jwt_clock_skew(),
        )
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Raw secret bytes. Only the validator should call this.
    pub(crate) fn secret(&self) -> &[u8] {
        self.secret.expose_secret()
    }
}

impl fmt::Debug for SigningPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningPolicy")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("secret", &"[REDACTED]")
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}
