//! JWT utilities shared across the gateway crates.
//!
//! This module provides the pieces of credential handling that do not depend
//! on the HTTP stack:
//! - Size limits for DoS prevention
//! - Clock skew constants
//! - The claim-set shape carried by access tokens
//! - The lifetime window check (`iat`/`nbf`/`exp` with clock skew)
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Generic error messages prevent information leakage
//! - The `sub` field in [`TokenClaims`] is redacted in Debug output
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{validate_lifetime_at, TokenClaims, MAX_JWT_SIZE_BYTES};
//!
//! if token.len() > MAX_JWT_SIZE_BYTES {
//!     return Err("Token too large");
//! }
//!
//! // After signature verification
//! validate_lifetime_at(&claims, policy.clock_skew, now)?;
//! ```

use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected BEFORE any base64 decoding or HMAC
/// computation. Typical access tokens are 200-600 bytes; 8KB leaves room for
/// a generous role list.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance.
///
/// Zero: expiry is enforced strictly, with no grace window.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(0);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Configuration above this value is refused at startup.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors produced by the lifetime window check.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// The variant itself is what gets logged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifetimeError {
    /// `exp` is before `now - skew`.
    #[error("The access token is invalid or expired")]
    Expired,

    /// `iat` or `nbf` is after `now + skew`.
    #[error("The access token is invalid or expired")]
    NotYetValid,
}

// =============================================================================
// Claims Types
// =============================================================================

/// The `aud` claim: RFC 7519 allows a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience value.
    One(String),
    /// Several audience values; the token is valid for any of them.
    Many(Vec<String>),
}

impl Audience {
    /// Returns true if `expected` is one of the audiences of this token.
    #[must_use]
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::One(aud) => aud == expected,
            Audience::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Audience::One(value.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Role claims arrive either as a single string or as an array.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(role) => vec![role],
        OneOrMany::Many(roles) => roles,
    })
}

/// A JWT NumericDate: seconds since the epoch, possibly fractional.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumericDate {
    Whole(i64),
    Fractional(f64),
}

impl NumericDate {
    /// Largest fractional value accepted; beyond 2^53 an `f64` has no
    /// fractional part left.
    const MAX_FRACTIONAL: f64 = 9_007_199_254_740_992.0;

    /// Whole seconds, rounding fractional values down.
    fn into_seconds(self) -> Option<i64> {
        match self {
            NumericDate::Whole(secs) => Some(secs),
            NumericDate::Fractional(secs)
                if secs.is_finite() && secs.abs() <= Self::MAX_FRACTIONAL =>
            {
                #[allow(clippy::cast_possible_truncation)]
                Some(secs.floor() as i64)
            }
            NumericDate::Fractional(_) => None,
        }
    }
}

fn numeric_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    NumericDate::deserialize(deserializer)?
        .into_seconds()
        .ok_or_else(|| de::Error::custom("NumericDate out of range"))
}

fn optional_numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumericDate>::deserialize(deserializer)?
        .map(|date| {
            date.into_seconds()
                .ok_or_else(|| de::Error::custom("NumericDate out of range"))
        })
        .transpose()
}

/// Access token claims structure.
///
/// # Fields
///
/// - `sub`: Principal identifier
/// - `iss`: Issuer identity
/// - `aud`: Audience identity (string or array)
/// - `exp`: Expiration timestamp (Unix epoch seconds)
/// - `iat`: Issued-at timestamp (Unix epoch seconds)
/// - `nbf`: Optional not-before timestamp (Unix epoch seconds)
///
/// Timestamps may be fractional on the wire; they are floored to whole seconds.
/// - `roles`: Zero or more role names (also accepted as `role`)
///
/// # Security
///
/// The `sub` field is redacted in Debug output to prevent accidental logging
/// of principal identifiers.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (principal identifier) - redacted in Debug output.
    pub sub: String,

    /// Issuer.
    pub iss: String,

    /// Audience.
    pub aud: Audience,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(deserialize_with = "numeric_date")]
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(deserialize_with = "numeric_date")]
    pub iat: i64,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(
        default,
        deserialize_with = "optional_numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub nbf: Option<i64>,

    /// Role claims.
    #[serde(
        default,
        alias = "role",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub roles: Vec<String>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("roles", &self.roles)
            .finish()
    }
}

impl TokenClaims {
    /// Creates a new `TokenClaims` instance without roles.
    ///
    /// # Arguments
    ///
    /// * `sub` - Principal identifier
    /// * `iss` - Issuer
    /// * `aud` - Audience
    /// * `iat` - Issued-at timestamp (Unix epoch seconds)
    /// * `exp` - Expiration timestamp (Unix epoch seconds)
    #[must_use]
    pub fn new(sub: String, iss: String, aud: Audience, iat: i64, exp: i64) -> Self {
        Self {
            sub,
            iss,
            aud,
            exp,
            iat,
            nbf: None,
            roles: Vec::new(),
        }
    }

    /// Replaces the role claims.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Deterministic lifetime validation against an explicit `now` timestamp.
///
/// A token is valid while `iat - skew <= now <= exp + skew`, and, when `nbf`
/// is present, `nbf - skew <= now`. Both bounds are inclusive.
///
/// # Errors
///
/// - `LifetimeError::NotYetValid` - `iat` or `nbf` lies beyond `now + skew`
/// - `LifetimeError::Expired` - `exp` lies before `now - skew`
pub fn validate_lifetime_at(
    claims: &TokenClaims,
    clock_skew: Duration,
    now: i64,
) -> Result<(), LifetimeError> {
    let skew = i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX);
    let latest_start = now.saturating_add(skew);

    let starts_at = claims.nbf.map_or(claims.iat, |nbf| nbf.max(claims.iat));
    if starts_at > latest_start {
        tracing::debug!(
            target: "common.jwt",
            iat = claims.iat,
            nbf = ?claims.nbf,
            now = now,
            clock_skew_secs = skew,
            "Token rejected: not yet valid"
        );
        return Err(LifetimeError::NotYetValid);
    }

    if claims.exp < now.saturating_sub(skew) {
        tracing::debug!(
            target: "common.jwt",
            exp = claims.exp,
            now = now,
            clock_skew_secs = skew,
            "Token rejected: expired"
        );
        return Err(LifetimeError::Expired);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
