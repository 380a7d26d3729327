//! Verified identity context.
//!
//! An `IdentityContext` exists only as the output of a successful token
//! validation. It is attached to exactly one request (or one channel
//! connection) and dropped with it. The principal identifier is redacted in
//! Debug output to keep it out of logs.

use chrono::{DateTime, Utc};
use common::jwt::TokenClaims;
use std::collections::BTreeSet;
use std::fmt;

/// The authenticated principal and its role claims.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityContext {
    principal_id: String,
    roles: BTreeSet<String>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl IdentityContext {
    /// Build a context from claims that have already passed every check.
    ///
    /// Returns `None` if a timestamp is outside chrono's representable range.
    pub(crate) fn from_verified_claims(claims: TokenClaims) -> Option<Self> {
        let issued_at = DateTime::from_timestamp(claims.iat, 0)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)?;

        Some(Self {
            principal_id: claims.sub,
            roles: claims.roles.into_iter().collect(),
            issued_at,
            expires_at,
        })
    }

    /// The authenticated principal.
    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// Role claims carried by the token.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Exact, case-sensitive role membership.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl fmt::Debug for IdentityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityContext")
            .field("principal_id", &"[REDACTED]")
            .field("roles", &self.roles)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
