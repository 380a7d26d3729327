//! JWT validation against the signing policy.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only the HMAC family (HS256/HS384/HS512) is accepted; any other `alg`
//!   in the header, `none` included, is treated as a signature failure
//! - Issuer, audience and lifetime are checked only after the signature holds
//! - Every rejection surfaces to callers with the same generic message; the
//!   specific reason is kept for debug logging and metrics labels
//!
//! Validation is a pure function of (credential, policy, now). `validate` reads
//! the wall clock; `validate_at` takes `now` explicitly for deterministic tests.

use crate::auth::identity::IdentityContext;
use crate::auth::locator::Credential;
use crate::auth::policy::SigningPolicy;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::jwt::{validate_lifetime_at, LifetimeError, TokenClaims, MAX_JWT_SIZE_BYTES};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// HMAC algorithms accepted for symmetric signatures.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Why a credential was rejected.
///
/// All variants share one caller-visible message so the response never tells
/// a forger which check failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("The access token is invalid or expired")]
    MalformedToken,

    #[error("The access token is invalid or expired")]
    SignatureInvalid,

    #[error("The access token is invalid or expired")]
    IssuerMismatch,

    #[error("The access token is invalid or expired")]
    AudienceMismatch,

    #[error("The access token is invalid or expired")]
    Expired,

    #[error("The access token is invalid or expired")]
    NotYetValid,
}

impl RejectionReason {
    /// Bounded label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::MalformedToken => "malformed_token",
            RejectionReason::SignatureInvalid => "signature_invalid",
            RejectionReason::IssuerMismatch => "issuer_mismatch",
            RejectionReason::AudienceMismatch => "audience_mismatch",
            RejectionReason::Expired => "expired",
            RejectionReason::NotYetValid => "not_yet_valid",
        }
    }
}

impl From<LifetimeError> for RejectionReason {
    fn from(err: LifetimeError) -> Self {
        match err {
            LifetimeError::Expired => RejectionReason::Expired,
            LifetimeError::NotYetValid => RejectionReason::NotYetValid,
        }
    }
}

/// Validates credentials against one immutable [`SigningPolicy`].
pub struct TokenValidator {
    policy: Arc<SigningPolicy>,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    /// Create a validator for `policy`.
    ///
    /// The decoding key is derived once here; the policy is shared, not copied.
    pub fn new(policy: Arc<SigningPolicy>) -> Self {
        let decoding_key = DecodingKey::from_secret(policy.secret());

        // jsonwebtoken verifies the signature only. Claim checks are done below
        // so each failure maps to its own rejection reason.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            policy,
            decoding_key,
            validation,
        }
    }

    pub fn policy(&self) -> &SigningPolicy {
        &self.policy
    }

    /// Validate `credential` against the policy at the current wall-clock time.
    pub fn validate(&self, credential: &Credential) -> Result<IdentityContext, RejectionReason> {
        self.validate_at(credential, chrono::Utc::now().timestamp())
    }

    /// Validate `credential` against the policy at `now` (Unix epoch seconds).
    ///
    /// # Security Checks
    ///
    /// 1. Size check - reject tokens > 8KB before parsing
    /// 2. HMAC signature over header and claims, algorithm in the HMAC family
    /// 3. Claim-set structure (required claims present, non-empty `sub`)
    /// 4. `iss` equals the policy issuer
    /// 5. `aud` contains the policy audience
    /// 6. `now` within `[iat - skew, exp + skew]` (and after `nbf - skew`)
    #[instrument(skip_all)]
    pub fn validate_at(
        &self,
        credential: &Credential,
        now: i64,
    ) -> Result<IdentityContext, RejectionReason> {
        let token = credential.as_str();

        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "gw.auth.jwt",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(RejectionReason::MalformedToken);
        }

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                        RejectionReason::SignatureInvalid
                    }
                    _ if names_unsupported_algorithm(token) => RejectionReason::SignatureInvalid,
                    _ => RejectionReason::MalformedToken,
                };
                tracing::debug!(
                    target: "gw.auth.jwt",
                    error = %e,
                    reason = reason.as_str(),
                    "Token verification failed"
                );
                reason
            })?
            .claims;

        if claims.sub.trim().is_empty() {
            tracing::debug!(target: "gw.auth.jwt", "Token rejected: empty subject");
            return Err(RejectionReason::MalformedToken);
        }

        if claims.iss != self.policy.issuer() {
            tracing::debug!(
                target: "gw.auth.jwt",
                iss = %claims.iss,
                expected = %self.policy.issuer(),
                "Token rejected: issuer mismatch"
            );
            return Err(RejectionReason::IssuerMismatch);
        }

        if !claims.aud.contains(self.policy.audience()) {
            tracing::debug!(
                target: "gw.auth.jwt",
                aud = ?claims.aud,
                expected = %self.policy.audience(),
                "Token rejected: audience mismatch"
            );
            return Err(RejectionReason::AudienceMismatch);
        }

        validate_lifetime_at(&claims, self.policy.clock_skew(), now)?;

        let identity = IdentityContext::from_verified_claims(claims).ok_or_else(|| {
            tracing::debug!(target: "gw.auth.jwt", "Token rejected: timestamp out of range");
            RejectionReason::MalformedToken
        })?;

        tracing::debug!(
            target: "gw.auth.jwt",
            roles = identity.roles().len(),
            "Token validated successfully"
        );
        Ok(identity)
    }
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenValidator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Header fields read when `jsonwebtoken` cannot parse the header itself.
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// True when the header is readable JSON but names an algorithm outside the
/// HMAC family that `jsonwebtoken` has no variant for (`none`, `HS1024`, ...).
fn names_unsupported_algorithm(token: &str) -> bool {
    let Some((header, _)) = token.split_once('.') else {
        return false;
    };
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(header) else {
        return false;
    };

    serde_json::from_slice::<RawHeader>(&bytes)
        .is_ok_and(|raw| !matches!(raw.alg.as_str(), "HS256" | "HS384" | "HS512"))
}
