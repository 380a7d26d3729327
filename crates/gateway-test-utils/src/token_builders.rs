//! Builder patterns for test tokens
//!
//! Provides fluent APIs for minting signed HMAC tokens that a test gateway
//! will (or deliberately will not) accept.

use chrono::Utc;
use common::jwt::{Audience, TokenClaims};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

/// Mints tokens for one signing policy.
///
/// # Example
/// ```rust,ignore
/// let minter = TokenMinter::new(TEST_ISSUER, TEST_ISSUER, TEST_SIGNING_KEY);
/// let token = minter
///     .token()
///     .for_user("alice")
///     .with_role("Admin")
///     .expires_in(3600)
///     .sign();
/// ```
#[derive(Debug, Clone)]
pub struct TokenMinter {
    issuer: String,
    audience: String,
    secret: Vec<u8>,
}

impl TokenMinter {
    pub fn new(issuer: &str, audience: &str, secret: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Start a token that matches this minter's policy.
    pub fn token(&self) -> TestTokenBuilder {
        TestTokenBuilder::new(self.issuer.clone(), self.audience.clone(), self.secret.clone())
    }
}

/// Builder for one signed test token
pub struct TestTokenBuilder {
    claims: TokenClaims,
    algorithm: Algorithm,
    secret: Vec<u8>,
}

impl TestTokenBuilder {
    fn new(issuer: String, audience: String, secret: Vec<u8>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            claims: TokenClaims::new(
                "test-subject".to_string(),
                issuer,
                Audience::One(audience),
                now,
                now + 3600,
            ),
            algorithm: Algorithm::HS256,
            secret,
        }
    }

    /// Set the subject (principal id)
    pub fn for_user(mut self, subject: &str) -> Self {
        self.claims.sub = subject.to_string();
        self
    }

    /// Add a role claim
    pub fn with_role(mut self, role: &str) -> Self {
        self.claims.roles.push(role.to_string());
        self
    }

    /// Override the issuer
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.claims.iss = issuer.to_string();
        self
    }

    /// Override the audience
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.claims.aud = Audience::One(audience.to_string());
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.claims.exp = Utc::now().timestamp() + seconds;
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.claims.iat = timestamp;
        self
    }

    /// Set not-before timestamp
    pub fn not_before(mut self, timestamp: i64) -> Self {
        self.claims.nbf = Some(timestamp);
        self
    }

    /// Sign with another HMAC algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sign with a secret the gateway does not know
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = secret.as_bytes().to_vec();
        self
    }

    /// The claim set as it will be signed
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Sign and encode the token
    pub fn sign(self) -> String {
        encode(
            &Header::new(self.algorithm),
            &self.claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .expect("HMAC signing never fails")
    }
}
