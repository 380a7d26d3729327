//! Gateway configuration.
//!
//! Configuration is loaded once from environment variables at startup and is
//! never mutated afterwards. The signing key is held as a [`SecretString`] and
//! redacted in Debug output.

use crate::auth::ChannelRoute;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default real-time channel path.
pub const DEFAULT_CHANNEL_PATH: &str = "/chatHub";

/// Default graceful-shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Minimum signing key length in bytes (256 bits, matching HS256 output size).
pub const MIN_SIGNING_KEY_BYTES: usize = 32;

/// Fixed routes the channel path may not shadow.
pub const RESERVED_PATHS: [&str; 4] = ["/health", "/metrics", "/api/v1/me", "/api/v1/admin/channel"];

/// What happens to an open channel connection once its token expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelExpiryPolicy {
    /// Identity is fixed at handshake; the connection outlives the token.
    #[default]
    KeepOpen,

    /// The connection is closed when the bound token's `exp` passes.
    Disconnect,
}

impl ChannelExpiryPolicy {
    /// Returns the configuration string for this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelExpiryPolicy::KeepOpen => "keep-open",
            ChannelExpiryPolicy::Disconnect => "disconnect",
        }
    }
}

impl FromStr for ChannelExpiryPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-open" => Ok(ChannelExpiryPolicy::KeepOpen),
            "disconnect" => Ok(ChannelExpiryPolicy::Disconnect),
            other => Err(ConfigError::InvalidChannelExpiryPolicy(format!(
                "CHANNEL_EXPIRY_POLICY must be 'keep-open' or 'disconnect', got '{}'",
                other
            ))),
        }
    }
}

/// Origins allowed by the CORS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    /// Any origin (`*`).
    Any,

    /// An explicit list of origins.
    List(Vec<String>),
}

/// Gateway configuration.
///
/// Loaded from environment variables with sensible defaults.
/// The signing key is redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Expected `iss` claim.
    pub token_issuer: String,

    /// Expected `aud` claim (defaults to the issuer).
    pub token_audience: String,

    /// Symmetric signing key shared with the token issuer.
    pub token_signing_key: SecretString,

    /// JWT clock skew tolerance in seconds (default: 0).
    pub jwt_clock_skew_seconds: u64,

    /// Path prefix of the real-time channel (default: "/chatHub").
    pub channel_path: String,

    /// Behaviour of channel connections whose token expires mid-connection.
    pub channel_expiry_policy: ChannelExpiryPolicy,

    /// CORS allowed origins (default: any).
    pub cors_allowed_origins: CorsOrigins,

    /// Graceful shutdown drain period in seconds.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("token_issuer", &self.token_issuer)
            .field("token_audience", &self.token_audience)
            .field("token_signing_key", &"[REDACTED]")
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("channel_path", &self.channel_path)
            .field("channel_expiry_policy", &self.channel_expiry_policy)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid token signing key: {0}")]
    InvalidSigningKey(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid channel path: {0}")]
    InvalidChannelPath(String),

    #[error("Invalid channel expiry policy: {0}")]
    InvalidChannelExpiryPolicy(String),

    #[error("Invalid drain period: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let token_issuer = vars
            .get("TOKEN_ISSUER")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("TOKEN_ISSUER".to_string()))?
            .clone();

        let token_audience = vars
            .get("TOKEN_AUDIENCE")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| token_issuer.clone());

        let token_signing_key = vars
            .get("TOKEN_SIGNING_KEY")
            .map(|v| SecretString::from(v.clone()))
            .ok_or_else(|| ConfigError::MissingEnvVar("TOKEN_SIGNING_KEY".to_string()))?;

        let key_len = token_signing_key.expose_secret().len();
        if key_len < MIN_SIGNING_KEY_BYTES {
            return Err(ConfigError::InvalidSigningKey(format!(
                "TOKEN_SIGNING_KEY must be at least {} bytes, got {}",
                MIN_SIGNING_KEY_BYTES, key_len
            )));
        }

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs()
        };

        let channel_path = vars
            .get("CHANNEL_PATH")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CHANNEL_PATH.to_string());

        // Route syntax characters would turn the path into a pattern.
        if !channel_path.starts_with('/')
            || channel_path.len() < 2
            || channel_path.contains([':', '*', '{', '}', '?', '#'])
        {
            return Err(ConfigError::InvalidChannelPath(format!(
                "CHANNEL_PATH must be a literal absolute path other than '/', got '{}'",
                channel_path
            )));
        }

        // The channel route is a prefix match; it must not cover a fixed route,
        // or the query credential would reach it.
        let route = ChannelRoute::with_query_credential(channel_path.clone());
        if let Some(reserved) = RESERVED_PATHS.iter().find(|path| route.matches(path)) {
            return Err(ConfigError::InvalidChannelPath(format!(
                "CHANNEL_PATH '{}' overlaps the built-in route '{}'",
                channel_path, reserved
            )));
        }

        let channel_expiry_policy = match vars.get("CHANNEL_EXPIRY_POLICY") {
            Some(value) => value.parse()?,
            None => ChannelExpiryPolicy::default(),
        };

        let cors_allowed_origins = match vars.get("CORS_ALLOWED_ORIGINS").map(|v| v.trim()) {
            None | Some("") | Some("*") => CorsOrigins::Any,
            Some(list) => CorsOrigins::List(
                list.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(ToString::to_string)
                    .collect(),
            ),
        };

        let drain_seconds = if let Some(value_str) = vars.get("GATEWAY_DRAIN_SECONDS") {
            value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "GATEWAY_DRAIN_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?
        } else {
            DEFAULT_DRAIN_SECONDS
        };

        Ok(Config {
            bind_address,
            token_issuer,
            token_audience,
            token_signing_key,
            jwt_clock_skew_seconds,
            channel_path,
            channel_expiry_policy,
            cors_allowed_origins,
            drain_seconds,
        })
    }

    /// Clock skew tolerance as a `Duration`.
    pub fn jwt_clock_skew(&self) -> Duration {
        Duration::from_secs(self.jwt_clock_skew_seconds)
    }
}
