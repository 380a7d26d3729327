//! Gateway error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic to avoid
//! leaking which validation step failed. The specific reason is logged
//! server-side.

use crate::auth::{DenyReason, RejectionReason};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const AUTH_REALM: &str = "gateway-api";

/// Gateway error type.
///
/// Maps to appropriate HTTP status codes:
/// - InvalidToken, Unauthenticated: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A credential was presented and rejected by the validator.
    #[error("Invalid token: {0}")]
    InvalidToken(RejectionReason),

    /// No credential was presented for a target that requires one.
    #[error("Authentication required")]
    Unauthenticated,

    /// The identity does not satisfy the target's role requirement.
    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),
}

impl GatewayError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidToken(_) | GatewayError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// `WWW-Authenticate` challenge for 401 responses (RFC 6750 §3).
    fn challenge(&self) -> Option<String> {
        match self {
            GatewayError::InvalidToken(_) => Some(format!(
                "Bearer realm=\"{AUTH_REALM}\", error=\"invalid_token\""
            )),
            GatewayError::Unauthenticated => Some(format!("Bearer realm=\"{AUTH_REALM}\"")),
            _ => None,
        }
    }
}

impl From<RejectionReason> for GatewayError {
    fn from(reason: RejectionReason) -> Self {
        GatewayError::InvalidToken(reason)
    }
}

impl From<DenyReason> for GatewayError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NotAuthenticated => GatewayError::Unauthenticated,
            DenyReason::InsufficientRole => GatewayError::Forbidden,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            GatewayError::InvalidToken(reason) => {
                tracing::debug!(target: "gw.errors", reason = reason.as_str(), "Token rejected");
                ("INVALID_TOKEN", reason.to_string())
            }
            GatewayError::Unauthenticated => (
                "UNAUTHENTICATED",
                "Authentication is required to access this resource".to_string(),
            ),
            GatewayError::Forbidden => (
                "FORBIDDEN",
                "You do not have permission to access this resource".to_string(),
            ),
            GatewayError::NotFound(resource) => ("NOT_FOUND", resource.clone()),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if let Some(challenge) = self.challenge() {
            if let Ok(header_value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, header_value);
            }
        }

        response
    }
}
