//! Current identity handler.
//!
//! Returns the identity the transport gate bound to this request.

use crate::auth::IdentityContext;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `/api/v1/me` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Principal identifier (token `sub`).
    pub sub: String,

    /// Role claims, sorted.
    pub roles: Vec<String>,

    /// Token expiration timestamp.
    pub exp: i64,

    /// Token issued-at timestamp.
    pub iat: i64,
}

impl From<&IdentityContext> for MeResponse {
    fn from(identity: &IdentityContext) -> Self {
        Self {
            sub: identity.principal_id().to_string(),
            roles: identity.roles().iter().cloned().collect(),
            exp: identity.expires_at().timestamp(),
            iat: identity.issued_at().timestamp(),
        }
    }
}

/// Handler for GET /api/v1/me
///
/// Requires an authenticated identity (enforced by the route's access
/// requirement).
///
/// ## Response
///
/// ```json
/// {
///   "sub": "customer-42",
///   "roles": ["Admin", "Customer"],
///   "exp": 1234567890,
///   "iat": 1234567800
/// }
/// ```
#[instrument(skip_all, name = "gw.handlers.me")]
pub async fn get_me(Extension(identity): Extension<IdentityContext>) -> Json<MeResponse> {
    tracing::debug!(target: "gw.handlers.me", "Returning bound identity");
    Json(MeResponse::from(&identity))
}
