//! Per-route access requirements.
//!
//! Attached with `route_layer`, so it only runs for matched routes (unknown
//! paths still fall through to 404) and always after the transport gate has
//! resolved the caller's identity.

use crate::auth::{authorize, AccessDecision, AccessRequirement};
use crate::errors::GatewayError;
use crate::middleware::auth::IdentityExt;
use crate::observability::metrics::record_access_decision;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Enforce `requirement` on the wrapped routes.
///
/// # Response
///
/// - 401 Unauthorized if the requirement needs an identity and none is bound
/// - 403 Forbidden if the bound identity lacks the required role
#[instrument(skip_all, name = "gw.middleware.access")]
pub async fn require_access(
    State(requirement): State<Arc<AccessRequirement>>,
    req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let decision = authorize(req.identity(), &requirement);

    match decision {
        AccessDecision::Allow => {
            record_access_decision(decision.as_str(), None);
            Ok(next.run(req).await)
        }
        AccessDecision::Deny(reason) => {
            record_access_decision(decision.as_str(), Some(reason.as_str()));
            tracing::debug!(
                target: "gw.middleware.access",
                path = %req.uri().path(),
                requirement = ?requirement.as_ref(),
                reason = reason.as_str(),
                "Access denied"
            );
            Err(reason.into())
        }
    }
}
