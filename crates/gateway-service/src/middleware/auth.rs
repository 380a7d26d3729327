//! Transport gate.
//!
//! Runs on every inbound request before routing-level access checks. Locates
//! a credential (header, or query string on channel handshakes), validates it,
//! and attaches the resulting `IdentityContext` to request extensions.
//!
//! A request without a credential passes through as anonymous. A request with
//! a credential that fails validation is rejected here with 401; it is never
//! downgraded to anonymous.

use crate::auth::{CredentialLocator, IdentityContext, InboundRequest, RejectionReason, TokenValidator};
use crate::errors::GatewayError;
use crate::observability::metrics::record_token_validation;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Result of admitting a request at the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// A credential was presented and verified.
    Authenticated(IdentityContext),
    /// No credential was presented.
    Anonymous,
}

/// Locator and validator bundled for the gate middleware.
#[derive(Debug)]
pub struct TransportGate {
    locator: CredentialLocator,
    validator: TokenValidator,
}

impl TransportGate {
    pub fn new(locator: CredentialLocator, validator: TokenValidator) -> Self {
        Self { locator, validator }
    }

    pub fn locator(&self) -> &CredentialLocator {
        &self.locator
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Decide what identity, if any, this request carries.
    pub fn admit(&self, request: &InboundRequest<'_>) -> Result<GateOutcome, RejectionReason> {
        let Some(credential) = self.locator.locate(request) else {
            tracing::trace!(
                target: "gw.middleware.auth",
                path = %request.path(),
                "No credential presented"
            );
            return Ok(GateOutcome::Anonymous);
        };

        match self.validator.validate(&credential) {
            Ok(identity) => {
                record_token_validation("success");
                tracing::debug!(
                    target: "gw.middleware.auth",
                    source = credential.source().as_str(),
                    "Request authenticated"
                );
                Ok(GateOutcome::Authenticated(identity))
            }
            Err(reason) => {
                record_token_validation(reason.as_str());
                tracing::debug!(
                    target: "gw.middleware.auth",
                    source = credential.source().as_str(),
                    reason = reason.as_str(),
                    "Credential rejected"
                );
                Err(reason)
            }
        }
    }
}

/// Authentication middleware applied to the whole router.
///
/// # Response
///
/// - Returns 401 Unauthorized with WWW-Authenticate header if a credential is
///   present but invalid
/// - Otherwise continues, with `IdentityContext` in extensions when
///   authenticated
#[instrument(skip_all, name = "gw.middleware.auth")]
pub async fn authenticate(
    State(gate): State<Arc<TransportGate>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let outcome = gate.admit(&InboundRequest::from_request(&req))?;

    if let GateOutcome::Authenticated(identity) = outcome {
        req.extensions_mut().insert(identity);
    }

    Ok(next.run(req).await)
}

/// Extension trait for extracting the verified identity from a request.
pub trait IdentityExt {
    /// Returns `None` for anonymous requests or when the gate is not applied.
    fn identity(&self) -> Option<&IdentityContext>;
}

impl<B> IdentityExt for axum::extract::Request<B> {
    fn identity(&self) -> Option<&IdentityContext> {
        self.extensions().get::<IdentityContext>()
    }
}
