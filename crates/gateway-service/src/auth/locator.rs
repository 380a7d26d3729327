//! Transport-aware credential location.
//!
//! Ordinary HTTP calls carry their token in `Authorization: Bearer <token>`.
//! Browser WebSocket APIs cannot set custom headers on the opening handshake,
//! so connection-establishment requests aimed at a configured channel path may
//! carry it in the `access_token` query parameter instead.
//!
//! # Security
//!
//! - The query fallback is restricted to channel routes AND to handshake
//!   requests; tokens in the URL of ordinary API paths are ignored so they
//!   are never encouraged to end up in access logs
//! - Located credentials are wrapped in `SecretString`
//! - A malformed `Authorization` header is treated as absent, not as an error

use axum::extract::Query;
use axum::http::{header, HeaderMap, Method, Request, Uri};
use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Query parameter consulted on channel handshakes.
pub const ACCESS_TOKEN_QUERY_PARAM: &str = "access_token";

/// Kind of inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// A regular request/response call.
    Stateless,

    /// The opening handshake of a persistent (WebSocket) connection.
    ConnectionEstablishment,
}

impl TransportKind {
    /// Classify a request: a `GET` carrying `Upgrade: websocket` opens a
    /// connection, everything else is stateless.
    pub fn classify(method: &Method, headers: &HeaderMap) -> Self {
        let is_websocket_upgrade = headers
            .get(header::UPGRADE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));

        if *method == Method::GET && is_websocket_upgrade {
            TransportKind::ConnectionEstablishment
        } else {
            TransportKind::Stateless
        }
    }
}

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Header,
    Query,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Header => "header",
            CredentialSource::Query => "query",
        }
    }
}

/// An opaque signed token located on a request. Never parsed here.
#[derive(Clone)]
pub struct Credential {
    token: SecretString,
    source: CredentialSource,
}

impl Credential {
    pub fn new(token: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            token: SecretString::from(token.into()),
            source,
        }
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub(crate) fn as_str(&self) -> &str {
        self.token.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

/// The view of an inbound request the locator needs: headers, target URI and
/// transport kind.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    headers: &'a HeaderMap,
    uri: &'a Uri,
    kind: TransportKind,
}

impl<'a> InboundRequest<'a> {
    pub fn new(headers: &'a HeaderMap, uri: &'a Uri, kind: TransportKind) -> Self {
        Self { headers, uri, kind }
    }

    /// Describe an HTTP request, classifying its transport kind.
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let kind = TransportKind::classify(req.method(), req.headers());
        Self::new(req.headers(), req.uri(), kind)
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    fn authorization(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
    }

    fn query_param(&self, name: &str) -> Option<String> {
        let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(self.uri).ok()?;
        params.remove(name)
    }
}

/// A path prefix designated for persistent connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRoute {
    pub path_prefix: String,
    pub requires_credential_from_query: bool,
}

impl ChannelRoute {
    /// A channel route that accepts the `access_token` query fallback.
    pub fn with_query_credential(path_prefix: impl Into<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            requires_credential_from_query: true,
        }
    }

    /// Segment-aware, ASCII case-insensitive prefix match: `/chatHub` matches
    /// `/chathub` and `/chatHub/negotiate` but not `/chatHubX`.
    pub fn matches(&self, path: &str) -> bool {
        let prefix = self.path_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return false;
        }

        match path.get(..prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(prefix) => {
                matches!(path.as_bytes().get(prefix.len()), None | Some(b'/'))
            }
            _ => false,
        }
    }
}

/// Finds the credential on a request according to the channel route table.
#[derive(Debug, Clone)]
pub struct CredentialLocator {
    routes: Arc<[ChannelRoute]>,
}

impl CredentialLocator {
    pub fn new(routes: Vec<ChannelRoute>) -> Self {
        Self {
            routes: routes.into(),
        }
    }

    pub fn routes(&self) -> &[ChannelRoute] {
        &self.routes
    }

    /// Locate the credential on `request`.
    ///
    /// 1. `Authorization: Bearer <token>` always wins
    /// 2. Otherwise, for a connection handshake on a query-enabled channel
    ///    route, the `access_token` query parameter
    ///
    /// `None` means anonymous; whether that is acceptable is decided later,
    /// per target.
    pub fn locate(&self, request: &InboundRequest<'_>) -> Option<Credential> {
        if let Some(token) = request.authorization().and_then(parse_bearer) {
            tracing::debug!(target: "gw.auth.locator", source = "header", "Credential located");
            return Some(Credential::new(token, CredentialSource::Header));
        }

        if request.kind() != TransportKind::ConnectionEstablishment {
            return None;
        }

        let path = request.path();
        let query_allowed = self
            .routes
            .iter()
            .any(|route| route.requires_credential_from_query && route.matches(path));
        if !query_allowed {
            return None;
        }

        let token = request
            .query_param(ACCESS_TOKEN_QUERY_PARAM)
            .filter(|t| !t.trim().is_empty())?;

        tracing::debug!(target: "gw.auth.locator", source = "query", "Credential located");
        Some(Credential::new(token.trim(), CredentialSource::Query))
    }
}

/// Extract the token from a `Bearer <token>` header value.
///
/// The scheme is matched case-insensitively. Anything else (other schemes,
/// missing or multi-part tokens) yields `None`.
fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        tracing::debug!(target: "gw.auth.locator", "Ignoring non-Bearer Authorization header");
        return None;
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        tracing::debug!(target: "gw.auth.locator", "Ignoring malformed Bearer header");
        return None;
    }

    Some(token)
}
