//! HTTP routes for the gateway.
//!
//! Defines the Axum router, application state, and the per-route access
//! requirements.

use crate::auth::{
    AccessRequirement, ChannelRoute, CredentialLocator, SigningPolicy, TokenValidator,
};
use crate::channel::ChannelHub;
use crate::config::{Config, CorsOrigins};
use crate::errors::GatewayError;
use crate::handlers;
use crate::middleware::{authenticate, http_metrics_middleware, require_access, TransportGate};
use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub use crate::observability::metrics::init_metrics_recorder;

/// Role required for administrative routes.
pub const ADMIN_ROLE: &str = "Admin";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Credential locator and validator for the transport gate.
    pub gate: Arc<TransportGate>,

    /// Real-time channel hub.
    pub hub: Arc<ChannelHub>,
}

impl AppState {
    /// Wire the signing policy, gate and channel hub from configuration.
    pub fn from_config(config: Config) -> Self {
        let policy = Arc::new(SigningPolicy::from_config(&config));
        let locator = CredentialLocator::new(vec![ChannelRoute::with_query_credential(
            config.channel_path.clone(),
        )]);
        let gate = Arc::new(TransportGate::new(locator, TokenValidator::new(policy)));
        let hub = Arc::new(ChannelHub::new(
            config.channel_expiry_policy,
            config.jwt_clock_skew(),
        ));

        Self { config, gate, hub }
    }
}

/// Attach an access requirement to every route in `router`.
///
/// Uses `route_layer`, so paths the router does not match still fall through
/// to 404 instead of being answered with 401/403.
pub fn guarded<S>(router: Router<S>, requirement: AccessRequirement) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(
        Arc::new(requirement),
        require_access,
    ))
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe - open
/// - `/metrics` - Prometheus metrics endpoint - open
/// - `/api/v1/me` - Current identity - any authenticated caller
/// - `<channel path>` - WebSocket channel - any authenticated caller
/// - `/api/v1/admin/channel` - Channel statistics - `Admin` role
/// - Transport gate on every request
/// - TraceLayer for request logging
/// - 30 second request timeout
/// - CORS
/// - HTTP metrics middleware
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::health_check));

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let authenticated_routes = guarded(
        Router::new()
            .route("/api/v1/me", get(handlers::get_me))
            .route(&state.config.channel_path, get(handlers::channel_connect)),
        AccessRequirement::AnyAuthenticated,
    );

    let admin_routes = guarded(
        Router::new().route("/api/v1/admin/channel", get(handlers::channel_stats)),
        AccessRequirement::role(ADMIN_ROLE),
    );

    // Layer order (bottom-to-top execution):
    // 1. authenticate - Transport gate (innermost, before any handler)
    // 2. TraceLayer - Log request details
    // 3. TimeoutLayer - Timeout the request
    // 4. CorsLayer - Preflights are answered before the gate runs
    // 5. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(authenticated_routes)
        .merge(admin_routes)
        .with_state(Arc::clone(&state))
        .merge(metrics_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.gate),
            authenticate,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .layer(middleware::from_fn(http_metrics_middleware))
}

async fn not_found() -> GatewayError {
    GatewayError::NotFound("Route not found".to_string())
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::WWW_AUTHENTICATE]);

    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) if list.iter().any(|origin| origin == "*") => {
            layer.allow_origin(Any)
        }
        CorsOrigins::List(list) => {
            let allowed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(allowed))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use common::jwt::{Audience, TokenClaims};
    use http_body_util::BodyExt;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    const KEY: &str = "routes-test-signing-key-0123456789";

    fn config() -> Config {
        Config::from_vars(&HashMap::from([
            ("TOKEN_ISSUER".to_string(), "shop-api".to_string()),
            ("TOKEN_SIGNING_KEY".to_string(), KEY.to_string()),
        ]))
        .unwrap()
    }

    fn app() -> Router {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        build_routes(Arc::new(AppState::from_config(config())), handle)
    }

    fn token(roles: &[&str]) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims::new(
            "customer-9".to_string(),
            "shop-api".to_string(),
            Audience::from("shop-api"),
            now,
            now + 600,
        )
        .with_roles(roles.iter().copied());
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(KEY.as_bytes()),
        )
        .unwrap()
    }

    async fn call(uri: &str, bearer: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[test]
    fn test_app_state_is_clone() {
        // This test verifies that AppState implements Clone,
        // which is required for Axum's State extractor.
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_app_state_from_config() {
        let state = AppState::from_config(config());

        assert_eq!(state.gate.validator().policy().issuer(), "shop-api");
        let prefixes: Vec<&str> = state
            .gate
            .locator()
            .routes()
            .iter()
            .map(|route| route.path_prefix.as_str())
            .collect();
        assert_eq!(prefixes, vec!["/chatHub"]);
        assert_eq!(state.hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let (status, body) = call("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_me_requires_authentication() {
        let (status, body) = call("/api/v1/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_me_returns_identity() {
        let (status, body) = call("/api/v1/me", Some(&token(&["Customer"]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sub"], "customer-9");
        assert_eq!(body["roles"], serde_json::json!(["Customer"]));
    }

    #[tokio::test]
    async fn test_admin_route_forbidden_without_role() {
        let (status, body) = call("/api/v1/admin/channel", Some(&token(&["Customer"]))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_admin_route_allows_admin() {
        let (status, body) = call("/api/v1/admin/channel", Some(&token(&["Admin"]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connections"], 0);
        assert_eq!(body["expiry_policy"], "keep-open");
    }

    #[tokio::test]
    async fn test_invalid_token_rejected_even_on_open_route() {
        let (status, body) = call("/health", Some("not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_channel_path_requires_authentication() {
        let (status, _) = call("/chatHub", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (status, body) = call("/api/v1/nothing-here", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_cors_preflight_is_answered() {
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/me")
            .header("origin", "https://shop.example")
            .header("access-control-request-method", "GET")
            .header("access-control-request-headers", "authorization")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(req).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );
    }

    #[test]
    fn test_cors_layer_with_explicit_origins() {
        // Invalid origins are skipped instead of failing startup.
        let _layer = cors_layer(&CorsOrigins::List(vec![
            "https://shop.example".to_string(),
            "bad\norigin".to_string(),
        ]));
    }
}
