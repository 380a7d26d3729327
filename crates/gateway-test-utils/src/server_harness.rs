//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer` for spawning real gateway instances in tests.

use crate::token_builders::TokenMinter;
use gateway_service::config::Config;
use gateway_service::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Issuer (and default audience) of the test server.
pub const TEST_ISSUER: &str = "gateway-test-issuer";

/// Signing key of the test server (UTF-8, above the minimum length).
pub const TEST_SIGNING_KEY: &str = "gateway-test-signing-key-0123456789abcdef";

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            // If a recorder is already installed globally, fall back to a
            // standalone recorder so the endpoint still renders.
            routes::init_metrics_recorder().unwrap_or_else(|_| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle()
            })
        })
        .clone()
}

/// Test harness for spawning the gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let server = TestGatewayServer::spawn().await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Spawn a test server with default configuration.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Accept tokens from [`TEST_ISSUER`] signed with [`TEST_SIGNING_KEY`]
    /// - Start the HTTP server in the background
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(HashMap::new()).await
    }

    /// Spawn a test server with extra environment variables layered over
    /// the defaults (e.g. `CHANNEL_EXPIRY_POLICY`).
    pub async fn spawn_with(overrides: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("TOKEN_ISSUER".to_string(), TEST_ISSUER.to_string()),
            ("TOKEN_SIGNING_KEY".to_string(), TEST_SIGNING_KEY.to_string()),
            ("GATEWAY_DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::from_config(config));
        let app = routes::build_routes(Arc::clone(&state), test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL for making HTTP requests.
    ///
    /// Returns a URL like `http://127.0.0.1:12345`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL for the configured channel path.
    ///
    /// Returns a URL like `ws://127.0.0.1:12345/chatHub`
    pub fn channel_url(&self) -> String {
        format!("ws://{}{}", self.addr, self.state.config.channel_path)
    }

    /// Get the server's socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// Shared application state (e.g. to read the channel hub).
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Token minter matching this server's signing policy.
    pub fn minter(&self) -> TokenMinter {
        TokenMinter::new(
            &self.state.config.token_issuer,
            &self.state.config.token_audience,
            TEST_SIGNING_KEY,
        )
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        // Explicitly abort the HTTP server task to ensure immediate cleanup
        // when the test completes.
        self._handle.abort();
    }
}
