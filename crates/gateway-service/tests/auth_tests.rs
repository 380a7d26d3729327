//! Authentication integration tests.
//!
//! Tests the transport gate and access requirements end to end against a real
//! gateway, with tokens minted for the server's signing policy.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use gateway_test_utils::{TestGatewayServer, TEST_ISSUER, TEST_SIGNING_KEY};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Response, StatusCode};

const GENERIC_MESSAGE: &str = "The access token is invalid or expired";

async fn get_me(server: &TestGatewayServer, token: Option<&str>) -> Result<Response> {
    let mut request = Client::new().get(format!("{}/api/v1/me", server.url()));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    Ok(request.send().await?)
}

async fn assert_invalid_token(response: Response) -> Result<()> {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let www_auth = response
        .headers()
        .get("www-authenticate")
        .expect("401 must carry WWW-Authenticate")
        .to_str()?
        .to_string();
    assert!(www_auth.starts_with("Bearer "));
    assert!(www_auth.contains("error=\"invalid_token\""));

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    assert_eq!(body["error"]["message"], GENERIC_MESSAGE);
    Ok(())
}

// =============================================================================
// Protected endpoint: /api/v1/me
// =============================================================================

/// Test that the endpoint rejects requests without a credential.
#[tokio::test]
async fn test_me_endpoint_requires_auth() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;

    let response = get_me(&server, None).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let www_auth = response
        .headers()
        .get("www-authenticate")
        .unwrap()
        .to_str()?
        .to_string();
    assert_eq!(www_auth, "Bearer realm=\"gateway-api\"");

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    Ok(())
}

/// Test that a non-Bearer Authorization header counts as no credential.
#[tokio::test]
async fn test_me_endpoint_rejects_invalid_auth_format() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;

    let response = Client::new()
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    Ok(())
}

/// Test that a valid token yields the bound identity.
#[tokio::test]
async fn test_me_endpoint_with_valid_token() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server
        .minter()
        .token()
        .for_user("customer-1138")
        .with_role("Customer")
        .with_role("Admin")
        .sign();

    let response = get_me(&server, Some(&token)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["sub"], "customer-1138");
    assert_eq!(body["roles"], serde_json::json!(["Admin", "Customer"]));

    Ok(())
}

/// Test that the Bearer scheme is matched case-insensitively.
#[tokio::test]
async fn test_me_endpoint_accepts_lowercase_scheme() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server.minter().token().sign();

    let response = Client::new()
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", format!("bearer {token}"))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

/// Test that HS384/HS512 tokens are accepted alongside HS256.
#[tokio::test]
async fn test_me_endpoint_accepts_hmac_family() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;

    for alg in [Algorithm::HS384, Algorithm::HS512] {
        let token = server.minter().token().with_algorithm(alg).sign();
        let response = get_me(&server, Some(&token)).await?;
        assert_eq!(response.status(), StatusCode::OK, "{alg:?}");
    }

    Ok(())
}

/// Test that a single-string `role` claim is understood.
#[tokio::test]
async fn test_me_endpoint_accepts_singular_role_claim() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let now = Utc::now().timestamp();
    let claims = serde_json::json!({
        "sub": "legacy-user",
        "iss": TEST_ISSUER,
        "aud": TEST_ISSUER,
        "iat": now,
        "exp": now + 600,
        "role": "Admin",
    });
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SIGNING_KEY.as_bytes()),
    )?;

    let response = Client::new()
        .get(format!("{}/api/v1/admin/channel", server.url()))
        .bearer_auth(token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

// =============================================================================
// Rejections
// =============================================================================

/// Test that an expired token is rejected.
#[tokio::test]
async fn test_me_endpoint_rejects_expired_token() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server
        .minter()
        .token()
        .issued_at(Utc::now().timestamp() - 7200)
        .expires_in(-1)
        .sign();

    assert_invalid_token(get_me(&server, Some(&token)).await?).await
}

/// Test that a token issued in the future is rejected.
#[tokio::test]
async fn test_me_endpoint_rejects_future_iat_token() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server
        .minter()
        .token()
        .issued_at(Utc::now().timestamp() + 3600)
        .expires_in(7200)
        .sign();

    assert_invalid_token(get_me(&server, Some(&token)).await?).await
}

/// Test that a not-yet-valid `nbf` is rejected.
#[tokio::test]
async fn test_me_endpoint_rejects_future_nbf_token() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server
        .minter()
        .token()
        .not_before(Utc::now().timestamp() + 600)
        .sign();

    assert_invalid_token(get_me(&server, Some(&token)).await?).await
}

/// Test that a token signed with another secret is rejected.
#[tokio::test]
async fn test_me_endpoint_rejects_wrong_secret() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server
        .minter()
        .token()
        .with_role("Admin")
        .with_secret("an-attacker-chosen-secret-0123456789")
        .sign();

    assert_invalid_token(get_me(&server, Some(&token)).await?).await
}

/// Test that a token from another issuer is rejected.
#[tokio::test]
async fn test_me_endpoint_rejects_wrong_issuer() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server.minter().token().with_issuer("someone-else").sign();

    assert_invalid_token(get_me(&server, Some(&token)).await?).await
}

/// Test that a token for another audience is rejected.
#[tokio::test]
async fn test_me_endpoint_rejects_wrong_audience() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server.minter().token().with_audience("another-api").sign();

    assert_invalid_token(get_me(&server, Some(&token)).await?).await
}

/// Test that garbage in the Bearer slot is rejected, not treated as anonymous.
#[tokio::test]
async fn test_me_endpoint_rejects_malformed_token() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;

    assert_invalid_token(get_me(&server, Some("not-a-jwt")).await?).await
}

/// Test that `alg: none` tokens are rejected.
#[tokio::test]
async fn test_token_with_alg_none_rejected() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let now = Utc::now().timestamp();
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({
            "sub": "intruder",
            "iss": TEST_ISSUER,
            "aud": TEST_ISSUER,
            "iat": now,
            "exp": now + 600,
            "roles": ["Admin"],
        })
        .to_string(),
    );
    let token = format!("{header}.{payload}.");

    assert_invalid_token(get_me(&server, Some(&token)).await?).await
}

/// Test that a tampered payload is rejected.
#[tokio::test]
async fn test_token_with_tampered_payload_rejected() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server.minter().token().for_user("customer").sign();
    let forged_claims = server
        .minter()
        .token()
        .for_user("customer")
        .with_role("Admin")
        .claims()
        .clone();

    let (header, rest) = token.split_once('.').unwrap();
    let (_, signature) = rest.split_once('.').unwrap();
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims)?);
    let forged = format!("{header}.{payload}.{signature}");

    assert_invalid_token(get_me(&server, Some(&forged)).await?).await
}

/// Test that every rejection returns an identical body.
#[tokio::test]
async fn test_rejections_do_not_reveal_reason() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let minter = server.minter();
    let tokens = [
        minter.token().expires_in(-60).issued_at(0).sign(),
        minter.token().with_secret("wrong-secret-0123456789abcdefghij").sign(),
        minter.token().with_issuer("elsewhere").sign(),
        "a.b.c".to_string(),
    ];

    let mut bodies = Vec::new();
    for token in &tokens {
        let response = get_me(&server, Some(token)).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        bodies.push(response.text().await?);
    }

    assert!(bodies.windows(2).all(|pair| pair.first() == pair.last()));
    Ok(())
}

/// Test that an invalid credential is rejected even on an open route.
#[tokio::test]
async fn test_invalid_token_rejected_on_open_route() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;

    let response = Client::new()
        .get(format!("{}/health", server.url()))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;

    assert_invalid_token(response).await
}

// =============================================================================
// Token size limits
// =============================================================================

/// Test that a large token under the 8KB limit is accepted.
#[tokio::test]
async fn test_token_just_under_8kb_limit_accepted() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;

    let mut padding = 0;
    let token = loop {
        let token = server
            .minter()
            .token()
            .for_user(&format!("user-{}", "x".repeat(padding)))
            .sign();
        if token.len() > 8100 {
            break token;
        }
        padding += 30;
    };
    assert!(token.len() <= 8192, "token is {} bytes", token.len());

    let response = get_me(&server, Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

/// Test that a token over the 8KB limit is rejected.
#[tokio::test]
async fn test_token_over_8kb_rejected() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server
        .minter()
        .token()
        .for_user(&"x".repeat(7000))
        .sign();
    assert!(token.len() > 8192);

    assert_invalid_token(get_me(&server, Some(&token)).await?).await
}

// =============================================================================
// Credential location
// =============================================================================

/// Test that a query-string token is ignored on API routes.
#[tokio::test]
async fn test_query_token_ignored_on_api_route() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server.minter().token().sign();

    let response = Client::new()
        .get(format!("{}/api/v1/me?access_token={}", server.url(), token))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    Ok(())
}

// =============================================================================
// Role requirements
// =============================================================================

/// Test that the admin route rejects anonymous callers with 401.
#[tokio::test]
async fn test_admin_route_anonymous_is_401() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;

    let response = Client::new()
        .get(format!("{}/api/v1/admin/channel", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

/// Test that the admin route rejects callers without the role with 403.
#[tokio::test]
async fn test_admin_route_without_role_is_403() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server.minter().token().with_role("Customer").sign();

    let response = Client::new()
        .get(format!("{}/api/v1/admin/channel", server.url()))
        .bearer_auth(token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    Ok(())
}

/// Test that role names are matched case-sensitively.
#[tokio::test]
async fn test_admin_route_role_is_case_sensitive() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server.minter().token().with_role("admin").sign();

    let response = Client::new()
        .get(format!("{}/api/v1/admin/channel", server.url()))
        .bearer_auth(token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

/// Test that the admin route allows the Admin role.
#[tokio::test]
async fn test_admin_route_with_role_is_200() -> Result<()> {
    let server = TestGatewayServer::spawn().await?;
    let token = server.minter().token().with_role("Admin").sign();

    let response = Client::new()
        .get(format!("{}/api/v1/admin/channel", server.url()))
        .bearer_auth(token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["connections"], 0);

    Ok(())
}
