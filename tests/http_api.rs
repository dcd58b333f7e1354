//! HTTP-level tests: cookies, guard enforcement and role checks.

use axum_test::{TestServer, TestServerConfig};
use serde_json::{json, Value};

use doorman::api::routes::{build_router, ApiState};
use doorman::auth::hash_password;
use doorman::auth::models::{Identifier, NewAccount, Preferences, Role};
use doorman::config::AppConfig;
use doorman::domain::AccountId;
use doorman::storage::repositories::{AccountRepository, SqlxAccountRepository};
use doorman::storage::test_support::create_test_pool;
use doorman::storage::DbPool;

async fn test_server() -> (TestServer, DbPool) {
    let pool = create_test_pool().await;

    let mut config = AppConfig::default();
    config.auth.secure_cookies = false;

    let state = ApiState::new(pool.clone(), &config);
    let router = build_router(state);

    let server_config = TestServerConfig { save_cookies: true, ..Default::default() };
    let server = TestServer::new_with_config(router, server_config).unwrap();
    (server, pool)
}

fn registration_body(username: &str, email: &str) -> Value {
    json!({
        "identifier": {
            "username": username,
            "email": email,
        },
        "password": "Abc12345678",
    })
}

async fn seed_admin(pool: &DbPool) {
    let repo = SqlxAccountRepository::new(pool.clone());
    repo.create_account(NewAccount {
        id: AccountId::new(),
        identifier: Identifier {
            email: Some("admin@x.com".to_string()),
            phone_number: None,
            username: "theadmin".to_string(),
        },
        password_hash: hash_password("AdminPass123").unwrap(),
        role: Role::Administrator,
        preferences: Preferences::default(),
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let (server, _) = test_server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn sign_up_sets_both_session_cookies_and_hides_password() {
    let (server, _) = test_server().await;

    let response = server
        .post("/api/v1/auth/sign-up")
        .json(&registration_body("johndoe", "john@x.com"))
        .await;

    assert_eq!(response.status_code(), 201);
    assert!(response.maybe_cookie("access-token").is_some());
    assert!(response.maybe_cookie("refresh-token").is_some());

    let body: Value = response.json();
    assert_eq!(body["identifier"]["username"], "johndoe");
    assert_eq!(body["role"], "user");
    assert_eq!(body["connections"], json!([]));
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn duplicate_sign_up_returns_conflict() {
    let (server, _) = test_server().await;

    server
        .post("/api/v1/auth/sign-up")
        .json(&registration_body("johndoe", "john@x.com"))
        .await
        .assert_status_success();

    let response = server
        .post("/api/v1/auth/sign-up")
        .json(&registration_body("johndoe", "other@x.com"))
        .await;
    assert_eq!(response.status_code(), 409);
}

#[tokio::test]
async fn sign_in_with_wrong_password_is_unauthorized() {
    let (server, _) = test_server().await;

    server
        .post("/api/v1/auth/sign-up")
        .json(&registration_body("johndoe", "john@x.com"))
        .await
        .assert_status_success();

    let response = server
        .post("/api/v1/auth/sign-in")
        .json(&json!({"identifier": "johndoe", "password": "WrongPassword1"}))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn cookie_session_grants_access_to_me() {
    let (server, _) = test_server().await;

    server
        .post("/api/v1/auth/sign-up")
        .json(&registration_body("johndoe", "john@x.com"))
        .await
        .assert_status_success();

    // Saved cookies carry the access token
    let response = server.get("/api/v1/users/me").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["identifier"]["username"], "johndoe");
}

#[tokio::test]
async fn me_without_credentials_is_unauthorized() {
    let (server, _) = test_server().await;
    let response = server.get("/api/v1/users/me").await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn users_listing_requires_administrator_role() {
    let (mut server, pool) = test_server().await;
    seed_admin(&pool).await;

    // Anonymous: 401
    assert_eq!(server.get("/api/v1/users").await.status_code(), 401);

    // Plain user: 403
    server
        .post("/api/v1/auth/sign-up")
        .json(&registration_body("johndoe", "john@x.com"))
        .await
        .assert_status_success();
    assert_eq!(server.get("/api/v1/users").await.status_code(), 403);

    // Administrator: 200
    server.clear_cookies();
    server
        .post("/api/v1/auth/sign-in")
        .json(&json!({"identifier": "theadmin", "password": "AdminPass123"}))
        .await
        .assert_status_success();
    let response = server.get("/api/v1/users").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body.as_array().unwrap().len() >= 2);
}

#[tokio::test]
async fn refresh_token_endpoint_rotates_cookies() {
    let (server, _) = test_server().await;

    let signed_up = server
        .post("/api/v1/auth/sign-up")
        .json(&registration_body("johndoe", "john@x.com"))
        .await;
    signed_up.assert_status_success();
    let original_access = signed_up.cookie("access-token").value().to_string();

    let response = server.post("/api/v1/auth/refresh-token").await;
    response.assert_status_ok();

    let rotated_access = response.cookie("access-token").value().to_string();
    assert!(response.maybe_cookie("refresh-token").is_some());
    assert_ne!(original_access, rotated_access);
}

#[tokio::test]
async fn refresh_without_cookie_is_unauthorized() {
    let (server, _) = test_server().await;
    let response = server.post("/api/v1/auth/refresh-token").await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn sign_out_clears_cookies_but_bearer_token_stays_verifiable() {
    let (server, _) = test_server().await;

    let signed_up = server
        .post("/api/v1/auth/sign-up")
        .json(&registration_body("johndoe", "john@x.com"))
        .await;
    signed_up.assert_status_success();
    let access_token = signed_up.cookie("access-token").value().to_string();

    let response = server.post("/api/v1/auth/sign-out").await;
    response.assert_status_ok();

    // The clearing cookies wiped the jar, so the cookie path is closed
    assert_eq!(server.get("/api/v1/users/me").await.status_code(), 401);

    // The signed token itself is still unexpired and verification is
    // stateless, so presenting it as a bearer credential succeeds. This
    // pins the chosen sign-out semantics: store-side revocation only.
    let response =
        server.get("/api/v1/users/me").authorization_bearer(&access_token).await;
    response.assert_status_ok();
}

#[tokio::test]
async fn identify_route_is_open_and_partial() {
    let (mut server, _) = test_server().await;

    server
        .post("/api/v1/auth/sign-up")
        .json(&registration_body("johndoe", "john@x.com"))
        .await
        .assert_status_success();
    server.clear_cookies();

    let response = server.get("/api/v1/users/identify/john@x.com").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["username"], "johndoe");
    assert_eq!(body["email"], "john@x.com");
    assert!(body.get("phoneNumber").is_none());

    // Identify by username must not leak the email
    let response = server.get("/api/v1/users/identify/johndoe").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body.get("email").is_none());

    assert_eq!(server.get("/api/v1/users/identify/nobody").await.status_code(), 404);
}

#[tokio::test]
async fn get_user_by_id_is_open() {
    let (mut server, _) = test_server().await;

    let signed_up = server
        .post("/api/v1/auth/sign-up")
        .json(&registration_body("johndoe", "john@x.com"))
        .await;
    signed_up.assert_status_success();
    let body: Value = signed_up.json();
    let id = body["id"].as_str().unwrap().to_string();
    server.clear_cookies();

    let response = server.get(&format!("/api/v1/users/{}", id)).await;
    response.assert_status_ok();

    let missing = server.get(&format!("/api/v1/users/{}", AccountId::new())).await;
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn newsletter_endpoints_without_provider_are_unavailable() {
    let (server, _) = test_server().await;

    let response = server
        .post("/api/v1/newsletter/subscribe")
        .json(&json!({"email": "john@x.com"}))
        .await;
    assert_eq!(response.status_code(), 503);
}

#[tokio::test]
async fn validation_errors_are_bad_requests() {
    let (server, _) = test_server().await;

    // Short password
    let response = server
        .post("/api/v1/auth/sign-up")
        .json(&json!({
            "identifier": {"username": "johndoe"},
            "password": "abc",
        }))
        .await;
    assert_eq!(response.status_code(), 400);

    // Malformed email
    let response = server
        .post("/api/v1/auth/sign-up")
        .json(&json!({
            "identifier": {"username": "johndoe", "email": "not-an-email"},
            "password": "Abc12345678",
        }))
        .await;
    assert_eq!(response.status_code(), 400);
}
