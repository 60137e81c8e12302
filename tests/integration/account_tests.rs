//! Integration tests for registration, login, refresh, and revocation.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use imgvault::auth::TokenService;
use imgvault::store::MetadataStore;

use super::test_utils::{
    authed_get, build_app, login, register, register_and_login, send_json, TEST_SECRET,
};

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_returns_user_without_hash() {
    let app = build_app();

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "s3cret!",
            })
            .to_string(),
        ))
        .unwrap();

    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = build_app();
    register(&app.router, "alice", "a@example.com", "pw-one").await;

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "username": "alice2",
                "email": "a@example.com",
                "password": "pw-two",
            })
            .to_string(),
        ))
        .unwrap();

    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");
    assert_eq!(body["message"], "email already registered");
}

#[tokio::test]
async fn test_register_empty_fields_rejected() {
    let app = build_app();

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({"username": "", "email": "a@b.c", "password": "x"}).to_string(),
        ))
        .unwrap();

    let (status, _) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_issues_usable_token() {
    let app = build_app();
    let token = register_and_login(&app.router).await;

    let response = app
        .router
        .clone()
        .oneshot(authed_get("/login", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = build_app();
    register(&app.router, "alice", "a@example.com", "right-pw").await;

    let attempt = |username: &str, password: &str| {
        Request::builder()
            .method("POST")
            .uri("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "username={}&password={}",
                username, password
            )))
            .unwrap()
    };

    // Wrong password and unknown username return the same generic body
    let (status_a, body_a) = send_json(&app.router, attempt("alice", "wrong-pw")).await;
    let (status_b, body_b) = send_json(&app.router, attempt("nobody", "whatever")).await;

    assert_eq!(status_a, StatusCode::UNAUTHORIZED);
    assert_eq!(status_b, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a["message"], "Authentication failed.");
    assert_eq!(body_a, body_b);
}

// =============================================================================
// Protected Surface
// =============================================================================

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = build_app();

    let request = Request::builder()
        .uri("/images/0")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app.router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authentication failed.");
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = build_app();
    register(&app.router, "alice", "a@example.com", "pw").await;
    let user = app
        .metadata
        .user_by_username("alice")
        .await
        .unwrap()
        .unwrap();

    // Correctly signed, already expired
    let tokens = TokenService::new(TEST_SECRET);
    let expired = tokens.issue_with_expiry(user.id, user.token_version, 1_000_000);

    let response = app
        .router
        .clone()
        .oneshot(authed_get("/login", &expired))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let app = build_app();

    for token in ["", "garbage", "deadbeef.cafebabe"] {
        let response = app
            .router
            .clone()
            .oneshot(authed_get("/login", token))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "token {:?}",
            token
        );
    }
}

// =============================================================================
// Refresh and Revocation
// =============================================================================

#[tokio::test]
async fn test_refresh_returns_fresh_usable_token() {
    let app = build_app();
    let token = register_and_login(&app.router).await;

    let (status, body) = send_json(&app.router, authed_get("/login", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let refreshed = body["access_token"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(authed_get("/login", &refreshed))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_all_revokes_outstanding_tokens() {
    let app = build_app();
    let first = register_and_login(&app.router).await;
    let second = login(&app.router, "alice", "s3cret!").await;

    // Revoke using the first token
    let request = Request::builder()
        .method("POST")
        .uri("/logout-all")
        .header(header::AUTHORIZATION, format!("Bearer {}", first))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], true);

    // Both previously issued tokens are now stale
    for token in [&first, &second] {
        let response = app
            .router
            .clone()
            .oneshot(authed_get("/login", token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // A fresh credential login works and carries the new version
    let fresh = login(&app.router, "alice", "s3cret!").await;
    let response = app
        .router
        .clone()
        .oneshot(authed_get("/login", &fresh))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
