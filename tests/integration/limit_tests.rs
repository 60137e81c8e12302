//! Integration tests for the request rate limiter.
//!
//! Oneshot requests carry no peer address, so every request without an
//! `X-Forwarded-For` header shares the fallback key. Tests use the header
//! to simulate distinct clients.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use super::test_utils::{build_app_with_limit, send_json};

fn health_from(client: &str) -> Request<Body> {
    Request::builder()
        .uri("/health")
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_requests_beyond_cap_are_rejected() {
    let app = build_app_with_limit(3);

    for _ in 0..3 {
        let response = app
            .router
            .clone()
            .oneshot(health_from("203.0.113.9"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let (status, body) = send_json(&app.router, health_from("203.0.113.9")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
}

#[tokio::test]
async fn test_limit_covers_public_and_protected_routes() {
    let app = build_app_with_limit(2);

    // Burn the budget on the public health route
    for _ in 0..2 {
        app.router
            .clone()
            .oneshot(health_from("203.0.113.10"))
            .await
            .unwrap();
    }

    // The auth surface is now unreachable for this client too
    let request = Request::builder()
        .method("POST")
        .uri("/token")
        .header("x-forwarded-for", "203.0.113.10")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("username=a&password=b"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_clients_are_limited_independently() {
    let app = build_app_with_limit(1);

    let response = app
        .router
        .clone()
        .oneshot(health_from("203.0.113.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(health_from("203.0.113.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different client still has its budget
    let response = app
        .router
        .clone()
        .oneshot(health_from("203.0.113.2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rejections_consume_no_quota() {
    let app = build_app_with_limit(2);

    for _ in 0..2 {
        app.router
            .clone()
            .oneshot(health_from("203.0.113.3"))
            .await
            .unwrap();
    }

    // Hammering past the cap must not extend the lockout bookkeeping;
    // every rejection leaves the recorded window at the cap
    for _ in 0..10 {
        let response = app
            .router
            .clone()
            .oneshot(health_from("203.0.113.3"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
