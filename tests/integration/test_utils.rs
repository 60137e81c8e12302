//! Shared test utilities for integration tests.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use imgvault::auth::TokenService;
use imgvault::limit::RateLimiter;
use imgvault::server::{create_router, AppState, RouterConfig};
use imgvault::store::{MemoryMetadataStore, MemoryObjectStore, MetadataStore, ObjectStore};
use imgvault::upload::UploadService;

pub const TEST_SECRET: &str = "integration-test-secret";

/// A fully wired application over in-memory stores.
pub struct TestApp {
    pub router: Router,
    pub metadata: Arc<MemoryMetadataStore>,
    pub objects: Arc<MemoryObjectStore>,
}

/// Build the app with an effectively unlimited rate budget.
pub fn build_app() -> TestApp {
    build_app_with_limit(10_000)
}

/// Build the app admitting `max_calls` requests per 60s window.
pub fn build_app_with_limit(max_calls: u32) -> TestApp {
    let metadata = Arc::new(MemoryMetadataStore::new());
    let objects = Arc::new(MemoryObjectStore::new());

    let metadata_dyn: Arc<dyn MetadataStore> = metadata.clone();
    let objects_dyn: Arc<dyn ObjectStore> = objects.clone();

    let uploads = Arc::new(UploadService::new(
        objects_dyn.clone(),
        metadata_dyn.clone(),
        "test-bucket",
        "us-east-1",
    ));

    let state = AppState::new(
        TokenService::new(TEST_SECRET),
        metadata_dyn,
        objects_dyn,
        uploads,
        Duration::from_secs(1200),
    );

    let limiter = Arc::new(RateLimiter::new(max_calls, Duration::from_secs(60)));
    let router = create_router(state, limiter, RouterConfig::default().with_tracing(false));

    TestApp {
        router,
        metadata,
        objects,
    }
}

/// Fire a request and return (status, parsed JSON body).
pub async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Register a user and assert success.
pub async fn register(router: &Router, username: &str, email: &str, password: &str) {
    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            })
            .to_string(),
        ))
        .unwrap();

    let (status, body) = send_json(router, request).await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);
}

/// Log in and return the bearer token.
pub async fn login(router: &Router, username: &str, password: &str) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "username={}&password={}",
            username, password
        )))
        .unwrap();

    let (status, body) = send_json(router, request).await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

/// Register and log in a default test user.
pub async fn register_and_login(router: &Router) -> String {
    register(router, "alice", "alice@example.com", "s3cret!").await;
    login(router, "alice", "s3cret!").await
}

pub const MULTIPART_BOUNDARY: &str = "test-boundary-7d93b";

/// Build a multipart body with a single `file` part.
pub fn multipart_file_body(filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

/// Upload a file for the authenticated user; returns the response JSON.
pub async fn upload_file(
    router: &Router,
    token: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> serde_json::Value {
    let request = Request::builder()
        .method("POST")
        .uri("/uploadfile")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(multipart_file_body(
            filename,
            content_type,
            bytes,
        )))
        .unwrap();

    let (status, body) = send_json(router, request).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {}", body);
    body
}

/// Encode a small PNG gradient for upload tests.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 13 % 256) as u8, (y * 17 % 256) as u8, 77])
    }));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// GET a protected path with a bearer token.
pub fn authed_get(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}
