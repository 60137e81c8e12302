//! Integration tests for upload, indexed retrieval, and transforms.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{
    authed_get, build_app, login, png_bytes, register, register_and_login, send_json, upload_file,
};

fn transform_request(token: &str, index: i64, spec: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/images/{}/transform", index))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(spec.to_string()))
        .unwrap()
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_upload_returns_url_and_sequential_filename() {
    let app = build_app();
    let token = register_and_login(&app.router).await;

    let first = upload_file(&app.router, &token, "cat.png", "image/png", &png_bytes(4, 4)).await;
    assert_eq!(first["filename"], "1.png");
    let url = first["url"].as_str().unwrap();
    assert!(url.starts_with("https://test-bucket.s3.us-east-1.amazonaws.com/images/"));
    assert!(url.ends_with("/1.png"));

    let second =
        upload_file(&app.router, &token, "dog.jpg", "image/jpeg", &png_bytes(4, 4)).await;
    assert_eq!(second["filename"], "2.jpg");
}

#[tokio::test]
async fn test_upload_without_file_part_rejected() {
    let app = build_app();
    let token = register_and_login(&app.router).await;

    let request = Request::builder()
        .method("POST")
        .uri("/uploadfile")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            "multipart/form-data; boundary=empty-b",
        )
        .body(Body::from("--empty-b--\r\n"))
        .unwrap();

    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

// =============================================================================
// Retrieval by Index
// =============================================================================

#[tokio::test]
async fn test_get_image_returns_stored_bytes_verbatim() {
    let app = build_app();
    let token = register_and_login(&app.router).await;

    let original = png_bytes(10, 6);
    upload_file(&app.router, &token, "cat.png", "image/png", &original).await;

    let response = app
        .router
        .clone()
        .oneshot(authed_get("/images/0", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), original.as_slice());
}

#[tokio::test]
async fn test_index_follows_upload_order() {
    let app = build_app();
    let token = register_and_login(&app.router).await;

    let first = png_bytes(3, 3);
    let second = png_bytes(5, 5);
    upload_file(&app.router, &token, "a.png", "image/png", &first).await;
    upload_file(&app.router, &token, "b.png", "image/png", &second).await;

    let response = app
        .router
        .clone()
        .oneshot(authed_get("/images/1", &token))
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), second.as_slice());
}

#[tokio::test]
async fn test_missing_indexes_return_404() {
    let app = build_app();
    let token = register_and_login(&app.router).await;
    upload_file(&app.router, &token, "a.png", "image/png", &png_bytes(3, 3)).await;

    for path in ["/images/1", "/images/-1", "/images/99"] {
        let (status, body) = send_json(&app.router, authed_get(path, &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "path {}", path);
        assert_eq!(body["message"], "Image not found");
    }
}

#[tokio::test]
async fn test_indexes_are_scoped_to_the_caller() {
    let app = build_app();

    register(&app.router, "alice", "alice@example.com", "pw-a").await;
    register(&app.router, "bob", "bob@example.com", "pw-b").await;
    let alice = login(&app.router, "alice", "pw-a").await;
    let bob = login(&app.router, "bob", "pw-b").await;

    upload_file(&app.router, &alice, "a.png", "image/png", &png_bytes(3, 3)).await;

    // Alice sees her image at index 0; Bob has nothing there
    let response = app
        .router
        .clone()
        .oneshot(authed_get("/images/0", &alice))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(authed_get("/images/0", &bob))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Transforms
// =============================================================================

#[tokio::test]
async fn test_transform_rotate_90_swaps_dimensions() {
    let app = build_app();
    let token = register_and_login(&app.router).await;
    upload_file(&app.router, &token, "a.png", "image/png", &png_bytes(20, 10)).await;

    let response = app
        .router
        .clone()
        .oneshot(transform_request(&token, 0, serde_json::json!({"rotate": 90})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (10, 20));
}

#[tokio::test]
async fn test_transform_format_change_sets_content_type() {
    let app = build_app();
    let token = register_and_login(&app.router).await;
    upload_file(&app.router, &token, "a.png", "image/png", &png_bytes(8, 8)).await;

    let response = app
        .router
        .clone()
        .oneshot(transform_request(
            &token,
            0,
            serde_json::json!({"format": "jpeg"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[0..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_transform_leaves_stored_object_untouched() {
    let app = build_app();
    let token = register_and_login(&app.router).await;

    let original = png_bytes(8, 8);
    upload_file(&app.router, &token, "a.png", "image/png", &original).await;

    let response = app
        .router
        .clone()
        .oneshot(transform_request(
            &token,
            0,
            serde_json::json!({"filters": {"sepia": true}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A plain fetch still returns the original bytes
    let response = app
        .router
        .clone()
        .oneshot(authed_get("/images/0", &token))
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), original.as_slice());
}

#[tokio::test]
async fn test_transform_invalid_spec_rejected() {
    let app = build_app();
    let token = register_and_login(&app.router).await;
    upload_file(&app.router, &token, "a.png", "image/png", &png_bytes(8, 8)).await;

    let (status, body) = send_json(
        &app.router,
        transform_request(
            &token,
            0,
            serde_json::json!({"resize": {"width": 0, "height": 10}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_transform_missing_image_is_404() {
    let app = build_app();
    let token = register_and_login(&app.router).await;

    let (status, _) = send_json(
        &app.router,
        transform_request(&token, 0, serde_json::json!({"rotate": 90})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
