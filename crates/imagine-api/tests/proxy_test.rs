//! Proxy integration tests.
//!
//! Run with: `cargo test -p imagine-api --test proxy_test`

mod helpers;

use axum::http::StatusCode;
use helpers::{create_test_png, setup_test_server, setup_test_server_with};
use serde_json::Value;

fn decode(bytes: &[u8]) -> image::DynamicImage {
    image::load_from_memory(bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = setup_test_server().await;

    let response = server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_passthrough_without_operations() {
    let server = setup_test_server().await;

    let response = server.get("/joe.png").await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(response.as_bytes().as_ref(), create_test_png().as_slice());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = setup_test_server().await;

    let response = server
        .get("/health")
        .add_header("X-Request-ID", "req-123")
        .await;

    assert_eq!(response.header("x-request-id"), "req-123");
}

#[tokio::test]
async fn test_resize() {
    let server = setup_test_server().await;

    let response = server.get("/joe.png/resize/20x20").await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(
        response.header("cache-control"),
        "public, max-age=31536000, immutable"
    );
    let img = decode(response.as_bytes());
    assert_eq!((img.width(), img.height()), (20, 10));
}

#[tokio::test]
async fn test_crop_and_compress() {
    let server = setup_test_server().await;

    let response = server.get("/joe.png/crop/10x8+2+2/compress/jpeg").await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/jpeg");
    assert_eq!(
        image::guess_format(response.as_bytes()).unwrap(),
        image::ImageFormat::Jpeg
    );
    let img = decode(response.as_bytes());
    assert_eq!((img.width(), img.height()), (10, 8));
}

#[tokio::test]
async fn test_unrecognised_operations_return_original_bytes() {
    let server = setup_test_server().await;

    let response = server.get("/joe.png/sparkle/lots").await;

    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), create_test_png().as_slice());
}

#[tokio::test]
async fn test_invalid_argument_is_bad_request() {
    let server = setup_test_server().await;

    let response = server.get("/joe.png/blur/abc").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "INVALID_OPERATION_ARGUMENT");
}

#[tokio::test]
async fn test_error_details_hidden_in_production() {
    let server = setup_test_server().await;
    let body = server.get("/joe.png/blur/abc").await.json::<Value>();
    assert!(body["details"].as_str().unwrap().contains("abc"));

    let server = setup_test_server_with(|config| config.environment = "production".into()).await;
    let response = server.get("/joe.png/blur/abc").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "INVALID_OPERATION_ARGUMENT");
    assert!(body.get("details").is_none());
    assert!(body.get("error_type").is_none());
}

#[tokio::test]
async fn test_output_pixel_limit() {
    let server = setup_test_server().await;
    let response = server.get("/joe.png/resize/100000x100000!").await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.json::<Value>()["code"], "PAYLOAD_TOO_LARGE");

    let server = setup_test_server_with(|config| config.max_output_pixels = 500).await;
    server.get("/joe.png/resize/20x20").await.assert_status_ok();
    server
        .get("/joe.png/border/10x10")
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_backend_failure_is_bad_gateway() {
    let server = setup_test_server().await;

    let response = server.get("/garbage.png/resize/10x10").await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "BACKEND_PROCESSING_ERROR");
    assert_eq!(body["error"], "error performing image operations");
}

#[tokio::test]
async fn test_upstream_not_found() {
    let server = setup_test_server().await;

    let response = server.get("/missing.png/resize/10x10").await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let server = setup_test_server().await;

    let response = server.get("/broken/blur/2").await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "UPSTREAM_ERROR");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_buffer_limit_applies_only_when_transforming() {
    let server = setup_test_server_with(|config| config.max_image_size_bytes = 16).await;

    let response = server.get("/joe.png/blur/1").await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    let response = server.get("/joe.png").await;
    response.assert_status_ok();
}
