//! Test helpers: a local upstream origin and a `TestServer` routed to it.
//!
//! Run from workspace root: `cargo test -p imagine-api --test proxy_test`.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_test::TestServer;
use imagine_api::{setup::routes, AppState};
use imagine_core::{LogFormat, ProxyConfig, DEFAULT_MAX_OUTPUT_PIXELS};
use std::io::Cursor;
use std::sync::Arc;

pub const FIXTURE_WIDTH: u32 = 40;
pub const FIXTURE_HEIGHT: u32 = 20;

/// 40x20 gradient PNG served upstream as `joe.png`.
pub fn create_test_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(FIXTURE_WIDTH, FIXTURE_HEIGHT, |x, y| {
        image::Rgb([(x * 6) as u8, (y * 12) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

async fn serve_fixture(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "joe.png" => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/png")],
            create_test_png(),
        )
            .into_response(),
        "garbage.png" => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/png")],
            b"definitely not an image".to_vec(),
        )
            .into_response(),
        "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve the fixtures on an ephemeral port and return the base URL.
pub async fn spawn_upstream() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/{name}", get(serve_fixture));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn test_config(upstream_url: String) -> ProxyConfig {
    ProxyConfig {
        server_port: 3000,
        upstream_url,
        upstream_timeout_secs: 5,
        max_image_size_bytes: 25 * 1024 * 1024,
        max_output_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
        environment: "test".to_string(),
        log_format: LogFormat::Pretty,
    }
}

pub async fn setup_test_server() -> TestServer {
    setup_test_server_with(|_| {}).await
}

/// Like `setup_test_server`, with a hook to adjust the config first.
pub async fn setup_test_server_with(configure: impl FnOnce(&mut ProxyConfig)) -> TestServer {
    let mut config = test_config(spawn_upstream().await);
    configure(&mut config);
    let state = Arc::new(AppState::new(config).unwrap());
    TestServer::new(routes::setup_routes(state)).unwrap()
}
