//! Image proxy handler: fetch `{upstream}/{key}` and relay it through the
//! operation string in the rest of the path.

use crate::error::HttpAppError;
use crate::middleware::RequestId;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Extension, State},
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use imagine_core::AppError;
use imagine_processing::{RelayOutput, ResponseRelay};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const TRANSFORMED_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[tracing::instrument(
    skip_all,
    fields(request_id = %request_id.0, path = %uri.path())
)]
pub async fn transform_image(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    uri: Uri,
) -> Result<Response, HttpAppError> {
    relay_image(&state, &uri)
        .await
        .map_err(|err| err.for_config(&state.config))
}

async fn relay_image(state: &AppState, uri: &Uri) -> Result<Response, HttpAppError> {
    // Dropping this future (client went away) cancels the relay.
    let cancel = CancellationToken::new();
    let _abort_on_drop = cancel.clone().drop_guard();

    let mut relay = ResponseRelay::for_path(state.backend.clone(), uri.path())
        .map_err(AppError::from)?
        .with_max_buffer_bytes(state.config.max_image_size_bytes)
        .with_cancellation(cancel);

    let key = relay.path().key().to_string();

    let upstream_url = state.config.upstream_url_for(&key);
    let upstream = state
        .http_client
        .get(&upstream_url)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("request to {} failed: {}", upstream_url, e)))?;

    let status = upstream.status();
    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!("Image '{}' not found", key)).into());
    }
    if !status.is_success() {
        return Err(AppError::Upstream(format!("{} returned {}", upstream_url, status)).into());
    }

    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    tracing::debug!(
        key = %key,
        status = status.as_u16(),
        operations = %relay.path().operations(),
        "Upstream responded"
    );

    match relay.handle_response(upstream.bytes_stream()).await {
        Some(RelayOutput::Original(stream)) => {
            let mut response = Body::from_stream(stream).into_response();
            let content_type = content_type
                .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
            Ok(response)
        }
        Some(RelayOutput::Transformed(image)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, image.content_type)
            .header(header::CACHE_CONTROL, TRANSFORMED_CACHE_CONTROL)
            .header(header::CONTENT_LENGTH, image.data.len())
            .body(Body::from(image.data))
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to build response");
                HttpAppError::from(AppError::Internal(e.to_string()))
            }),
        Some(RelayOutput::Error(signal)) => Err(signal.into()),
        None => Err(AppError::Internal("image relay aborted".to_string()).into()),
    }
}
