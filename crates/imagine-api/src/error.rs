//! HTTP error response conversion
//!
//! Handlers return `Result<Response, HttpAppError>`. Anything convertible into
//! `AppError` (relay error signals included) renders with the same status,
//! body shape and log level. Details stay hidden unless the handler marks the
//! error with a non-production config.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imagine_core::{AppError, ErrorMetadata, LogLevel, ProxyConfig};
use imagine_processing::ErrorSignal;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from imagine-core)
#[derive(Debug)]
pub struct HttpAppError {
    pub error: AppError,
    /// Leave `details` and `error_type` out of the body
    pub hide_details: bool,
}

impl HttpAppError {
    /// Show details only when `config` is not a production deployment.
    pub fn for_config(mut self, config: &ProxyConfig) -> Self {
        self.hide_details = config.is_production();
        self
    }
}

impl From<AppError> for HttpAppError {
    fn from(error: AppError) -> Self {
        HttpAppError {
            error,
            hide_details: true,
        }
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError::from(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<ErrorSignal> for HttpAppError {
    fn from(signal: ErrorSignal) -> Self {
        HttpAppError::from(AppError::from(signal.error))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.error;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Never for sensitive errors
        let show_details = !self.hide_details && !app_error.is_sensitive();
        let body = Json(ErrorResponse {
            error: app_error.client_message(),
            details: show_details.then(|| app_error.to_string()),
            error_type: show_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        });

        (status, body).into_response()
    }
}
