//! Error types module
//!
//! This module provides the error types used throughout the proxy. Operation
//! parsing, the image backend and URL extraction each have their own error
//! enum; `AppError` unifies them for the hosting layer and self-describes how
//! it should be presented through the `ErrorMetadata` trait.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like invalid operation arguments
    Debug,
    /// Warning level - for recoverable issues like upstream failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "INVALID_OPERATION_ARGUMENT")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Failures raised by an image backend while opening, transforming or
/// encoding an image.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Unsupported {setting} value: {value}")]
    UnsupportedValue {
        setting: &'static str,
        value: String,
    },

    #[error("Output of {width}x{height} exceeds the {limit} pixel limit")]
    OutputTooLarge { width: u32, height: u32, limit: u64 },

    #[error("Image handle has already been released")]
    Released,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Errors produced while turning an operation string into operations.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("Invalid argument `{argument}` for operation `{operation}`: {value:?} ({reason})")]
    InvalidOperationArgument {
        operation: &'static str,
        argument: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl OperationError {
    pub fn invalid_argument(
        operation: &'static str,
        argument: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        OperationError::InvalidOperationArgument {
            operation,
            argument,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Errors produced while extracting the operation string from a request path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid operation argument: {0}")]
    InvalidOperationArgument(String),

    #[error("Image processing error: {0}")]
    BackendProcessing(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Image too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<OperationError> for AppError {
    fn from(err: OperationError) -> Self {
        match err {
            OperationError::InvalidOperationArgument { .. } => {
                AppError::InvalidOperationArgument(err.to_string())
            }
            OperationError::Backend(backend) => AppError::from(backend),
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::OutputTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            other => AppError::BackendProcessing(other.to_string()),
        }
    }
}

impl From<PathError> for AppError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::InvalidPath(msg) => AppError::InvalidPath(msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

/// Static metadata for each variant:
/// (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidOperationArgument(_) => (
            400,
            "INVALID_OPERATION_ARGUMENT",
            false,
            Some("Check the operation arguments in the URL path"),
            false,
            LogLevel::Debug,
        ),
        AppError::BackendProcessing(_) => (
            502,
            "BACKEND_PROCESSING_ERROR",
            false,
            Some("Check the image format and the requested operations"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidPath(_) => (
            400,
            "INVALID_PATH",
            false,
            Some("Check that the path is correctly URL-encoded"),
            false,
            LogLevel::Debug,
        ),
        AppError::Upstream(_) => (
            502,
            "UPSTREAM_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Warn,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the image key exists upstream"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Request a smaller image"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name (for logging)
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidOperationArgument(_) => "InvalidOperationArgument",
            AppError::BackendProcessing(_) => "BackendProcessing",
            AppError::InvalidPath(_) => "InvalidPath",
            AppError::Upstream(_) => "Upstream",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "InternalWithSource",
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidOperationArgument(ref msg) => msg.clone(),
            AppError::BackendProcessing(_) => "error performing image operations".to_string(),
            AppError::InvalidPath(ref msg) => msg.clone(),
            AppError::Upstream(_) => "Failed to fetch image from upstream".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "An internal error occurred".to_string()
            }
        }
    }
}
