//! Imagine Core Library
//!
//! This crate provides the operation grammar and dispatcher, the image handle
//! capability interface, error types and configuration shared by every
//! imagine component.

pub mod config;
pub mod error;
pub mod handle;
pub mod operation_path;
pub mod operations;

// Re-export commonly used types
pub use config::{LogFormat, ProxyConfig, DEFAULT_MAX_OUTPUT_PIXELS};
pub use error::{AppError, BackendError, ErrorMetadata, LogLevel, OperationError, PathError};
pub use handle::{EncodedImage, HandleResult, ImageBackend, ImageHandle};
pub use operation_path::{OperationPath, OperationPathBuilder};
pub use operations::{
    Dimensions, FrameGeometry, Geometry, Gravity, Operation, OperationDispatcher,
    OperationGrammar, ResizeGeometry, ResizeMode,
};
