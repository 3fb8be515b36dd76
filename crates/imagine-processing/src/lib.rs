//! Imagine Image Processing Library
//!
//! This crate provides the raster image backend and the response relay that
//! buffers an upstream image, applies an operation string and emits the result.

pub mod compression;
pub mod image;
pub mod relay;

// Re-export commonly used types
pub use compression::{ImageEncoder, OutputFormat};
pub use self::image::{
    ImageEffects, ImageFilters, ImageGeometry, ImageOrientation, ImageResize, RasterBackend,
    RasterHandle,
};
pub use relay::{
    Emission, ErrorSignal, RelayError, RelayOutput, RelayState, ResponseRelay,
    DEFAULT_MAX_BUFFER_BYTES,
};
