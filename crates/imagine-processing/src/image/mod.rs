//! Image processing module
//!
//! This module provides the raster backend behind the image handle interface:
//! - Deferred handle and backend (handle)
//! - Geometry, orientation and resize operations
//! - Tone filters and artistic effects
//! - Colour token parsing

pub mod color;
pub mod effects;
pub mod filters;
pub mod geometry;
pub mod handle;
pub mod orientation;
pub mod resize;

pub use handle::{RasterBackend, RasterHandle};

// Re-export commonly used types
pub use color::parse_color;
pub use effects::ImageEffects;
pub use filters::ImageFilters;
pub use geometry::ImageGeometry;
pub use orientation::ImageOrientation;
pub use resize::ImageResize;
