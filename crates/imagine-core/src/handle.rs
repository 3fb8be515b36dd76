//! Image handle capability interface
//!
//! The dispatcher only ever talks to an image backend through these traits:
//! one method per grammar operation, plus byte extraction and release.
//! Implementations may apply operations eagerly or record them and apply them
//! when bytes are requested, as long as every applied operation has taken
//! effect, in invocation order, by the time `to_bytes` returns.

use crate::error::BackendError;
use crate::operations::{Dimensions, FrameGeometry, Geometry, Gravity, ResizeGeometry};
use bytes::Bytes;

pub type HandleResult<T = ()> = Result<T, BackendError>;

/// Encoded output of an image handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Bytes,
    pub content_type: String,
}

/// Opens image handles from raw bytes.
pub trait ImageBackend: Send + Sync + 'static {
    type Handle: ImageHandle + Send + 'static;

    fn open(&self, data: Bytes) -> HandleResult<Self::Handle>;
}

/// Capability interface over one image.
pub trait ImageHandle {
    fn antialias(&mut self, enabled: bool) -> HandleResult;
    fn auto_orient(&mut self) -> HandleResult;
    fn backdrop(&mut self) -> HandleResult;
    fn blur(&mut self, radius: u32) -> HandleResult;
    fn border(&mut self, size: Dimensions) -> HandleResult;
    fn border_color(&mut self, color: &str) -> HandleResult;
    fn box_color(&mut self, color: &str) -> HandleResult;
    fn charcoal(&mut self, factor: u32) -> HandleResult;
    fn chop(&mut self, region: Geometry) -> HandleResult;
    fn colors(&mut self, count: u32) -> HandleResult;
    fn colorspace(&mut self, name: &str) -> HandleResult;
    fn compress(&mut self, kind: &str) -> HandleResult;
    fn comment(&mut self, text: &str) -> HandleResult;
    fn contrast(&mut self, multiplier: i32) -> HandleResult;
    fn crop(&mut self, region: Geometry) -> HandleResult;
    /// Scale the alpha channel to `percent` of its value.
    fn dissolve(&mut self, percent: u32) -> HandleResult;
    fn dither(&mut self, enabled: bool) -> HandleResult;
    fn emboss(&mut self, radius: u32) -> HandleResult;
    fn enhance(&mut self) -> HandleResult;
    fn equalize(&mut self) -> HandleResult;
    fn extent(&mut self, size: Dimensions) -> HandleResult;
    fn filter(&mut self, name: &str) -> HandleResult;
    fn flip(&mut self) -> HandleResult;
    fn flop(&mut self) -> HandleResult;
    fn foreground(&mut self, color: &str) -> HandleResult;
    fn frame(&mut self, frame: FrameGeometry) -> HandleResult;
    fn gaussian(&mut self, radius: u32, sigma: u32) -> HandleResult;
    fn gravity(&mut self, gravity: Gravity) -> HandleResult;
    fn implode(&mut self, factor: u32) -> HandleResult;
    fn lower(&mut self, size: Dimensions) -> HandleResult;
    fn matte_color(&mut self, color: &str) -> HandleResult;
    fn monochrome(&mut self) -> HandleResult;
    fn negative(&mut self) -> HandleResult;
    fn normalize(&mut self) -> HandleResult;
    fn paint(&mut self, radius: u32) -> HandleResult;
    fn quality(&mut self, quality: u32) -> HandleResult;
    fn resize(&mut self, geometry: &ResizeGeometry) -> HandleResult;
    fn rotate(&mut self, background: &str, degrees: i32) -> HandleResult;
    fn scale(&mut self, size: Dimensions) -> HandleResult;
    fn shadow(&mut self, opacity: u32, sigma: u32) -> HandleResult;
    fn solarize(&mut self, threshold: u32) -> HandleResult;
    fn swirl(&mut self, degrees: u32) -> HandleResult;
    fn threshold(&mut self, threshold: u32) -> HandleResult;
    fn trim(&mut self) -> HandleResult;

    /// Produce the encoded bytes with every applied operation in effect.
    fn to_bytes(&mut self) -> HandleResult<EncodedImage>;

    /// Reclaim backend resources. Calling it more than once is a no-op.
    fn release(&mut self);
}
