//! Image operations
//!
//! This module provides the operation vocabulary and the machinery that turns
//! an operation string into typed operations:
//! - Typed arguments (types)
//! - The fixed keyword table (grammar)
//! - Matching and invocation against an image handle (dispatcher)

pub mod dispatcher;
pub mod grammar;
pub mod types;

pub use dispatcher::OperationDispatcher;
pub use grammar::{MatchResult, OperationGrammar, OperationRule};
pub use types::{Dimensions, FrameGeometry, Geometry, Gravity, ResizeGeometry, ResizeMode};

use crate::handle::{HandleResult, ImageHandle};

/// One coerced operation, ready to be invoked on an image handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Antialias(bool),
    AutoOrient,
    Backdrop,
    Blur(u32),
    Border(Dimensions),
    BorderColor(String),
    Box(String),
    Charcoal(u32),
    Chop(Geometry),
    Colors(u32),
    Colorspace(String),
    Compress(String),
    Comment(String),
    Contrast(i32),
    Crop(Geometry),
    Dissolve(u32),
    Dither(bool),
    Emboss(u32),
    Enhance,
    Equalize,
    Extent(Dimensions),
    Filter(String),
    Flip,
    Flop,
    Foreground(String),
    Frame(FrameGeometry),
    Gaussian { radius: u32, sigma: u32 },
    Gravity(Gravity),
    Implode(u32),
    Lower(Dimensions),
    MatteColor(String),
    Monochrome,
    Negative,
    Normalize,
    Paint(u32),
    Quality(u32),
    Resize(ResizeGeometry),
    Rotate { background: String, degrees: i32 },
    Scale(Dimensions),
    /// `sepia/N` in the path; applied as a grayscale threshold
    Sepia(u32),
    Shadow { opacity: u32, sigma: u32 },
    Solarize(u32),
    Swirl(u32),
    Trim,
}

impl Operation {
    /// Invoke the matching capability on `handle`.
    pub fn apply_to<H: ImageHandle + ?Sized>(&self, handle: &mut H) -> HandleResult {
        match self {
            Operation::Antialias(enabled) => handle.antialias(*enabled),
            Operation::AutoOrient => handle.auto_orient(),
            Operation::Backdrop => handle.backdrop(),
            Operation::Blur(radius) => handle.blur(*radius),
            Operation::Border(size) => handle.border(*size),
            Operation::BorderColor(color) => handle.border_color(color),
            Operation::Box(color) => handle.box_color(color),
            Operation::Charcoal(factor) => handle.charcoal(*factor),
            Operation::Chop(region) => handle.chop(*region),
            Operation::Colors(count) => handle.colors(*count),
            Operation::Colorspace(name) => handle.colorspace(name),
            Operation::Compress(kind) => handle.compress(kind),
            Operation::Comment(text) => handle.comment(text),
            Operation::Contrast(multiplier) => handle.contrast(*multiplier),
            Operation::Crop(region) => handle.crop(*region),
            Operation::Dissolve(percent) => handle.dissolve(*percent),
            Operation::Dither(enabled) => handle.dither(*enabled),
            Operation::Emboss(radius) => handle.emboss(*radius),
            Operation::Enhance => handle.enhance(),
            Operation::Equalize => handle.equalize(),
            Operation::Extent(size) => handle.extent(*size),
            Operation::Filter(name) => handle.filter(name),
            Operation::Flip => handle.flip(),
            Operation::Flop => handle.flop(),
            Operation::Foreground(color) => handle.foreground(color),
            Operation::Frame(frame) => handle.frame(*frame),
            Operation::Gaussian { radius, sigma } => handle.gaussian(*radius, *sigma),
            Operation::Gravity(gravity) => handle.gravity(*gravity),
            Operation::Implode(factor) => handle.implode(*factor),
            Operation::Lower(size) => handle.lower(*size),
            Operation::MatteColor(color) => handle.matte_color(color),
            Operation::Monochrome => handle.monochrome(),
            Operation::Negative => handle.negative(),
            Operation::Normalize => handle.normalize(),
            Operation::Paint(radius) => handle.paint(*radius),
            Operation::Quality(quality) => handle.quality(*quality),
            Operation::Resize(geometry) => handle.resize(geometry),
            Operation::Rotate {
                background,
                degrees,
            } => handle.rotate(background, *degrees),
            Operation::Scale(size) => handle.scale(*size),
            Operation::Sepia(threshold) => handle.threshold(*threshold),
            Operation::Shadow { opacity, sigma } => handle.shadow(*opacity, *sigma),
            Operation::Solarize(threshold) => handle.solarize(*threshold),
            Operation::Swirl(degrees) => handle.swirl(*degrees),
            Operation::Trim => handle.trim(),
        }
    }
}
