//! Raster image handle
//!
//! `RasterHandle` records settings and operator steps as capabilities are
//! invoked and renders them all in `to_bytes`. Settings are global to the
//! render: a `gravity` or `filter` invoked after `crop` still applies to it.

use super::color::parse_color;
use super::effects::ImageEffects;
use super::filters::ImageFilters;
use super::geometry::ImageGeometry;
use super::orientation::ImageOrientation;
use super::resize::ImageResize;
use crate::compression::{ImageEncoder, OutputFormat};
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgba};
use imagine_core::{
    BackendError, Dimensions, EncodedImage, FrameGeometry, Geometry, Gravity, HandleResult,
    ImageBackend, ImageHandle, ResizeGeometry, DEFAULT_MAX_OUTPUT_PIXELS,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

const DEFAULT_BORDER_COLOR: &str = "#dfdfdf";
const DEFAULT_BOX_COLOR: &str = "#ffffff";
const DEFAULT_FOREGROUND: &str = "#000000";
const DEFAULT_MATTE_COLOR: &str = "#bdbdbd";

/// Opens [`RasterHandle`]s over encoded image bytes.
///
/// Clones share handle counters, so a backend held by the app state reports
/// every handle opened through it.
#[derive(Debug, Clone)]
pub struct RasterBackend {
    counters: Arc<HandleCounters>,
    max_output_pixels: u64,
}

impl Default for RasterBackend {
    fn default() -> Self {
        Self {
            counters: Arc::default(),
            max_output_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
        }
    }
}

#[derive(Debug, Default)]
struct HandleCounters {
    opened: AtomicUsize,
    released: AtomicUsize,
}

impl RasterBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to render any step whose output exceeds `limit` pixels.
    pub fn with_max_output_pixels(mut self, limit: u64) -> Self {
        self.max_output_pixels = limit;
        self
    }

    /// Handles opened so far.
    pub fn handles_opened(&self) -> usize {
        self.counters.opened.load(Ordering::Relaxed)
    }

    /// Handles released so far.
    pub fn handles_released(&self) -> usize {
        self.counters.released.load(Ordering::Relaxed)
    }
}

impl ImageBackend for RasterBackend {
    type Handle = RasterHandle;

    fn open(&self, data: Bytes) -> HandleResult<RasterHandle> {
        self.counters.opened.fetch_add(1, Ordering::Relaxed);
        let mut handle = RasterHandle::new(data);
        handle.counters = Some(Arc::clone(&self.counters));
        handle.max_output_pixels = self.max_output_pixels;
        Ok(handle)
    }
}

/// Options that affect how steps render and how the result is encoded.
#[derive(Debug, Clone)]
struct Settings {
    antialias: bool,
    dither: bool,
    gravity: Gravity,
    border_color: Option<String>,
    box_color: Option<String>,
    foreground: Option<String>,
    matte_color: Option<String>,
    colorspace: Option<String>,
    filter: Option<String>,
    compress: Option<String>,
    quality: Option<u32>,
    comment: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            antialias: true,
            dither: false,
            gravity: Gravity::default(),
            border_color: None,
            box_color: None,
            foreground: None,
            matte_color: None,
            colorspace: None,
            filter: None,
            compress: None,
            quality: None,
            comment: None,
        }
    }
}

/// Settings with colours and filter parsed, ready for rendering.
struct Resolved {
    antialias: bool,
    dither: bool,
    gravity: Gravity,
    border: Rgba<u8>,
    box_fill: Rgba<u8>,
    foreground: Rgba<u8>,
    matte: Rgba<u8>,
    filter: Option<FilterType>,
}

impl Settings {
    fn resolve(&self) -> Result<Resolved, BackendError> {
        let color = |value: &Option<String>, default: &str| {
            parse_color(value.as_deref().unwrap_or(default))
        };

        Ok(Resolved {
            antialias: self.antialias,
            dither: self.dither,
            gravity: self.gravity,
            border: color(&self.border_color, DEFAULT_BORDER_COLOR)?,
            box_fill: color(&self.box_color, DEFAULT_BOX_COLOR)?,
            foreground: color(&self.foreground, DEFAULT_FOREGROUND)?,
            matte: color(&self.matte_color, DEFAULT_MATTE_COLOR)?,
            filter: ImageResize::resolve_filter(self.filter.as_deref(), self.antialias)?,
        })
    }

    /// Whether the output must be re-encoded even without pixel steps.
    fn forces_encode(&self, target: Option<OutputFormat>) -> bool {
        target.is_some()
            || self.quality.is_some()
            || self.comment.is_some()
            || self.colorspace.is_some()
    }
}

/// Pixel operations, executed in invocation order.
#[derive(Debug, Clone, PartialEq)]
enum Step {
    AutoOrient,
    Backdrop,
    Blur(u32),
    Border(Dimensions),
    Charcoal(u32),
    Chop(Geometry),
    Colors(u32),
    Contrast(i32),
    Crop(Geometry),
    Dissolve(u32),
    Emboss(u32),
    Enhance,
    Equalize,
    Extent(Dimensions),
    Flip,
    Flop,
    Frame(FrameGeometry),
    Gaussian { radius: u32, sigma: u32 },
    Implode(u32),
    Lower(Dimensions),
    Monochrome,
    Negative,
    Normalize,
    Paint(u32),
    Resize(ResizeGeometry),
    Rotate { background: String, degrees: i32 },
    Scale(Dimensions),
    Shadow { opacity: u32, sigma: u32 },
    Solarize(u32),
    Swirl(u32),
    Threshold(u32),
    Trim,
}

/// An image held as its source bytes plus pending work.
#[derive(Debug)]
pub struct RasterHandle {
    source: Bytes,
    format: Option<ImageFormat>,
    settings: Settings,
    steps: Vec<Step>,
    released: bool,
    max_output_pixels: u64,
    counters: Option<Arc<HandleCounters>>,
}

impl RasterHandle {
    pub fn new(source: Bytes) -> Self {
        let format = image::guess_format(&source).ok();
        Self {
            source,
            format,
            settings: Settings::default(),
            steps: Vec::new(),
            released: false,
            max_output_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
            counters: None,
        }
    }

    /// Number of pending pixel steps.
    pub fn pending_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn ensure_open(&self) -> HandleResult {
        if self.released {
            return Err(BackendError::Released);
        }
        Ok(())
    }

    fn push(&mut self, step: Step) -> HandleResult {
        self.ensure_open()?;
        self.steps.push(step);
        Ok(())
    }

    fn configure(&mut self, update: impl FnOnce(&mut Settings)) -> HandleResult {
        self.ensure_open()?;
        update(&mut self.settings);
        Ok(())
    }

    fn source_content_type(&self) -> &'static str {
        self.format
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream")
    }

    fn decode(&self) -> Result<DynamicImage, BackendError> {
        let decoded = match self.format {
            Some(format) => image::load_from_memory_with_format(&self.source, format),
            None => image::load_from_memory(&self.source),
        };
        decoded.map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Size a canvas-growing step will allocate, computed before rendering.
    fn output_size(dimensions: (u32, u32), step: &Step) -> HandleResult<Option<(u32, u32)>> {
        let (width, height) = dimensions;
        let size = match step {
            Step::Border(size) => ImageGeometry::border_size(dimensions, *size)?,
            Step::Extent(size) => ImageGeometry::extent_size(dimensions, *size),
            Step::Frame(frame) => ImageGeometry::frame_size(dimensions, *frame)?,
            Step::Resize(geometry) => ImageResize::calculate_dimensions(width, height, geometry),
            Step::Rotate { degrees, .. } => ImageOrientation::rotated_size(dimensions, *degrees),
            Step::Scale(size) => ImageResize::calculate_dimensions(
                width,
                height,
                &ResizeGeometry {
                    width: size.width,
                    height: size.height,
                    options: None,
                },
            ),
            Step::Shadow { sigma, .. } => ImageGeometry::shadow_size(dimensions, *sigma)?,
            _ => return Ok(None),
        };
        Ok(Some(size))
    }

    fn check_output_size(&self, dimensions: (u32, u32), step: &Step) -> HandleResult {
        let Some((width, height)) = Self::output_size(dimensions, step)? else {
            return Ok(());
        };
        if width as u64 * height as u64 > self.max_output_pixels {
            return Err(BackendError::OutputTooLarge {
                width,
                height,
                limit: self.max_output_pixels,
            });
        }
        Ok(())
    }

    fn render(&self, img: DynamicImage, step: &Step, s: &Resolved) -> HandleResult<DynamicImage> {
        self.check_output_size(img.dimensions(), step)?;
        let rendered = match step {
            Step::AutoOrient => ImageOrientation::apply_exif_orientation(img, &self.source),
            Step::Backdrop => ImageFilters::backdrop(img),
            Step::Blur(radius) => ImageFilters::apply_blur(img, *radius),
            Step::Border(size) => ImageGeometry::border(&img, *size, s.border)?,
            Step::Charcoal(factor) => ImageEffects::charcoal(img, *factor),
            Step::Chop(region) => ImageGeometry::chop(&img, *region, s.gravity),
            Step::Colors(count) => ImageFilters::reduce_colors(img, *count, s.dither),
            Step::Contrast(multiplier) => ImageFilters::adjust_contrast(img, *multiplier),
            Step::Crop(region) => ImageGeometry::crop(&img, *region, s.gravity)?,
            Step::Dissolve(percent) => ImageFilters::dissolve(img, *percent),
            Step::Emboss(radius) => ImageEffects::emboss(img, *radius),
            Step::Enhance => ImageEffects::enhance(img),
            Step::Equalize => ImageFilters::equalize(img),
            Step::Extent(size) => ImageGeometry::extent(&img, *size, s.gravity, s.box_fill),
            Step::Flip => ImageOrientation::apply_flip_vertical(img),
            Step::Flop => ImageOrientation::apply_flip_horizontal(img),
            Step::Frame(frame) => ImageGeometry::frame(&img, *frame, s.matte)?,
            Step::Gaussian { radius, sigma } => ImageFilters::apply_gaussian(img, *radius, *sigma),
            Step::Implode(factor) => ImageEffects::implode(img, *factor),
            Step::Lower(size) => ImageGeometry::lower(&img, *size),
            Step::Monochrome => ImageFilters::monochrome(img, s.dither),
            Step::Negative => ImageFilters::apply_invert(img),
            Step::Normalize => ImageFilters::normalize(img),
            Step::Paint(radius) => ImageEffects::paint(img, *radius),
            Step::Resize(geometry) => ImageResize::apply_resize(&img, geometry, s.filter),
            Step::Rotate {
                background,
                degrees,
            } => {
                let fill = if background.is_empty() {
                    s.box_fill
                } else {
                    parse_color(background)?
                };
                ImageOrientation::rotate(img, *degrees, fill, s.antialias)
            }
            Step::Scale(size) => ImageResize::scale(&img, *size, s.antialias),
            Step::Shadow { opacity, sigma } => {
                ImageGeometry::shadow(&img, *opacity, *sigma, s.foreground)?
            }
            Step::Solarize(percent) => ImageFilters::solarize(img, *percent),
            Step::Swirl(degrees) => ImageEffects::swirl(img, *degrees),
            Step::Threshold(percent) => ImageFilters::threshold(img, *percent),
            Step::Trim => ImageGeometry::trim(&img),
        };
        Ok(rendered)
    }
}

impl ImageHandle for RasterHandle {
    fn antialias(&mut self, enabled: bool) -> HandleResult {
        self.configure(|s| s.antialias = enabled)
    }

    fn auto_orient(&mut self) -> HandleResult {
        self.push(Step::AutoOrient)
    }

    fn backdrop(&mut self) -> HandleResult {
        self.push(Step::Backdrop)
    }

    fn blur(&mut self, radius: u32) -> HandleResult {
        self.push(Step::Blur(radius))
    }

    fn border(&mut self, size: Dimensions) -> HandleResult {
        self.push(Step::Border(size))
    }

    fn border_color(&mut self, color: &str) -> HandleResult {
        self.configure(|s| s.border_color = Some(color.to_string()))
    }

    fn box_color(&mut self, color: &str) -> HandleResult {
        self.configure(|s| s.box_color = Some(color.to_string()))
    }

    fn charcoal(&mut self, factor: u32) -> HandleResult {
        self.push(Step::Charcoal(factor))
    }

    fn chop(&mut self, region: Geometry) -> HandleResult {
        self.push(Step::Chop(region))
    }

    fn colors(&mut self, count: u32) -> HandleResult {
        self.push(Step::Colors(count))
    }

    fn colorspace(&mut self, name: &str) -> HandleResult {
        self.configure(|s| s.colorspace = Some(name.to_string()))
    }

    fn compress(&mut self, kind: &str) -> HandleResult {
        self.configure(|s| s.compress = Some(kind.to_string()))
    }

    fn comment(&mut self, text: &str) -> HandleResult {
        self.configure(|s| s.comment = Some(text.to_string()))
    }

    fn contrast(&mut self, multiplier: i32) -> HandleResult {
        self.push(Step::Contrast(multiplier))
    }

    fn crop(&mut self, region: Geometry) -> HandleResult {
        self.push(Step::Crop(region))
    }

    fn dissolve(&mut self, percent: u32) -> HandleResult {
        self.push(Step::Dissolve(percent))
    }

    fn dither(&mut self, enabled: bool) -> HandleResult {
        self.configure(|s| s.dither = enabled)
    }

    fn emboss(&mut self, radius: u32) -> HandleResult {
        self.push(Step::Emboss(radius))
    }

    fn enhance(&mut self) -> HandleResult {
        self.push(Step::Enhance)
    }

    fn equalize(&mut self) -> HandleResult {
        self.push(Step::Equalize)
    }

    fn extent(&mut self, size: Dimensions) -> HandleResult {
        self.push(Step::Extent(size))
    }

    fn filter(&mut self, name: &str) -> HandleResult {
        self.configure(|s| s.filter = Some(name.to_string()))
    }

    fn flip(&mut self) -> HandleResult {
        self.push(Step::Flip)
    }

    fn flop(&mut self) -> HandleResult {
        self.push(Step::Flop)
    }

    fn foreground(&mut self, color: &str) -> HandleResult {
        self.configure(|s| s.foreground = Some(color.to_string()))
    }

    fn frame(&mut self, frame: FrameGeometry) -> HandleResult {
        self.push(Step::Frame(frame))
    }

    fn gaussian(&mut self, radius: u32, sigma: u32) -> HandleResult {
        self.push(Step::Gaussian { radius, sigma })
    }

    fn gravity(&mut self, gravity: Gravity) -> HandleResult {
        self.configure(|s| s.gravity = gravity)
    }

    fn implode(&mut self, factor: u32) -> HandleResult {
        self.push(Step::Implode(factor))
    }

    fn lower(&mut self, size: Dimensions) -> HandleResult {
        self.push(Step::Lower(size))
    }

    fn matte_color(&mut self, color: &str) -> HandleResult {
        self.configure(|s| s.matte_color = Some(color.to_string()))
    }

    fn monochrome(&mut self) -> HandleResult {
        self.push(Step::Monochrome)
    }

    fn negative(&mut self) -> HandleResult {
        self.push(Step::Negative)
    }

    fn normalize(&mut self) -> HandleResult {
        self.push(Step::Normalize)
    }

    fn paint(&mut self, radius: u32) -> HandleResult {
        self.push(Step::Paint(radius))
    }

    fn quality(&mut self, quality: u32) -> HandleResult {
        self.configure(|s| s.quality = Some(quality))
    }

    fn resize(&mut self, geometry: &ResizeGeometry) -> HandleResult {
        self.push(Step::Resize(geometry.clone()))
    }

    fn rotate(&mut self, background: &str, degrees: i32) -> HandleResult {
        self.push(Step::Rotate {
            background: background.to_string(),
            degrees,
        })
    }

    fn scale(&mut self, size: Dimensions) -> HandleResult {
        self.push(Step::Scale(size))
    }

    fn shadow(&mut self, opacity: u32, sigma: u32) -> HandleResult {
        self.push(Step::Shadow { opacity, sigma })
    }

    fn solarize(&mut self, threshold: u32) -> HandleResult {
        self.push(Step::Solarize(threshold))
    }

    fn swirl(&mut self, degrees: u32) -> HandleResult {
        self.push(Step::Swirl(degrees))
    }

    fn threshold(&mut self, threshold: u32) -> HandleResult {
        self.push(Step::Threshold(threshold))
    }

    fn trim(&mut self) -> HandleResult {
        self.push(Step::Trim)
    }

    fn to_bytes(&mut self) -> HandleResult<EncodedImage> {
        self.ensure_open()?;

        let target = match self.settings.compress.as_deref() {
            Some(kind) => OutputFormat::from_compress(kind)?,
            None => None,
        };

        if self.steps.is_empty() && !self.settings.forces_encode(target) {
            return Ok(EncodedImage {
                data: self.source.clone(),
                content_type: self.source_content_type().to_string(),
            });
        }

        let start = Instant::now();
        let resolved = self.settings.resolve()?;
        let mut img = self.decode()?;
        let (orig_width, orig_height) = img.dimensions();

        for step in &self.steps {
            img = self.render(img, step, &resolved)?;
        }

        if let Some(name) = self.settings.colorspace.as_deref() {
            img = ImageFilters::colorspace(img, name)?;
        }

        let format = target.unwrap_or_else(|| OutputFormat::from_image_format(self.format));
        let data = ImageEncoder::encode(
            &img,
            format,
            self.settings.quality,
            self.settings.comment.as_deref(),
        )?;

        let (width, height) = img.dimensions();
        tracing::debug!(
            steps = self.steps.len(),
            original_width = orig_width,
            original_height = orig_height,
            width = width,
            height = height,
            bytes = data.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Rendered image"
        );

        Ok(EncodedImage {
            data,
            content_type: format.to_mime_type().to_string(),
        })
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.source = Bytes::new();
        self.steps.clear();
        if let Some(counters) = &self.counters {
            counters.released.fetch_add(1, Ordering::Relaxed);
        }
    }
}
