//! Operation path extraction and building
//!
//! Request paths look like `/{key}/{operations...}`: the first segment names
//! the upstream image, everything after it (URL-decoded) is the operation
//! string handed to the dispatcher.
//!
//! # Example
//!
//! ```rust
//! use imagine_core::operation_path::OperationPath;
//!
//! let path = OperationPath::parse("/joe/resize/200x200").unwrap();
//! assert_eq!(path.key(), "joe");
//! assert_eq!(path.operations(), "/resize/200x200");
//! assert!(path.has_operations());
//! ```

use crate::error::PathError;
use crate::operations::{Dimensions, Geometry, Gravity, Operation, ResizeGeometry};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside one operation segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A request path split into resource key and operation string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPath {
    key: String,
    operations: String,
}

impl OperationPath {
    /// Split a URL path (`url.pathname`) into key and decoded operations.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let Some(rest) = path.strip_prefix('/') else {
            return Ok(Self {
                key: path.to_string(),
                operations: String::new(),
            });
        };

        let (key, operations) = match rest.find('/') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };

        let operations = percent_decode_str(operations)
            .decode_utf8()
            .map_err(|e| PathError::InvalidPath(format!("operations are not valid UTF-8: {}", e)))?;

        Ok(Self {
            key: key.to_string(),
            operations: operations.into_owned(),
        })
    }

    /// Parse a full URL or a path with query/fragment.
    pub fn from_url(url: &str) -> Result<Self, PathError> {
        let path = match url.find("://") {
            Some(scheme_end) => {
                let after_scheme = &url[scheme_end + 3..];
                match after_scheme.find('/') {
                    Some(path_start) => &after_scheme[path_start..],
                    None => "/",
                }
            }
            None => url,
        };
        let path = path
            .split('?')
            .next()
            .unwrap_or(path)
            .split('#')
            .next()
            .unwrap_or(path);

        Self::parse(path)
    }

    /// Routing key: the first path segment, as it appeared in the URL.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Decoded operation string, including its leading separator.
    pub fn operations(&self) -> &str {
        &self.operations
    }

    /// A string of one character or less requests nothing.
    pub fn has_operations(&self) -> bool {
        self.operations.len() > 1
    }
}

/// Fluent builder for operation paths.
///
/// # Example
///
/// ```rust
/// use imagine_core::operation_path::OperationPathBuilder;
///
/// let path = OperationPathBuilder::new()
///     .resize(200, 200)
///     .blur(4)
///     .build("joe");
/// assert_eq!(path, "/joe/resize/200x200/blur/4");
/// ```
#[derive(Debug, Clone, Default)]
pub struct OperationPathBuilder {
    operations: Vec<Operation>,
}

impl OperationPathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append any operation.
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn resize(self, width: u32, height: u32) -> Self {
        self.operation(Operation::Resize(ResizeGeometry {
            width,
            height,
            options: None,
        }))
    }

    /// Resize with a geometry suffix such as `!` or `^`.
    pub fn resize_with(self, width: u32, height: u32, options: &str) -> Self {
        self.operation(Operation::Resize(ResizeGeometry {
            width,
            height,
            options: (!options.is_empty()).then(|| options.to_string()),
        }))
    }

    pub fn crop(self, width: u32, height: u32, x: u32, y: u32) -> Self {
        self.operation(Operation::Crop(Geometry::new(width, height, x, y)))
    }

    pub fn extent(self, width: u32, height: u32) -> Self {
        self.operation(Operation::Extent(Dimensions::new(width, height)))
    }

    pub fn blur(self, radius: u32) -> Self {
        self.operation(Operation::Blur(radius))
    }

    pub fn gravity(self, gravity: Gravity) -> Self {
        self.operation(Operation::Gravity(gravity))
    }

    pub fn rotate(self, background: &str, degrees: i32) -> Self {
        self.operation(Operation::Rotate {
            background: background.to_string(),
            degrees,
        })
    }

    pub fn quality(self, quality: u32) -> Self {
        self.operation(Operation::Quality(quality))
    }

    /// Build only the operation string (e.g. `/resize/200x200/blur/4`).
    pub fn build_operations(&self) -> String {
        self.operations
            .iter()
            .map(|operation| format!("/{}", segment(operation)))
            .collect()
    }

    /// Build a full request path for `key`.
    pub fn build(&self, key: &str) -> String {
        format!("/{}{}", key.trim_matches('/'), self.build_operations())
    }
}

fn encode(token: &str) -> String {
    utf8_percent_encode(token, SEGMENT).to_string()
}

fn segment(operation: &Operation) -> String {
    match operation {
        Operation::Antialias(enabled) => format!("antialias/{}", enabled),
        Operation::AutoOrient => "autoOrient".to_string(),
        Operation::Backdrop => "backdrop".to_string(),
        Operation::Blur(radius) => format!("blur/{}", radius),
        Operation::Border(size) => format!("border/{}", size),
        Operation::BorderColor(color) => format!("borderColor/{}", encode(color)),
        Operation::Box(color) => format!("box/{}", encode(color)),
        Operation::Charcoal(factor) => format!("charcoal/{}", factor),
        Operation::Chop(region) => format!("chop/{}", region),
        Operation::Colors(count) => format!("colors/{}", count),
        Operation::Colorspace(name) => format!("colorspace/{}", encode(name)),
        Operation::Compress(kind) => format!("compress/{}", encode(kind)),
        Operation::Comment(text) => format!("comment/{}", encode(text)),
        Operation::Contrast(multiplier) => format!("contrast/{}", multiplier),
        Operation::Crop(region) => format!("crop/{}", region),
        Operation::Dissolve(percent) => format!("dissolve/{}", percent),
        Operation::Dither(enabled) => format!("dither/{}", enabled),
        Operation::Emboss(radius) => format!("emboss/{}", radius),
        Operation::Enhance => "enhance".to_string(),
        Operation::Equalize => "equalize".to_string(),
        Operation::Extent(size) => format!("extent/{}", size),
        Operation::Filter(name) => format!("filter/{}", encode(name)),
        Operation::Flip => "flip".to_string(),
        Operation::Flop => "flop".to_string(),
        Operation::Foreground(color) => format!("foreground/{}", encode(color)),
        Operation::Frame(frame) => format!("frame/{}", frame),
        Operation::Gaussian { radius, sigma } => format!("gaussian/{}x{}", radius, sigma),
        Operation::Gravity(gravity) => format!("gravity/{}", gravity.as_str().to_lowercase()),
        Operation::Implode(factor) => format!("implode/{}", factor),
        Operation::Lower(size) => format!("lower/{}", size),
        Operation::MatteColor(color) => format!("matteColor/{}", encode(color)),
        Operation::Monochrome => "monochrome".to_string(),
        Operation::Negative => "negative".to_string(),
        Operation::Normalize => "normalize".to_string(),
        Operation::Paint(radius) => format!("paint/{}", radius),
        Operation::Quality(quality) => format!("quality/{}", quality),
        Operation::Resize(geometry) => format!("resize/{}", encode(&geometry.to_string())),
        Operation::Rotate {
            background,
            degrees,
        } => format!("rotate/{}+{}", encode(background), degrees),
        Operation::Scale(size) => format!("scale/{}", size),
        Operation::Sepia(threshold) => format!("sepia/{}", threshold),
        Operation::Shadow { opacity, sigma } => format!("shadow/{}x{}", opacity, sigma),
        Operation::Solarize(threshold) => format!("solarize/{}", threshold),
        Operation::Swirl(degrees) => format!("swirl/{}", degrees),
        Operation::Trim => "trim".to_string(),
    }
}
