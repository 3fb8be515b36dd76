//! Output encoding
//!
//! Chooses the output format from the `compress` setting (falling back to the
//! source format), encodes with the requested quality and embeds the image
//! comment when the container supports one.

use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat};
use img_parts::jpeg::{markers, Jpeg, JpegSegment};
use img_parts::png::{Png, PngChunk};
use imagine_core::BackendError;
use std::io::Cursor;

const DEFAULT_JPEG_QUALITY: u32 = 75;
const DEFAULT_WEBP_QUALITY: u32 = 80;

/// Output format for encoded images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl OutputFormat {
    /// Map a `compress` token to a format. `None` keeps the source format.
    pub fn from_compress(kind: &str) -> Result<Option<Self>, BackendError> {
        match kind.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Some(OutputFormat::Jpeg)),
            "png" | "zip" | "lossless" => Ok(Some(OutputFormat::Png)),
            "webp" => Ok(Some(OutputFormat::WebP)),
            "none" => Ok(None),
            _ => Err(BackendError::UnsupportedValue {
                setting: "compress",
                value: kind.to_string(),
            }),
        }
    }

    /// Format to re-encode a decoded source as. Unwritable formats become PNG.
    pub fn from_image_format(format: Option<ImageFormat>) -> Self {
        match format {
            Some(ImageFormat::Jpeg) => OutputFormat::Jpeg,
            Some(ImageFormat::WebP) => OutputFormat::WebP,
            Some(ImageFormat::Gif) => OutputFormat::Gif,
            _ => OutputFormat::Png,
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Gif => "image/gif",
        }
    }
}

/// Encoding service
pub struct ImageEncoder;

impl ImageEncoder {
    /// Encode `img` as `format`, then attach `comment` if given
    pub fn encode(
        img: &DynamicImage,
        format: OutputFormat,
        quality: Option<u32>,
        comment: Option<&str>,
    ) -> Result<Bytes, BackendError> {
        let encoded = match format {
            OutputFormat::Jpeg => {
                Self::compress_jpeg(img, quality.unwrap_or(DEFAULT_JPEG_QUALITY))?
            }
            OutputFormat::WebP => {
                Self::compress_webp(img, quality.unwrap_or(DEFAULT_WEBP_QUALITY))
            }
            OutputFormat::Png => Self::write_with(img, ImageFormat::Png)?,
            OutputFormat::Gif => Self::write_with(img, ImageFormat::Gif)?,
        };

        match comment {
            Some(text) => Self::embed_comment(encoded, format, text),
            None => Ok(encoded),
        }
    }

    /// Compress to JPEG using mozjpeg
    fn compress_jpeg(img: &DynamicImage, quality: u32) -> Result<Bytes, BackendError> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality.clamp(1, 100) as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(Bytes::from(jpeg_data))
    }

    /// Compress to WebP
    fn compress_webp(img: &DynamicImage, quality: u32) -> Bytes {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(quality.min(100) as f32);

        Bytes::copy_from_slice(&webp_data)
    }

    fn write_with(img: &DynamicImage, format: ImageFormat) -> Result<Bytes, BackendError> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        let result = match format {
            // GIF frames are RGBA
            ImageFormat::Gif => {
                DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut cursor, format)
            }
            _ => img.write_to(&mut cursor, format),
        };
        result.map_err(|e| BackendError::Encode(e.to_string()))?;

        Ok(Bytes::from(buffer))
    }

    /// Store `text` as a JPEG COM segment or a PNG tEXt chunk
    fn embed_comment(data: Bytes, format: OutputFormat, text: &str) -> Result<Bytes, BackendError> {
        match format {
            OutputFormat::Jpeg => {
                let mut jpeg =
                    Jpeg::from_bytes(data).map_err(|e| BackendError::Encode(e.to_string()))?;
                let segment = JpegSegment::new_with_contents(
                    markers::COM,
                    Bytes::copy_from_slice(text.as_bytes()),
                );
                // After the APPn segments
                let segments = jpeg.segments_mut();
                let position = segments
                    .iter()
                    .position(|s| !(markers::APP0..=markers::APP15).contains(&s.marker()))
                    .unwrap_or(segments.len());
                segments.insert(position, segment);
                Ok(jpeg.encoder().bytes())
            }
            OutputFormat::Png => {
                let mut png =
                    Png::from_bytes(data).map_err(|e| BackendError::Encode(e.to_string()))?;
                let mut contents = b"Comment\0".to_vec();
                contents.extend_from_slice(text.as_bytes());
                let chunk = PngChunk::new(*b"tEXt", Bytes::from(contents));

                let chunks = png.chunks_mut();
                let position = chunks.len().saturating_sub(1);
                chunks.insert(position, chunk);
                Ok(png.encoder().bytes())
            }
            OutputFormat::WebP | OutputFormat::Gif => {
                tracing::debug!(
                    format = ?format,
                    "Comment not supported by output format, skipping"
                );
                Ok(data)
            }
        }
    }
}
