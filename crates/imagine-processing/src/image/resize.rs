use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use imagine_core::{BackendError, Dimensions, ResizeGeometry, ResizeMode};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Resolve the resampling filter from the `filter` and `antialias` settings.
    ///
    /// `None` means "pick one from the resize ratio".
    pub fn resolve_filter(
        name: Option<&str>,
        antialias: bool,
    ) -> Result<Option<FilterType>, BackendError> {
        let Some(name) = name else {
            return Ok((!antialias).then_some(FilterType::Nearest));
        };

        let filter = match name.to_lowercase().as_str() {
            "point" | "box" | "nearest" => FilterType::Nearest,
            "triangle" | "bilinear" => FilterType::Triangle,
            "catrom" | "catmullrom" | "cubic" | "bicubic" => FilterType::CatmullRom,
            "gaussian" => FilterType::Gaussian,
            "lanczos" => FilterType::Lanczos3,
            _ => {
                return Err(BackendError::UnsupportedValue {
                    setting: "filter",
                    value: name.to_string(),
                })
            }
        };
        Ok(Some(filter))
    }

    /// Calculate target dimensions for a resize geometry.
    ///
    /// A zero width or height is derived from the other side. Returns the
    /// original dimensions when the mode's condition does not hold.
    pub fn calculate_dimensions(
        orig_width: u32,
        orig_height: u32,
        geometry: &ResizeGeometry,
    ) -> (u32, u32) {
        let (ow, oh) = (orig_width as f64, orig_height as f64);
        let (gw, gh) = (geometry.width as f64, geometry.height as f64);

        if geometry.width == 0 && geometry.height == 0 {
            return (orig_width, orig_height);
        }

        let fit = |fill: bool| {
            let sx = gw / ow;
            let sy = gh / oh;
            let scale = match (geometry.width, geometry.height) {
                (0, _) => sy,
                (_, 0) => sx,
                _ if fill => sx.max(sy),
                _ => sx.min(sy),
            };
            (ow * scale, oh * scale)
        };

        let (width, height) = match geometry.mode() {
            ResizeMode::Fit => fit(false),
            ResizeMode::Fill => fit(true),
            ResizeMode::Exact => match (geometry.width, geometry.height) {
                (0, _) | (_, 0) => fit(false),
                _ => (gw, gh),
            },
            ResizeMode::Percent => {
                let py = if geometry.height == 0 { gw } else { gh };
                (ow * gw / 100.0, oh * py / 100.0)
            }
            ResizeMode::ShrinkOnly => {
                let too_wide = geometry.width != 0 && orig_width > geometry.width;
                let too_tall = geometry.height != 0 && orig_height > geometry.height;
                if too_wide || too_tall {
                    fit(false)
                } else {
                    (ow, oh)
                }
            }
            ResizeMode::EnlargeOnly => {
                let narrow = geometry.width == 0 || orig_width < geometry.width;
                let short = geometry.height == 0 || orig_height < geometry.height;
                if narrow && short {
                    fit(false)
                } else {
                    (ow, oh)
                }
            }
        };

        (
            (width.round() as u32).max(1),
            (height.round() as u32).max(1),
        )
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Resize image to exact dimensions
    pub fn resize_image(
        img: &DynamicImage,
        width: u32,
        height: u32,
        filter: Option<FilterType>,
    ) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        if (orig_width, orig_height) == (width, height) {
            return img.clone();
        }
        let filter =
            filter.unwrap_or_else(|| Self::select_filter(orig_width, orig_height, width, height));
        img.resize_exact(width, height, filter)
    }

    /// Apply a resize geometry
    pub fn apply_resize(
        img: &DynamicImage,
        geometry: &ResizeGeometry,
        filter: Option<FilterType>,
    ) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (width, height) = Self::calculate_dimensions(orig_width, orig_height, geometry);
        Self::resize_image(img, width, height, filter)
    }

    /// Fit inside `size` with a fast box-style filter, ignoring the filter setting
    pub fn scale(img: &DynamicImage, size: Dimensions, antialias: bool) -> DynamicImage {
        let geometry = ResizeGeometry {
            width: size.width,
            height: size.height,
            options: None,
        };
        let filter = if antialias {
            FilterType::Triangle
        } else {
            FilterType::Nearest
        };
        Self::apply_resize(img, &geometry, Some(filter))
    }
}
