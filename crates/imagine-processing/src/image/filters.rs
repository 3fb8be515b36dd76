use image::imageops::{self, BiLevel, ColorMap};
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::contrast::equalize_histogram;
use imagine_core::BackendError;

/// Largest Gaussian sigma any blur runs with
pub(crate) const MAX_BLUR_SIGMA: f32 = 64.0;

/// Clamp a requested sigma to `MAX_BLUR_SIGMA`.
pub(crate) fn blur_sigma(sigma: f32) -> f32 {
    sigma.min(MAX_BLUR_SIGMA)
}

/// Tone and colour filters
pub struct ImageFilters;

impl ImageFilters {
    /// Gaussian blur where `radius` bounds the kernel; sigma is half of it
    pub fn apply_blur(img: DynamicImage, radius: u32) -> DynamicImage {
        if radius == 0 {
            return img;
        }
        img.blur(blur_sigma(radius as f32 / 2.0))
    }

    /// Gaussian blur with an explicit sigma; a zero sigma is derived from `radius`
    pub fn apply_gaussian(img: DynamicImage, radius: u32, sigma: u32) -> DynamicImage {
        match sigma {
            0 => Self::apply_blur(img, radius),
            sigma => img.blur(blur_sigma(sigma as f32)),
        }
    }

    /// Increase (positive) or decrease (negative) contrast
    pub fn adjust_contrast(img: DynamicImage, multiplier: i32) -> DynamicImage {
        if multiplier == 0 {
            return img;
        }
        img.adjust_contrast(multiplier as f32 * 10.0)
    }

    /// Histogram-equalise each colour channel
    pub fn equalize(img: DynamicImage) -> DynamicImage {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let channels: Vec<GrayImage> = (0..3)
            .map(|channel| {
                let plane = GrayImage::from_fn(width, height, |x, y| {
                    Luma([rgba.get_pixel(x, y)[channel]])
                });
                equalize_histogram(&plane)
            })
            .collect();

        let equalized = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([
                channels[0].get_pixel(x, y)[0],
                channels[1].get_pixel(x, y)[0],
                channels[2].get_pixel(x, y)[0],
                rgba.get_pixel(x, y)[3],
            ])
        });
        DynamicImage::ImageRgba8(equalized)
    }

    /// Stretch the colour range so the darkest value becomes 0 and the lightest 255
    pub fn normalize(img: DynamicImage) -> DynamicImage {
        let mut rgba = img.to_rgba8();
        let (low, high) = rgba
            .pixels()
            .flat_map(|pixel| pixel.0[..3].to_vec())
            .fold((u8::MAX, u8::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));

        if high <= low {
            return DynamicImage::ImageRgba8(rgba);
        }

        let range = (high - low) as f32;
        for pixel in rgba.pixels_mut() {
            for channel in 0..3 {
                let value = (pixel[channel] - low) as f32;
                pixel[channel] = (value * 255.0 / range).round() as u8;
            }
        }
        DynamicImage::ImageRgba8(rgba)
    }

    /// Invert colour channels, keeping alpha
    pub fn apply_invert(mut img: DynamicImage) -> DynamicImage {
        img.invert();
        img
    }

    /// Invert every colour channel above `percent` of full intensity
    pub fn solarize(img: DynamicImage, percent: u32) -> DynamicImage {
        let threshold = percent_of_max(percent);
        let mut rgba = img.to_rgba8();
        for pixel in rgba.pixels_mut() {
            for channel in 0..3 {
                if pixel[channel] > threshold {
                    pixel[channel] = u8::MAX - pixel[channel];
                }
            }
        }
        DynamicImage::ImageRgba8(rgba)
    }

    /// Black where luminance is at or below `percent`, white above it
    pub fn threshold(img: DynamicImage, percent: u32) -> DynamicImage {
        let threshold = percent_of_max(percent);
        let luma = img.to_luma_alpha8();
        let mut rgba = RgbaImage::new(luma.width(), luma.height());
        for (x, y, pixel) in luma.enumerate_pixels() {
            let value = if pixel[0] > threshold { u8::MAX } else { 0 };
            rgba.put_pixel(x, y, Rgba([value, value, value, pixel[1]]));
        }
        DynamicImage::ImageRgba8(rgba)
    }

    /// Reduce to two colours, with error diffusion when `dither` is set
    pub fn monochrome(img: DynamicImage, dither: bool) -> DynamicImage {
        let mut luma = img.to_luma8();
        if dither {
            imageops::dither(&mut luma, &BiLevel);
        } else {
            for pixel in luma.pixels_mut() {
                BiLevel.map_color(pixel);
            }
        }
        DynamicImage::ImageLuma8(luma)
    }

    /// Reduce to at most `count` colours by posterising each channel
    pub fn reduce_colors(img: DynamicImage, count: u32, dither: bool) -> DynamicImage {
        let palette = Posterize::for_color_count(count);
        let mut rgba = img.to_rgba8();
        if dither {
            imageops::dither(&mut rgba, &palette);
        } else {
            for pixel in rgba.pixels_mut() {
                palette.map_color(pixel);
            }
        }
        DynamicImage::ImageRgba8(rgba)
    }

    /// Convert to a named colourspace
    pub fn colorspace(img: DynamicImage, name: &str) -> Result<DynamicImage, BackendError> {
        match name.to_lowercase().as_str() {
            "gray" | "grey" => Ok(DynamicImage::ImageLumaA8(img.to_luma_alpha8())),
            "rgb" | "srgb" | "transparent" => Ok(img),
            _ => Err(BackendError::UnsupportedValue {
                setting: "colorspace",
                value: name.to_string(),
            }),
        }
    }

    /// Scale opacity to `percent` of its current value
    pub fn dissolve(img: DynamicImage, percent: u32) -> DynamicImage {
        let factor = percent.min(100) as f32 / 100.0;
        let mut rgba = img.to_rgba8();
        for pixel in rgba.pixels_mut() {
            pixel[3] = (pixel[3] as f32 * factor).round() as u8;
        }
        DynamicImage::ImageRgba8(rgba)
    }

    /// Flatten transparency onto a black backdrop
    pub fn backdrop(img: DynamicImage) -> DynamicImage {
        let rgba = img.to_rgba8();
        let black = Rgba([0, 0, 0, 255]);
        let mut flattened = RgbaImage::from_pixel(rgba.width(), rgba.height(), black);
        imageops::overlay(&mut flattened, &rgba, 0, 0);
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(flattened).to_rgb8())
    }
}

fn percent_of_max(percent: u32) -> u8 {
    (percent.min(100) * u8::MAX as u32 / 100) as u8
}

/// Uniform per-channel palette for colour reduction
#[derive(Debug, Clone, Copy)]
struct Posterize {
    levels: u32,
}

impl Posterize {
    /// Levels per channel so that `levels³` does not exceed `count`
    fn for_color_count(count: u32) -> Self {
        let mut levels = 2;
        while (levels + 1) * (levels + 1) * (levels + 1) <= count && levels < 256 {
            levels += 1;
        }
        Self { levels }
    }

    fn quantize(&self, value: u8) -> u8 {
        let step = 255.0 / (self.levels - 1) as f32;
        ((value as f32 / step).round() * step).round() as u8
    }
}

impl ColorMap for Posterize {
    type Color = Rgba<u8>;

    fn index_of(&self, color: &Rgba<u8>) -> usize {
        let index = |v: u8| (self.quantize(v) as u32 * (self.levels - 1) / 255) as usize;
        let levels = self.levels as usize;
        (index(color[0]) * levels + index(color[1])) * levels + index(color[2])
    }

    fn map_color(&self, color: &mut Rgba<u8>) {
        for channel in 0..3 {
            color[channel] = self.quantize(color[channel]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use std::collections::HashSet;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 255 / width) as u8, (y * 255 / height) as u8, 100, 255])
        }))
    }

    #[test]
    fn test_huge_blur_is_clamped() {
        assert_eq!(blur_sigma(2_000_000_000.0), MAX_BLUR_SIGMA);
        assert_eq!(blur_sigma(1.5), 1.5);

        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 4, Rgba([9, 9, 9, 255])));
        let blurred = ImageFilters::apply_blur(img.clone(), u32::MAX);
        assert_eq!(blurred.dimensions(), (6, 4));
        let blurred = ImageFilters::apply_gaussian(img, 0, u32::MAX);
        assert_eq!(blurred.dimensions(), (6, 4));
    }

    #[test]
    fn test_blur_keeps_dimensions() {
        let img = gradient(20, 10);
        assert_eq!(ImageFilters::apply_blur(img.clone(), 4).dimensions(), (20, 10));
        assert_eq!(ImageFilters::apply_gaussian(img, 0, 2).dimensions(), (20, 10));
    }

    #[test]
    fn test_invert() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 40])));
        let inverted = ImageFilters::apply_invert(img).to_rgba8();
        assert_eq!(inverted.get_pixel(0, 0), &Rgba([245, 235, 225, 40]));
    }

    #[test]
    fn test_threshold_is_binary() {
        let thresholded = ImageFilters::threshold(gradient(16, 16), 50).to_rgba8();
        assert!(thresholded
            .pixels()
            .all(|p| (p[0] == 0 || p[0] == 255) && p[0] == p[1] && p[1] == p[2]));
    }

    #[test]
    fn test_solarize() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([200, 50, 128, 255])));
        let solarized = ImageFilters::solarize(img, 50).to_rgba8();
        assert_eq!(solarized.get_pixel(0, 0), &Rgba([55, 50, 127, 255]));
    }

    #[test]
    fn test_monochrome_has_two_levels() {
        for dither in [true, false] {
            let mono = ImageFilters::monochrome(gradient(16, 16), dither).to_luma8();
            assert!(mono.pixels().all(|p| p[0] == 0 || p[0] == 255));
        }
    }

    #[test]
    fn test_reduce_colors() {
        let reduced = ImageFilters::reduce_colors(gradient(32, 32), 8, false).to_rgba8();
        let distinct: HashSet<[u8; 4]> = reduced.pixels().map(|p| p.0).collect();
        assert!(distinct.len() <= 8);
    }

    #[test]
    fn test_normalize_stretches_range() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([100, 100, 100, 255])
            } else {
                Rgba([150, 150, 150, 255])
            }
        }));
        let normalized = ImageFilters::normalize(img).to_rgba8();
        assert_eq!(normalized.get_pixel(0, 0)[0], 0);
        assert_eq!(normalized.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn test_colorspace() {
        let gray = ImageFilters::colorspace(gradient(4, 4), "Gray").unwrap();
        assert!(matches!(gray, DynamicImage::ImageLumaA8(_)));
        assert!(ImageFilters::colorspace(gradient(4, 4), "sRGB").is_ok());
        assert!(ImageFilters::colorspace(gradient(4, 4), "CMYK").is_err());
    }

    #[test]
    fn test_dissolve_and_backdrop() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 255])));
        let dissolved = ImageFilters::dissolve(img, 50);
        assert_eq!(dissolved.to_rgba8().get_pixel(0, 0)[3], 128);

        let flattened = ImageFilters::backdrop(dissolved).to_rgb8();
        assert_eq!(flattened.get_pixel(0, 0).0, [100, 50, 25]);
    }

    #[test]
    fn test_equalize_keeps_alpha() {
        let equalized = ImageFilters::equalize(gradient(8, 8)).to_rgba8();
        assert!(equalized.pixels().all(|p| p[3] == 255));
    }
}
