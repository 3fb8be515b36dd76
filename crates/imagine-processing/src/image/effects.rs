//! Artistic effects and distortions

use super::filters::blur_sigma;
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use imageproc::edges::canny;
use imageproc::filter::median_filter;
use std::f32::consts::PI;

/// Largest median window radius used by `paint`
const MAX_PAINT_RADIUS: u32 = 16;

const EMBOSS_KERNEL: [f32; 9] = [-2.0, -1.0, 0.0, -1.0, 1.0, 1.0, 0.0, 1.0, 2.0];

pub struct ImageEffects;

impl ImageEffects {
    /// Charcoal sketch: blurred edge map drawn dark on white
    pub fn charcoal(img: DynamicImage, factor: u32) -> DynamicImage {
        let mut gray = img.to_luma8();
        if factor > 0 {
            gray = imageops::blur(&gray, blur_sigma(factor as f32 / 2.0));
        }
        let mut edges = canny(&gray, 10.0, 40.0);
        imageops::invert(&mut edges);
        DynamicImage::ImageLuma8(edges)
    }

    /// Grayscale relief from a directional 3x3 kernel
    pub fn emboss(img: DynamicImage, radius: u32) -> DynamicImage {
        let gray = DynamicImage::ImageLuma8(img.to_luma8());
        let softened = if radius > 0 {
            gray.blur(blur_sigma(radius as f32 / 2.0))
        } else {
            gray
        };
        softened.filter3x3(&EMBOSS_KERNEL)
    }

    /// Remove speckle noise with a 3x3 median
    pub fn enhance(img: DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgba8(median_filter(&img.to_rgba8(), 1, 1))
    }

    /// Oil-paint look from a wide median window
    pub fn paint(img: DynamicImage, radius: u32) -> DynamicImage {
        let radius = radius.min(MAX_PAINT_RADIUS);
        if radius == 0 {
            return img;
        }
        DynamicImage::ImageRgba8(median_filter(&img.to_rgba8(), radius, radius))
    }

    /// Pull pixels toward the centre; `factor` is the implode amount
    pub fn implode(img: DynamicImage, factor: u32) -> DynamicImage {
        if factor == 0 {
            return img;
        }
        let amount = factor as f32;
        Self::warp(img, |distance, dx, dy| {
            let scale = (PI * distance / 2.0).sin().powf(-amount);
            (dx * scale, dy * scale)
        })
    }

    /// Twist pixels around the centre by up to `degrees`
    pub fn swirl(img: DynamicImage, degrees: u32) -> DynamicImage {
        if degrees == 0 {
            return img;
        }
        let angle = (degrees as f32).to_radians();
        Self::warp(img, |distance, dx, dy| {
            let falloff = 1.0 - distance;
            let theta = angle * falloff * falloff;
            let (sin, cos) = theta.sin_cos();
            (dx * cos - dy * sin, dx * sin + dy * cos)
        })
    }

    /// Resample pixels inside the inscribed circle through `map`.
    ///
    /// `map` receives the normalised distance from the centre (0..1) and the
    /// pixel offset from the centre, and returns the offset to sample from.
    fn warp<F>(img: DynamicImage, map: F) -> DynamicImage
    where
        F: Fn(f32, f32, f32) -> (f32, f32),
    {
        let source = img.to_rgba8();
        let (width, height) = source.dimensions();
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        let radius = cx.min(cy);
        if radius < 1.0 {
            return img;
        }

        let warped = RgbaImage::from_fn(width, height, |x, y| {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let distance = (dx * dx + dy * dy).sqrt() / radius;
            if distance >= 1.0 || distance <= f32::EPSILON {
                return *source.get_pixel(x, y);
            }
            let (sx, sy) = map(distance, dx, dy);
            sample(&source, cx + sx, cy + sy)
        });
        DynamicImage::ImageRgba8(warped)
    }
}

fn sample(source: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let max_x = source.width().saturating_sub(1) as f32;
    let max_y = source.height().saturating_sub(1) as f32;
    let x = x.floor().clamp(0.0, max_x) as u32;
    let y = y.floor().clamp(0.0, max_y) as u32;
    *source.get_pixel(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn checker(size: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(size, size, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        }))
    }

    #[test]
    fn test_charcoal_is_grayscale() {
        let sketch = ImageEffects::charcoal(checker(32), 1);
        assert!(matches!(sketch, DynamicImage::ImageLuma8(_)));
        assert_eq!(sketch.dimensions(), (32, 32));
    }

    #[test]
    fn test_emboss_and_median_filters_keep_size() {
        assert_eq!(ImageEffects::emboss(checker(16), 2).dimensions(), (16, 16));
        assert_eq!(ImageEffects::enhance(checker(16)).dimensions(), (16, 16));
        assert_eq!(ImageEffects::paint(checker(16), 3).dimensions(), (16, 16));
    }

    #[test]
    fn test_huge_blur_factors_are_clamped() {
        let sketch = ImageEffects::charcoal(checker(8), u32::MAX);
        assert_eq!(sketch.dimensions(), (8, 8));
        assert_eq!(ImageEffects::emboss(checker(8), u32::MAX).dimensions(), (8, 8));
    }

    #[test]
    fn test_enhance_removes_isolated_pixel() {
        let mut base = RgbaImage::from_pixel(5, 5, Rgba([255, 255, 255, 255]));
        base.put_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let enhanced = ImageEffects::enhance(DynamicImage::ImageRgba8(base)).to_rgba8();
        assert_eq!(enhanced.get_pixel(2, 2), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_distortions_change_pixels_but_not_size() {
        let img = checker(32);
        let swirled = ImageEffects::swirl(img.clone(), 90);
        let imploded = ImageEffects::implode(img.clone(), 1);
        assert_eq!(swirled.dimensions(), (32, 32));
        assert_eq!(imploded.dimensions(), (32, 32));
        assert_ne!(swirled.to_rgba8(), img.to_rgba8());
        assert_ne!(imploded.to_rgba8(), img.to_rgba8());
    }

    #[test]
    fn test_zero_amount_is_identity() {
        let img = checker(8);
        assert_eq!(ImageEffects::swirl(img.clone(), 0).to_rgba8(), img.to_rgba8());
        assert_eq!(ImageEffects::implode(img.clone(), 0).to_rgba8(), img.to_rgba8());
        assert_eq!(ImageEffects::paint(img.clone(), 0).to_rgba8(), img.to_rgba8());
    }
}
