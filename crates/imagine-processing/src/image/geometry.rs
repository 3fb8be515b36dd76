//! Canvas geometry: cropping, chopping, padding, borders and frames

use super::filters::{blur_sigma, MAX_BLUR_SIGMA};
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use imagine_core::{BackendError, Dimensions, FrameGeometry, Geometry, Gravity};

/// Light and dark shades used for bevels, as alpha blend factors
const HIGHLIGHT: f32 = 0.45;
const SHADOW: f32 = 0.45;

/// Geometry operations anchored by gravity
pub struct ImageGeometry;

impl ImageGeometry {
    /// Clip `region` (anchored by `gravity`) against the image bounds.
    ///
    /// A zero width or height selects the full image extent on that axis.
    /// Returns `(x, y, width, height)` or `None` when nothing overlaps.
    fn clip(
        img: &DynamicImage,
        region: Geometry,
        gravity: Gravity,
    ) -> Option<(u32, u32, u32, u32)> {
        let (width, height) = img.dimensions();
        let w = if region.width == 0 { width } else { region.width };
        let h = if region.height == 0 { height } else { region.height };

        let (ax, ay) = gravity.anchor((width, height), (w, h), (region.x, region.y));
        let x0 = ax.max(0);
        let y0 = ay.max(0);
        let x1 = (ax + w as i64).min(width as i64);
        let y1 = (ay + h as i64).min(height as i64);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    /// Keep only `region` of the image
    pub fn crop(
        img: &DynamicImage,
        region: Geometry,
        gravity: Gravity,
    ) -> Result<DynamicImage, BackendError> {
        let (x, y, w, h) =
            Self::clip(img, region, gravity).ok_or_else(|| BackendError::UnsupportedValue {
                setting: "crop",
                value: region.to_string(),
            })?;
        Ok(img.crop_imm(x, y, w, h))
    }

    /// Remove the rows and columns covered by `region`
    pub fn chop(img: &DynamicImage, region: Geometry, gravity: Gravity) -> DynamicImage {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let columns = region.width.min(width);
        let rows = region.height.min(height);

        let full = Geometry::new(
            if columns == 0 { width } else { columns },
            if rows == 0 { height } else { rows },
            region.x,
            region.y,
        );
        let Some((x, y, w, h)) = Self::clip(img, full, gravity) else {
            return img.clone();
        };
        let cut_x = if columns == 0 { 0..0 } else { x..x + w };
        let cut_y = if rows == 0 { 0..0 } else { y..y + h };

        let new_width = width - cut_x.len() as u32;
        let new_height = height - cut_y.len() as u32;
        if new_width == 0 || new_height == 0 {
            return img.clone();
        }

        let mut chopped = RgbaImage::new(new_width, new_height);
        let mut dy = 0;
        for sy in (0..height).filter(|row| !cut_y.contains(row)) {
            let mut dx = 0;
            for sx in (0..width).filter(|col| !cut_x.contains(col)) {
                chopped.put_pixel(dx, dy, *rgba.get_pixel(sx, sy));
                dx += 1;
            }
            dy += 1;
        }

        DynamicImage::ImageRgba8(chopped)
    }

    /// Canvas size of `extent`: zero sides keep the image's size.
    pub fn extent_size((width, height): (u32, u32), size: Dimensions) -> (u32, u32) {
        (
            if size.width == 0 { width } else { size.width },
            if size.height == 0 { height } else { size.height },
        )
    }

    /// Canvas size of `border`.
    pub fn border_size(
        dimensions: (u32, u32),
        size: Dimensions,
    ) -> Result<(u32, u32), BackendError> {
        grow("border", dimensions, (size.width, size.height), 2)
    }

    /// Canvas size of `frame`.
    pub fn frame_size(
        dimensions: (u32, u32),
        frame: FrameGeometry,
    ) -> Result<(u32, u32), BackendError> {
        grow("frame", dimensions, (frame.width, frame.height), 2)
    }

    /// Canvas size of `shadow`.
    pub fn shadow_size(dimensions: (u32, u32), sigma: u32) -> Result<(u32, u32), BackendError> {
        let step = shadow_step(sigma);
        grow("shadow", dimensions, (step, step), 3)
    }

    /// Place the image on a `size` canvas filled with `fill`
    pub fn extent(
        img: &DynamicImage,
        size: Dimensions,
        gravity: Gravity,
        fill: Rgba<u8>,
    ) -> DynamicImage {
        let (width, height) = img.dimensions();
        let (w, h) = Self::extent_size((width, height), size);

        let mut canvas = RgbaImage::from_pixel(w, h, fill);
        let (x, y) = gravity.anchor((w, h), (width, height), (0, 0));
        imageops::overlay(&mut canvas, &img.to_rgba8(), x, y);
        DynamicImage::ImageRgba8(canvas)
    }

    /// Surround the image with `size` pixels of `color`
    pub fn border(
        img: &DynamicImage,
        size: Dimensions,
        color: Rgba<u8>,
    ) -> Result<DynamicImage, BackendError> {
        let (canvas_w, canvas_h) = Self::border_size(img.dimensions(), size)?;
        let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, color);
        imageops::overlay(
            &mut canvas,
            &img.to_rgba8(),
            size.width as i64,
            size.height as i64,
        );
        Ok(DynamicImage::ImageRgba8(canvas))
    }

    /// Surround the image with a bevelled `matte` frame
    pub fn frame(
        img: &DynamicImage,
        frame: FrameGeometry,
        matte: Rgba<u8>,
    ) -> Result<DynamicImage, BackendError> {
        let (width, height) = img.dimensions();
        let (canvas_w, canvas_h) = Self::frame_size((width, height), frame)?;
        let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, matte);

        // Outer bevel is raised
        shade(
            &mut canvas,
            (0, 0, canvas_w, canvas_h),
            (frame.outer_bevel, frame.outer_bevel),
            true,
        );

        // Inner bevel is sunken, directly around the picture
        let inner = frame.inner_bevel;
        let (ix, iy) = (
            frame.width.saturating_sub(inner),
            frame.height.saturating_sub(inner),
        );
        shade(
            &mut canvas,
            (ix, iy, canvas_w - 2 * ix, canvas_h - 2 * iy),
            (inner, inner),
            false,
        );

        imageops::overlay(
            &mut canvas,
            &img.to_rgba8(),
            frame.width as i64,
            frame.height as i64,
        );
        Ok(DynamicImage::ImageRgba8(canvas))
    }

    /// Darken the top and left edges and lighten the bottom and right ones
    pub fn lower(img: &DynamicImage, size: Dimensions) -> DynamicImage {
        let mut rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        shade(&mut rgba, (0, 0, width, height), (size.width, size.height), false);
        DynamicImage::ImageRgba8(rgba)
    }

    /// Remove edges that match the top-left pixel
    pub fn trim(img: &DynamicImage) -> DynamicImage {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return img.clone();
        }
        let background = *rgba.get_pixel(0, 0);

        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in rgba.enumerate_pixels() {
            if *pixel == background {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }

        match bounds {
            Some((x0, y0, x1, y1)) => img.crop_imm(x0, y0, x1 - x0 + 1, y1 - y0 + 1),
            None => img.clone(),
        }
    }

    /// Drop a blurred `color` shadow behind the image.
    ///
    /// The canvas grows by three sigmas on each axis; the shadow is offset
    /// one sigma down and to the right of the picture.
    pub fn shadow(
        img: &DynamicImage,
        opacity: u32,
        sigma: u32,
        color: Rgba<u8>,
    ) -> Result<DynamicImage, BackendError> {
        let rgba = img.to_rgba8();
        let (canvas_w, canvas_h) = Self::shadow_size(rgba.dimensions(), sigma)?;
        let step = shadow_step(sigma);
        let opacity = opacity.min(100) as f32 / 100.0;

        let mut silhouette = RgbaImage::new(canvas_w, canvas_h);
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let alpha = (pixel[3] as f32 * opacity * color[3] as f32 / 255.0).round() as u8;
            silhouette.put_pixel(
                x + 2 * step,
                y + 2 * step,
                Rgba([color[0], color[1], color[2], alpha]),
            );
        }

        let mut canvas = if sigma > 0 {
            imageops::blur(&silhouette, blur_sigma(sigma as f32))
        } else {
            silhouette
        };
        imageops::overlay(&mut canvas, &rgba, step as i64, step as i64);
        Ok(DynamicImage::ImageRgba8(canvas))
    }
}

/// Shadow offset unit: the clamped sigma, at least one pixel.
fn shadow_step(sigma: u32) -> u32 {
    sigma.clamp(1, MAX_BLUR_SIGMA as u32)
}

/// Grow each side by `sides` times its padding, failing on `u32` overflow.
fn grow(
    setting: &'static str,
    (width, height): (u32, u32),
    (pad_x, pad_y): (u32, u32),
    sides: u32,
) -> Result<(u32, u32), BackendError> {
    let side = |length: u32, pad: u32| pad.checked_mul(sides)?.checked_add(length);
    match (side(width, pad_x), side(height, pad_y)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(BackendError::UnsupportedValue {
            setting,
            value: format!("{}x{}", pad_x, pad_y),
        }),
    }
}

/// Lighten or darken the edge bands of the rectangle `(x, y, w, h)`.
///
/// `raised` puts the highlight on the top/left bands; otherwise on the
/// bottom/right ones.
fn shade(canvas: &mut RgbaImage, rect: (u32, u32, u32, u32), band: (u32, u32), raised: bool) {
    let (rx, ry, rw, rh) = rect;
    let (bx, by) = (band.0.min(rw / 2), band.1.min(rh / 2));
    if bx == 0 && by == 0 {
        return;
    }

    for y in ry..(ry + rh).min(canvas.height()) {
        for x in rx..(rx + rw).min(canvas.width()) {
            let (lx, ly) = (x - rx, y - ry);
            let top_left = lx < bx || ly < by;
            let bottom_right = lx >= rw - bx || ly >= rh - by;
            if !top_left && !bottom_right {
                continue;
            }

            let light = if top_left && bottom_right {
                // Corners: split along the diagonal
                (lx as i64 * rh as i64) < ((rh - ly) as i64 * rw as i64)
            } else {
                top_left
            } == raised;

            let pixel = canvas.get_pixel_mut(x, y);
            for channel in 0..3 {
                let value = pixel[channel] as f32;
                pixel[channel] = if light {
                    (value + (255.0 - value) * HIGHLIGHT).round() as u8
                } else {
                    (value * (1.0 - SHADOW)).round() as u8
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    #[test]
    fn test_crop_with_gravity() {
        let mut base = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        base.put_pixel(9, 9, Rgba([255, 0, 0, 255]));
        let img = DynamicImage::ImageRgba8(base);

        let cropped =
            ImageGeometry::crop(&img, Geometry::new(2, 2, 0, 0), Gravity::SouthEast).unwrap();
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(cropped.to_rgba8().get_pixel(1, 1), &Rgba([255, 0, 0, 255]));

        let cropped =
            ImageGeometry::crop(&img, Geometry::new(4, 4, 8, 8), Gravity::NorthWest).unwrap();
        assert_eq!(cropped.dimensions(), (2, 2));
    }

    #[test]
    fn test_crop_outside_image_fails() {
        let img = solid(10, 10, [0, 0, 0, 255]);
        let outside = Geometry::new(5, 5, 20, 20);
        assert!(ImageGeometry::crop(&img, outside, Gravity::NorthWest).is_err());
    }

    #[test]
    fn test_chop_removes_rows_and_columns() {
        let img = solid(10, 8, [0, 0, 0, 255]);
        let chopped = ImageGeometry::chop(&img, Geometry::new(2, 0, 0, 0), Gravity::NorthWest);
        assert_eq!(chopped.dimensions(), (8, 8));

        let chopped = ImageGeometry::chop(&img, Geometry::new(3, 2, 1, 1), Gravity::NorthWest);
        assert_eq!(chopped.dimensions(), (7, 6));
    }

    #[test]
    fn test_extent_pads_with_fill() {
        let img = solid(2, 2, [0, 0, 0, 255]);
        let white = Rgba([255, 255, 255, 255]);
        let extended = ImageGeometry::extent(&img, Dimensions::new(6, 4), Gravity::Center, white);
        let rgba = extended.to_rgba8();
        assert_eq!(rgba.dimensions(), (6, 4));
        assert_eq!(rgba.get_pixel(0, 0), &white);
        assert_eq!(rgba.get_pixel(2, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_border() {
        let img = solid(4, 4, [0, 0, 0, 255]);
        let red = Rgba([255, 0, 0, 255]);
        let bordered = ImageGeometry::border(&img, Dimensions::new(2, 1), red)
            .unwrap()
            .to_rgba8();
        assert_eq!(bordered.dimensions(), (8, 6));
        assert_eq!(bordered.get_pixel(0, 0), &red);
        assert_eq!(bordered.get_pixel(2, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_frame_grows_canvas() {
        let img = solid(10, 10, [0, 0, 0, 255]);
        let framed = ImageGeometry::frame(
            &img,
            FrameGeometry {
                width: 5,
                height: 5,
                outer_bevel: 2,
                inner_bevel: 2,
            },
            Rgba([128, 128, 128, 255]),
        )
        .unwrap();
        let rgba = framed.to_rgba8();
        assert_eq!(rgba.dimensions(), (20, 20));
        // Raised outer bevel: top-left lighter than bottom-right
        assert!(rgba.get_pixel(0, 10)[0] > rgba.get_pixel(19, 10)[0]);
        assert_eq!(rgba.get_pixel(10, 10), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_lower_darkens_top_left() {
        let img = solid(10, 10, [128, 128, 128, 255]);
        let lowered = ImageGeometry::lower(&img, Dimensions::new(2, 2)).to_rgba8();
        assert!(lowered.get_pixel(0, 5)[0] < 128);
        assert!(lowered.get_pixel(9, 5)[0] > 128);
        assert_eq!(lowered.get_pixel(5, 5)[0], 128);
    }

    #[test]
    fn test_trim() {
        let mut base = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        for x in 3..6 {
            for y in 2..4 {
                base.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let trimmed = ImageGeometry::trim(&DynamicImage::ImageRgba8(base));
        assert_eq!(trimmed.dimensions(), (3, 2));

        let plain = solid(4, 4, [1, 2, 3, 255]);
        assert_eq!(ImageGeometry::trim(&plain).dimensions(), (4, 4));
    }

    #[test]
    fn test_shadow() {
        let img = solid(10, 10, [255, 0, 0, 255]);
        let shadowed = ImageGeometry::shadow(&img, 80, 2, Rgba([0, 0, 0, 255]))
            .unwrap()
            .to_rgba8();
        assert_eq!(shadowed.dimensions(), (16, 16));
        assert!(shadowed.get_pixel(0, 0)[3] < 16);
        assert_eq!(shadowed.get_pixel(5, 5), &Rgba([255, 0, 0, 255]));
        assert!(shadowed.get_pixel(13, 13)[3] > 0);
    }

    #[test]
    fn test_overflowing_padding_is_rejected() {
        let img = solid(4, 4, [0, 0, 0, 255]);
        let black = Rgba([0, 0, 0, 255]);

        let err = ImageGeometry::border(&img, Dimensions::new(u32::MAX, 1), black).unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedValue { setting: "border", .. }));

        let frame = FrameGeometry {
            width: 1,
            height: u32::MAX / 2,
            outer_bevel: 0,
            inner_bevel: 0,
        };
        let err = ImageGeometry::frame(&img, frame, black).unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedValue { setting: "frame", .. }));

        assert!(ImageGeometry::border_size((u32::MAX - 1, 1), Dimensions::new(1, 0)).is_err());
        assert!(ImageGeometry::shadow_size((u32::MAX - 10, 4), 8).is_err());
    }

    #[test]
    fn test_shadow_offset_is_clamped() {
        let img = solid(4, 4, [255, 0, 0, 255]);
        let step = MAX_BLUR_SIGMA as u32;
        assert_eq!(
            ImageGeometry::shadow_size((4, 4), u32::MAX).unwrap(),
            (4 + 3 * step, 4 + 3 * step)
        );
        let shadowed = ImageGeometry::shadow(&img, 50, u32::MAX, Rgba([0, 0, 0, 255])).unwrap();
        assert_eq!(shadowed.dimensions(), (4 + 3 * step, 4 + 3 * step));
    }
}
