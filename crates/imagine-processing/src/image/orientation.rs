use image::{imageops, DynamicImage, Rgba};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use std::io::Cursor;

/// Image orientation operations (rotation and flipping)
pub struct ImageOrientation;

impl ImageOrientation {
    /// Rotate the pixels so the EXIF orientation of `data` becomes "normal"
    pub fn apply_exif_orientation(mut img: DynamicImage, data: &[u8]) -> DynamicImage {
        let orientation = Self::read_exif_orientation(data);
        let (rotate, flip_h, flip_v) = Self::get_orientation_transforms(orientation);

        tracing::debug!(
            orientation = orientation,
            rotate = ?rotate,
            flip_horizontal = flip_h,
            flip_vertical = flip_v,
            "Applying EXIF orientation"
        );

        // Flip first: orientations 5 and 7 are transpose/transverse
        if flip_h {
            img = Self::apply_flip_horizontal(img);
        }
        if flip_v {
            img = Self::apply_flip_vertical(img);
        }
        if let Some(angle) = rotate {
            img = Self::rotate_by_angle(img, angle);
        }

        img
    }

    /// Read the EXIF orientation tag (1-8). Returns 1 when absent or unreadable.
    pub fn read_exif_orientation(data: &[u8]) -> u8 {
        let mut cursor = Cursor::new(data);
        let Ok(exif) = exif::Reader::new().read_from_container(&mut cursor) else {
            return 1;
        };

        exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .and_then(|value| u8::try_from(value).ok())
            .filter(|value| (1..=8).contains(value))
            .unwrap_or(1)
    }

    /// Get rotation and flip operations needed for a given EXIF orientation
    /// Returns (rotate_angle, flip_horizontal, flip_vertical)
    pub fn get_orientation_transforms(orientation: u8) -> (Option<u16>, bool, bool) {
        match orientation {
            1 => (None, false, false),      // Normal
            2 => (None, true, false),       // Mirror horizontal
            3 => (Some(180), false, false), // Rotate 180
            4 => (None, false, true),       // Mirror vertical
            5 => (Some(270), true, false),  // Mirror horizontal + Rotate 270 CW
            6 => (Some(90), false, false),  // Rotate 90 CW
            7 => (Some(90), true, false),   // Mirror horizontal + Rotate 90 CW
            8 => (Some(270), false, false), // Rotate 270 CW
            _ => (None, false, false),
        }
    }

    /// Rotate image by specified angle (90, 180, or 270 degrees clockwise)
    pub fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
        match angle {
            90 => img.rotate90(),
            180 => img.rotate180(),
            270 => img.rotate270(),
            _ => img,
        }
    }

    /// Bounding box of a `width` x `height` image rotated by `degrees`.
    pub fn rotated_size((width, height): (u32, u32), degrees: i32) -> (u32, u32) {
        let degrees = degrees.rem_euclid(360);
        if degrees % 180 == 0 {
            return (width, height);
        }
        if degrees % 90 == 0 {
            return (height, width);
        }

        let theta = (degrees as f64).to_radians();
        let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
        let (w, h) = (width as f64, height as f64);
        (
            (w * cos + h * sin).ceil() as u32,
            (w * sin + h * cos).ceil() as u32,
        )
    }

    /// Rotate clockwise by any number of degrees.
    ///
    /// Right angles are lossless. Other angles resize the canvas to the
    /// rotated bounding box and fill the uncovered corners with `background`.
    pub fn rotate(
        img: DynamicImage,
        degrees: i32,
        background: Rgba<u8>,
        antialias: bool,
    ) -> DynamicImage {
        let degrees = degrees.rem_euclid(360);
        if degrees % 90 == 0 {
            return Self::rotate_by_angle(img, degrees as u16);
        }

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let (new_width, new_height) = Self::rotated_size((width, height), degrees);

        // Large enough for both the source and the rotated box
        let (canvas_w, canvas_h) = (width.max(new_width), height.max(new_height));
        let mut canvas = image::RgbaImage::from_pixel(canvas_w, canvas_h, background);
        imageops::overlay(
            &mut canvas,
            &rgba,
            ((canvas_w - width) / 2) as i64,
            ((canvas_h - height) / 2) as i64,
        );

        let interpolation = if antialias {
            Interpolation::Bilinear
        } else {
            Interpolation::Nearest
        };
        let theta = (degrees as f32).to_radians();
        let rotated = rotate_about_center(&canvas, theta, interpolation, background);

        let cropped = imageops::crop_imm(
            &rotated,
            (canvas_w - new_width) / 2,
            (canvas_h - new_height) / 2,
            new_width,
            new_height,
        )
        .to_image();
        DynamicImage::ImageRgba8(cropped)
    }

    /// Apply horizontal flip (mirror)
    pub fn apply_flip_horizontal(img: DynamicImage) -> DynamicImage {
        img.fliph()
    }

    /// Apply vertical flip
    pub fn apply_flip_vertical(img: DynamicImage) -> DynamicImage {
        img.flipv()
    }
}
