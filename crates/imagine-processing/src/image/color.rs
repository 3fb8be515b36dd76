//! Colour tokens
//!
//! Accepts the forms that appear in operation paths: named colours,
//! `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, and `none`/`transparent`.

use image::Rgba;
use imagine_core::BackendError;

/// Parse a colour token into an RGBA pixel.
pub fn parse_color(token: &str) -> Result<Rgba<u8>, BackendError> {
    let token = token.trim();
    let invalid = || BackendError::InvalidColor(token.to_string());

    if let Some(hex) = token.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(invalid);
    }

    named(&token.to_lowercase()).ok_or_else(invalid)
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let short = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let long = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Rgba([short(0)?, short(1)?, short(2)?, 255])),
        4 => Some(Rgba([short(0)?, short(1)?, short(2)?, short(3)?])),
        6 => Some(Rgba([long(0)?, long(2)?, long(4)?, 255])),
        8 => Some(Rgba([long(0)?, long(2)?, long(4)?, long(6)?])),
        _ => None,
    }
}

fn named(name: &str) -> Option<Rgba<u8>> {
    let rgb = match name {
        "none" | "transparent" => return Some(Rgba([0, 0, 0, 0])),
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "lime" => [0, 255, 0],
        "blue" => [0, 0, 255],
        "yellow" => [255, 255, 0],
        "cyan" | "aqua" => [0, 255, 255],
        "magenta" | "fuchsia" => [255, 0, 255],
        "gray" | "grey" => [190, 190, 190],
        "silver" => [192, 192, 192],
        "maroon" => [128, 0, 0],
        "navy" => [0, 0, 128],
        "olive" => [128, 128, 0],
        "purple" => [128, 0, 128],
        "teal" => [0, 128, 128],
        "orange" => [255, 165, 0],
        "pink" => [255, 192, 203],
        "brown" => [165, 42, 42],
        _ => return None,
    };
    Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_colors() {
        assert_eq!(parse_color("red").unwrap(), Rgba([255, 0, 0, 255]));
        assert_eq!(parse_color("White").unwrap(), Rgba([255, 255, 255, 255]));
        assert_eq!(parse_color("none").unwrap(), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!(parse_color("#ff0000").unwrap(), Rgba([255, 0, 0, 255]));
        assert_eq!(parse_color("#0f0").unwrap(), Rgba([0, 255, 0, 255]));
        assert_eq!(parse_color("#00000080").unwrap(), Rgba([0, 0, 0, 128]));
    }

    #[test]
    fn test_invalid_colors() {
        assert!(matches!(
            parse_color("#12345"),
            Err(BackendError::InvalidColor(_))
        ));
        assert!(parse_color("notacolor").is_err());
        assert!(parse_color("#gggggg").is_err());
    }
}
