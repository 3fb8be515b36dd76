//! Typed operation arguments
//!
//! Argument tokens captured by the grammar are coerced into these types before
//! any capability on an image handle is invoked.

use std::fmt;

/// Compass direction used to anchor geometry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Gravity {
    /// Case-insensitive lookup. Unknown directions fall back to `NorthWest`.
    pub fn from_token(token: &str) -> Self {
        match token.to_lowercase().as_str() {
            "northwest" => Gravity::NorthWest,
            "north" => Gravity::North,
            "northeast" => Gravity::NorthEast,
            "west" => Gravity::West,
            "center" => Gravity::Center,
            "east" => Gravity::East,
            "southwest" => Gravity::SouthWest,
            "south" => Gravity::South,
            "southeast" => Gravity::SouthEast,
            _ => Gravity::default(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gravity::NorthWest => "NorthWest",
            Gravity::North => "North",
            Gravity::NorthEast => "NorthEast",
            Gravity::West => "West",
            Gravity::Center => "Center",
            Gravity::East => "East",
            Gravity::SouthWest => "SouthWest",
            Gravity::South => "South",
            Gravity::SouthEast => "SouthEast",
        }
    }

    /// Top-left position of an `inner` box anchored inside an `outer` box.
    ///
    /// Offsets move the box away from the anchored edge, the way geometry
    /// offsets behave under gravity in command-line image tools.
    pub fn anchor(self, outer: (u32, u32), inner: (u32, u32), offset: (u32, u32)) -> (i64, i64) {
        let free_x = outer.0 as i64 - inner.0 as i64;
        let free_y = outer.1 as i64 - inner.1 as i64;
        let (ox, oy) = (offset.0 as i64, offset.1 as i64);

        let x = match self {
            Gravity::NorthWest | Gravity::West | Gravity::SouthWest => ox,
            Gravity::North | Gravity::Center | Gravity::South => free_x / 2 + ox,
            Gravity::NorthEast | Gravity::East | Gravity::SouthEast => free_x - ox,
        };
        let y = match self {
            Gravity::NorthWest | Gravity::North | Gravity::NorthEast => oy,
            Gravity::West | Gravity::Center | Gravity::East => free_y / 2 + oy,
            Gravity::SouthWest | Gravity::South | Gravity::SouthEast => free_y - oy,
        };
        (x, y)
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_u32(part: &str, what: &str) -> Result<u32, String> {
    part.parse::<u32>()
        .map_err(|e| format!("invalid {}: {}", what, e))
}

/// A `WxH` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse dimensions from string format "WxH"
    pub fn parse(s: &str) -> Result<Self, String> {
        let (width, height) = s
            .split_once('x')
            .ok_or_else(|| "expected <width>x<height>".to_string())?;
        Ok(Self {
            width: parse_u32(width, "width")?,
            height: parse_u32(height, "height")?,
        })
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A `WxH+X+Y` region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32, x: u32, y: u32) -> Self {
        Self {
            width,
            height,
            x,
            y,
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        let (size, x, y) = split_quad(s)?;
        Ok(Self {
            width: size.width,
            height: size.height,
            x: parse_u32(x, "x offset")?,
            y: parse_u32(y, "y offset")?,
        })
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Frame geometry: border size plus outer/inner bevel widths (`WxH+B+B`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub outer_bevel: u32,
    pub inner_bevel: u32,
}

impl FrameGeometry {
    pub fn parse(s: &str) -> Result<Self, String> {
        let (size, outer, inner) = split_quad(s)?;
        Ok(Self {
            width: size.width,
            height: size.height,
            outer_bevel: parse_u32(outer, "outer bevel")?,
            inner_bevel: parse_u32(inner, "inner bevel")?,
        })
    }
}

impl fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.outer_bevel, self.inner_bevel
        )
    }
}

fn split_quad(s: &str) -> Result<(Dimensions, &str, &str), String> {
    let mut parts = s.splitn(3, '+');
    let size = parts.next().unwrap_or_default();
    match (parts.next(), parts.next()) {
        (Some(a), Some(b)) => Ok((Dimensions::parse(size)?, a, b)),
        _ => Err("expected <width>x<height>+<a>+<b>".to_string()),
    }
}

/// Resize behaviour selected by the optional geometry suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// Fit inside the box, preserving aspect ratio
    #[default]
    Fit,
    /// `!` - ignore aspect ratio
    Exact,
    /// `^` - fill the box, preserving aspect ratio
    Fill,
    /// `>` - only shrink larger images
    ShrinkOnly,
    /// `<` - only enlarge smaller images
    EnlargeOnly,
    /// `%` - width and height are percentages
    Percent,
}

/// `resize` arguments: dimensions plus the raw option suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeGeometry {
    pub width: u32,
    pub height: u32,
    /// Raw suffix following the height digits (e.g. `!`), passed through verbatim
    pub options: Option<String>,
}

impl ResizeGeometry {
    pub fn parse(s: &str) -> Result<Self, String> {
        let (width, rest) = s
            .split_once('x')
            .ok_or_else(|| "expected <width>x<height>[options]".to_string())?;
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (height, options) = rest.split_at(digits);
        Ok(Self {
            width: parse_u32(width, "width")?,
            height: parse_u32(height, "height")?,
            options: (!options.is_empty()).then(|| options.to_string()),
        })
    }

    /// Interpret the option suffix. Unknown suffix characters are ignored;
    /// the first recognised flag wins.
    pub fn mode(&self) -> ResizeMode {
        let options = self.options.as_deref().unwrap_or_default();
        options
            .chars()
            .find_map(|c| match c {
                '!' => Some(ResizeMode::Exact),
                '^' => Some(ResizeMode::Fill),
                '>' => Some(ResizeMode::ShrinkOnly),
                '<' => Some(ResizeMode::EnlargeOnly),
                '%' => Some(ResizeMode::Percent),
                _ => None,
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for ResizeGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}{}",
            self.width,
            self.height,
            self.options.as_deref().unwrap_or_default()
        )
    }
}
