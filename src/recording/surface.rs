//! 2D drawing surface, colors and the in-memory display list.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in [0, 1].
    pub a: f32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unrecognized color '{0}'")]
pub struct ColorParseError(pub String);

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parses any CSS color: hex, `rgb()`, `hsl()`, `hwb()`, named colors
    /// and `transparent`.
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        csscolorparser::parse(input.trim())
            .map(Rgba::from)
            .map_err(|_| ColorParseError(input.to_string()))
    }

    /// Composites this color over an opaque `base`.
    pub fn over(self, base: Rgba) -> Rgba {
        let mix = |top: u8, bottom: u8| {
            (top as f32 * self.a + bottom as f32 * (1.0 - self.a)).round() as u8
        };
        Rgba::rgb(mix(self.r, base.r), mix(self.g, base.g), mix(self.b, base.b))
    }
}

impl FromStr for Rgba {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<csscolorparser::Color> for Rgba {
    fn from(color: csscolorparser::Color) -> Self {
        let [r, g, b, _] = color.to_rgba8();
        Self {
            r,
            g,
            b,
            a: (color.a as f32).clamp(0.0, 1.0),
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in surface pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

/// Stroke, fill and clear primitives of a 2D drawing surface.
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width() as f32, self.height() as f32)
    }

    fn clear_rect(&mut self, rect: Rect);

    fn fill_rect(&mut self, rect: Rect, color: Rgba);

    /// Strokes a connected polyline through `points`.
    fn stroke_path(&mut self, points: &[Point], color: Rgba, line_width: f32);

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba);

    fn stroke_circle(&mut self, center: Point, radius: f32, color: Rgba, line_width: f32);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rect),
    FillRect {
        rect: Rect,
        color: Rgba,
    },
    StrokePath {
        points: Vec<Point>,
        color: Rgba,
        line_width: f32,
    },
    FillCircle {
        center: Point,
        radius: f32,
        color: Rgba,
    },
    StrokeCircle {
        center: Point,
        radius: f32,
        color: Rgba,
        line_width: f32,
    },
}

/// Surface that records its draw commands for a renderer to replay.
///
/// Clearing the whole surface discards everything recorded so far.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayList {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// True when nothing but clears has been recorded.
    pub fn is_blank(&self) -> bool {
        self.commands
            .iter()
            .all(|command| matches!(command, DrawCommand::Clear(_)))
    }
}

impl Surface for DisplayList {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear_rect(&mut self, rect: Rect) {
        if rect.contains_rect(&self.bounds()) {
            self.commands.clear();
        } else {
            self.commands.push(DrawCommand::Clear(rect));
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_path(&mut self, points: &[Point], color: Rgba, line_width: f32) {
        if points.len() < 2 {
            return;
        }
        self.commands.push(DrawCommand::StrokePath {
            points: points.to_vec(),
            color,
            line_width,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            color,
        });
    }

    fn stroke_circle(&mut self, center: Point, radius: f32, color: Rgba, line_width: f32) {
        self.commands.push(DrawCommand::StrokeCircle {
            center,
            radius,
            color,
            line_width,
        });
    }
}
