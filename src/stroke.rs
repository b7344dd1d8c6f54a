use std::fmt;
use std::str::FromStr;

use image::Rgba;

use crate::geometry::Point2D;

pub const STROKE_WIDTH: f64 = 5.0;

/// Pen colour as picked from the colour input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PenColor {
    pub const BLACK: PenColor = PenColor { r: 0, g: 0, b: 0 };

    pub fn to_rgba(&self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }

    /// `#rrggbb`, the form `<input type="color">` reports.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for PenColor {
    fn default() -> Self {
        PenColor::BLACK
    }
}

impl fmt::Display for PenColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidColor(pub String);

impl fmt::Display for InvalidColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid colour: {:?}", self.0)
    }
}

impl std::error::Error for InvalidColor {}

impl FromStr for PenColor {
    type Err = InvalidColor;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return hex_to_color(hex).ok_or_else(|| InvalidColor(value.to_string()));
        }
        named_color(value).ok_or_else(|| InvalidColor(value.to_string()))
    }
}

fn hex_to_color(hex: &str) -> Option<PenColor> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(PenColor { r: channel(&hex[0..2])?, g: channel(&hex[2..4])?, b: channel(&hex[4..6])? }),
        3 => {
            // #rgb is shorthand for #rrggbb
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(PenColor { r: rgb[0], g: rgb[1], b: rgb[2] })
        }
        _ => None,
    }
}

fn named_color(name: &str) -> Option<PenColor> {
    let (r, g, b) = match name.to_lowercase().as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "gray" | "grey" => (128, 128, 128),
        _ => return None,
    };
    Some(PenColor { r, g, b })
}

/// A committed piece of a freehand stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point2D,
    pub to: Point2D,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PenState {
    Idle,
    Drawing { last: Point2D },
}

/// Freehand pen: idle until pressed, then every move yields a segment that
/// is stroked onto the surface right away.
#[derive(Debug, Clone)]
pub struct Pen {
    state: PenState,
}

impl Pen {
    pub fn new() -> Self {
        Pen { state: PenState::Idle }
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, PenState::Drawing {..})
    }

    pub fn pen_down(&mut self, at: Point2D) {
        self.state = PenState::Drawing { last: at };
    }

    pub fn pen_move(&mut self, to: Point2D) -> Option<Segment> {
        match self.state {
            PenState::Idle => None,
            PenState::Drawing { last } => {
                self.state = PenState::Drawing { last: to };
                Some(Segment { from: last, to })
            }
        }
    }

    pub fn pen_up(&mut self) {
        self.state = PenState::Idle;
    }
}

impl Default for Pen {
    fn default() -> Self {
        Pen::new()
    }
}
