//! Plain geometric payloads owned by the registry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Integer rectangle; `x`, `y` name the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the rectangle lies inside `[0, cols) x [0, rows)`.
    pub fn fits_within(&self, cols: usize, rows: usize) -> bool {
        if self.x < 0 || self.y < 0 || self.width < 0 || self.height < 0 {
            return false;
        }
        let right = self.x as i64 + self.width as i64;
        let bottom = self.y as i64 + self.height as i64;
        right <= cols as i64 && bottom <= rows as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Up to four components; `b`, `c`, `d` are only set by the 3 and 4
/// component forms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scalar {
    pub a: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<f64>,
}

impl Scalar {
    /// Builds a scalar from the 1, 3 or 4 component forms.
    pub fn from_components(components: &[f64]) -> Option<Self> {
        match *components {
            [a] => Some(Self {
                a,
                b: None,
                c: None,
                d: None,
            }),
            [a, b, c] => Some(Self {
                a,
                b: Some(b),
                c: Some(c),
                d: None,
            }),
            [a, b, c, d] => Some(Self {
                a,
                b: Some(b),
                c: Some(c),
                d: Some(d),
            }),
            _ => None,
        }
    }

    /// Component `i`, with unset components reading as zero.
    pub fn component(&self, i: usize) -> f64 {
        match i {
            0 => self.a,
            1 => self.b.unwrap_or(0.0),
            2 => self.c.unwrap_or(0.0),
            3 => self.d.unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vec3b(pub [u8; 3]);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatedRect {
    pub center: Point,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation in degrees.
    pub angle: f64,
}
