//! Host-facing projections of registry instances

use crate::geometry::{Point, Rect, Scalar, Size};
use serde::{Deserialize, Serialize};

/// Structured value handed back to the host for a handle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObjectValue {
    /// Matrix with its 8-bit payload encoded as base64
    Mat {
        size: usize,
        cols: usize,
        rows: usize,
        base64: String,
    },
    /// Matrix element of a matrix vector, dimensions only
    MatHeader {
        size: usize,
        cols: usize,
        rows: usize,
    },
    Point(Point),
    Rect(Rect),
    Size(Size),
    Scalar(Scalar),
    Vec3b {
        a: u8,
        b: u8,
        c: u8,
    },
    RotatedRect {
        center: Point,
        size: SizeF,
        angle: f64,
    },
    Array {
        array: Vec<ObjectValue>,
    },
}

impl ObjectValue {
    /// Render as a JSON value for the host
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeF {
    pub width: f64,
    pub height: f64,
}

/// Snapshot returned by raw matrix reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatData {
    /// Element count, `rows * cols`
    pub size: usize,
    pub cols: usize,
    pub rows: usize,
    pub data: Vec<u8>,
}

/// Output element format for typed buffer reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferFormat {
    #[serde(rename = "uint8")]
    U8,
    #[serde(rename = "float32")]
    F32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BufferData {
    U8(Vec<u8>),
    F32(Vec<f32>),
}

/// Typed copy of matrix elements, channels interleaved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatBufferData {
    pub cols: usize,
    pub rows: usize,
    pub channels: usize,
    pub buffer: BufferData,
}
