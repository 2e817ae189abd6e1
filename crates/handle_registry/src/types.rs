//! Types for the handle registry

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Closed set of object shapes the registry can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    #[serde(rename = "mat")]
    Matrix,
    #[serde(rename = "mat_vector")]
    MatrixVector,
    #[serde(rename = "point")]
    Point,
    #[serde(rename = "point_vector")]
    PointVector,
    #[serde(rename = "rect")]
    Rectangle,
    #[serde(rename = "rect_vector")]
    RectangleVector,
    #[serde(rename = "size")]
    Size,
    #[serde(rename = "vec3b")]
    ByteTriple,
    #[serde(rename = "scalar")]
    Scalar,
    #[serde(rename = "rotated_rect")]
    RotatedRectangle,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 10] = [
        ObjectKind::Matrix,
        ObjectKind::MatrixVector,
        ObjectKind::Point,
        ObjectKind::PointVector,
        ObjectKind::Rectangle,
        ObjectKind::RectangleVector,
        ObjectKind::Size,
        ObjectKind::ByteTriple,
        ObjectKind::Scalar,
        ObjectKind::RotatedRectangle,
    ];

    /// Host-facing tag
    pub fn tag(self) -> &'static str {
        match self {
            ObjectKind::Matrix => "mat",
            ObjectKind::MatrixVector => "mat_vector",
            ObjectKind::Point => "point",
            ObjectKind::PointVector => "point_vector",
            ObjectKind::Rectangle => "rect",
            ObjectKind::RectangleVector => "rect_vector",
            ObjectKind::Size => "size",
            ObjectKind::ByteTriple => "vec3b",
            ObjectKind::Scalar => "scalar",
            ObjectKind::RotatedRectangle => "rotated_rect",
        }
    }

    /// Element kind owned by a vector kind, `None` for non-vector kinds
    pub fn element_kind(self) -> Option<ObjectKind> {
        match self {
            ObjectKind::MatrixVector => Some(ObjectKind::Matrix),
            ObjectKind::PointVector => Some(ObjectKind::Point),
            ObjectKind::RectangleVector => Some(ObjectKind::Rectangle),
            _ => None,
        }
    }

    pub fn is_vector(self) -> bool {
        self.element_kind().is_some()
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| format!("unknown object kind: {s}"))
    }
}

/// Opaque identifier: slot index in the low 32 bits, generation above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HandleId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(HandleId)
    }
}

// Host numbers are f64, so ids travel as decimal strings.
impl Serialize for HandleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HandleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Capability referring to a registry-owned instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub id: HandleId,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
}

impl Handle {
    pub fn new(id: HandleId, kind: ObjectKind) -> Self {
        Self { id, kind }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Per-channel storage depth of a matrix element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Depth {
    U8,
    S8,
    U16,
    S16,
    S32,
    F32,
    F64,
}

impl Depth {
    pub fn code(self) -> u8 {
        match self {
            Depth::U8 => 0,
            Depth::S8 => 1,
            Depth::U16 => 2,
            Depth::S16 => 3,
            Depth::S32 => 4,
            Depth::F32 => 5,
            Depth::F64 => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Depth::U8,
            1 => Depth::S8,
            2 => Depth::U16,
            3 => Depth::S16,
            4 => Depth::S32,
            5 => Depth::F32,
            6 => Depth::F64,
            _ => return None,
        })
    }

    /// Bytes per channel value
    pub fn byte_size(self) -> usize {
        match self {
            Depth::U8 | Depth::S8 => 1,
            Depth::U16 | Depth::S16 => 2,
            Depth::S32 | Depth::F32 => 4,
            Depth::F64 => 8,
        }
    }
}

pub const MAX_CHANNELS: u8 = 4;
const CHANNEL_SHIFT: u8 = 3;

/// Matrix element type: a depth plus 1..=4 interleaved channels.
///
/// The packed code is `depth + ((channels - 1) << 3)`, so an 8-bit three
/// channel image is code 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementType {
    depth: Depth,
    channels: u8,
}

impl ElementType {
    pub const U8C1: ElementType = ElementType {
        depth: Depth::U8,
        channels: 1,
    };
    pub const U8C3: ElementType = ElementType {
        depth: Depth::U8,
        channels: 3,
    };

    pub fn new(depth: Depth, channels: u8) -> Option<Self> {
        if channels == 0 || channels > MAX_CHANNELS {
            return None;
        }
        Some(Self { depth, channels })
    }

    pub fn from_code(code: i64) -> Option<Self> {
        let code = u8::try_from(code).ok()?;
        let depth = Depth::from_code(code & ((1 << CHANNEL_SHIFT) - 1))?;
        Self::new(depth, (code >> CHANNEL_SHIFT) + 1)
    }

    pub fn code(self) -> u8 {
        self.depth.code() + ((self.channels - 1) << CHANNEL_SHIFT)
    }

    pub fn depth(self) -> Depth {
        self.depth
    }

    pub fn channels(self) -> usize {
        self.channels as usize
    }
}
