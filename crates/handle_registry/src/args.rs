//! Construction requests and host argument decoding.
//!
//! Hosts call `createObject(kind, ...args)` with loosely typed positional
//! arguments. They arrive here as `serde_json::Value`s and are checked
//! against the fixed signature of each kind before anything is allocated.

use crate::errors::{HandleRegistryError, Result};
use crate::geometry::{Point, Rect, RotatedRect, Scalar, Size, Vec3b};
use crate::types::{ElementType, ObjectKind};
use serde_json::Value;

/// Validated-on-create description of a new instance
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectSpec {
    Matrix {
        rows: usize,
        cols: usize,
        elem: ElementType,
        data: Option<Vec<f64>>,
    },
    MatrixVector,
    Point(Point),
    PointVector,
    Rectangle(Rect),
    RectangleVector,
    Size(Size),
    ByteTriple(Vec3b),
    Scalar(Scalar),
    RotatedRectangle(RotatedRect),
}

impl ObjectSpec {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectSpec::Matrix { .. } => ObjectKind::Matrix,
            ObjectSpec::MatrixVector => ObjectKind::MatrixVector,
            ObjectSpec::Point(_) => ObjectKind::Point,
            ObjectSpec::PointVector => ObjectKind::PointVector,
            ObjectSpec::Rectangle(_) => ObjectKind::Rectangle,
            ObjectSpec::RectangleVector => ObjectKind::RectangleVector,
            ObjectSpec::Size(_) => ObjectKind::Size,
            ObjectSpec::ByteTriple(_) => ObjectKind::ByteTriple,
            ObjectSpec::Scalar(_) => ObjectKind::Scalar,
            ObjectSpec::RotatedRectangle(_) => ObjectKind::RotatedRectangle,
        }
    }

    /// Range checks that the typed constructors cannot express.
    pub fn validate(&self) -> Result<()> {
        let kind = self.kind();
        match self {
            ObjectSpec::Matrix { data, .. } => {
                if let Some(values) = data {
                    if values.iter().any(|v| !v.is_finite()) {
                        return Err(HandleRegistryError::invalid_args(
                            kind,
                            "matrix data must be finite",
                        ));
                    }
                }
            }
            ObjectSpec::Point(p) => require_finite(kind, &[p.x, p.y])?,
            ObjectSpec::Rectangle(r) => require_extent(kind, r.width, r.height)?,
            ObjectSpec::Size(s) => require_extent(kind, s.width, s.height)?,
            ObjectSpec::Scalar(s) => {
                let present = [Some(s.a), s.b, s.c, s.d];
                require_finite(kind, &present.iter().flatten().copied().collect::<Vec<_>>())?;
                // Only the 1, 3 and 4 component forms exist.
                if s.b.is_some() != s.c.is_some() || (s.d.is_some() && s.c.is_none()) {
                    return Err(HandleRegistryError::invalid_args(
                        kind,
                        "scalar takes 1, 3 or 4 components",
                    ));
                }
            }
            ObjectSpec::RotatedRectangle(r) => {
                require_finite(kind, &[r.center.x, r.center.y, r.width, r.height, r.angle])?;
                if r.width < 0.0 || r.height < 0.0 {
                    return Err(HandleRegistryError::invalid_args(
                        kind,
                        "width and height must be non-negative",
                    ));
                }
            }
            ObjectSpec::MatrixVector
            | ObjectSpec::PointVector
            | ObjectSpec::RectangleVector
            | ObjectSpec::ByteTriple(_) => {}
        }
        Ok(())
    }

    /// Decodes positional host arguments for `kind`.
    pub fn from_args(kind: ObjectKind, args: &[Value]) -> Result<Self> {
        let spec = match kind {
            ObjectKind::Matrix => {
                expect_arity(kind, args, &[3, 4])?;
                let rows = dimension(kind, args, 0, "rows")?;
                let cols = dimension(kind, args, 1, "cols")?;
                let code = integer(kind, args, 2, "element type")?;
                let elem = ElementType::from_code(code).ok_or_else(|| {
                    HandleRegistryError::invalid_args(kind, format!("unknown element type {code}"))
                })?;
                let data = args.get(3).map(|v| number_array(kind, v)).transpose()?;
                ObjectSpec::Matrix {
                    rows,
                    cols,
                    elem,
                    data,
                }
            }
            ObjectKind::Point => {
                expect_arity(kind, args, &[2])?;
                ObjectSpec::Point(Point {
                    x: number(kind, args, 0, "x")?,
                    y: number(kind, args, 1, "y")?,
                })
            }
            ObjectKind::Rectangle => {
                expect_arity(kind, args, &[4])?;
                ObjectSpec::Rectangle(Rect::new(
                    int32(kind, args, 0, "x")?,
                    int32(kind, args, 1, "y")?,
                    int32(kind, args, 2, "width")?,
                    int32(kind, args, 3, "height")?,
                ))
            }
            ObjectKind::Size => {
                expect_arity(kind, args, &[2])?;
                ObjectSpec::Size(Size {
                    width: int32(kind, args, 0, "width")?,
                    height: int32(kind, args, 1, "height")?,
                })
            }
            ObjectKind::Scalar => {
                expect_arity(kind, args, &[1, 3, 4])?;
                let components = (0..args.len())
                    .map(|i| number(kind, args, i, "component"))
                    .collect::<Result<Vec<_>>>()?;
                let scalar = Scalar::from_components(&components).ok_or_else(|| {
                    HandleRegistryError::invalid_args(kind, "scalar takes 1, 3 or 4 components")
                })?;
                ObjectSpec::Scalar(scalar)
            }
            ObjectKind::ByteTriple => {
                expect_arity(kind, args, &[3])?;
                let mut bytes = [0u8; 3];
                for (i, byte) in bytes.iter_mut().enumerate() {
                    let v = integer(kind, args, i, "component")?;
                    *byte = u8::try_from(v).map_err(|_| {
                        HandleRegistryError::invalid_args(kind, format!("component {v} exceeds 0..=255"))
                    })?;
                }
                ObjectSpec::ByteTriple(Vec3b(bytes))
            }
            ObjectKind::RotatedRectangle => {
                expect_arity(kind, args, &[5])?;
                ObjectSpec::RotatedRectangle(RotatedRect {
                    center: Point {
                        x: number(kind, args, 0, "center x")?,
                        y: number(kind, args, 1, "center y")?,
                    },
                    width: number(kind, args, 2, "width")?,
                    height: number(kind, args, 3, "height")?,
                    angle: number(kind, args, 4, "angle")?,
                })
            }
            ObjectKind::MatrixVector | ObjectKind::PointVector | ObjectKind::RectangleVector => {
                expect_arity(kind, args, &[0])?;
                match kind {
                    ObjectKind::MatrixVector => ObjectSpec::MatrixVector,
                    ObjectKind::PointVector => ObjectSpec::PointVector,
                    _ => ObjectSpec::RectangleVector,
                }
            }
        };
        spec.validate()?;
        Ok(spec)
    }
}

fn require_finite(kind: ObjectKind, values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(HandleRegistryError::invalid_args(kind, "values must be finite"))
    }
}

fn require_extent(kind: ObjectKind, width: i32, height: i32) -> Result<()> {
    if width < 0 || height < 0 {
        return Err(HandleRegistryError::invalid_args(
            kind,
            format!("negative extent {width}x{height}"),
        ));
    }
    Ok(())
}

fn expect_arity(kind: ObjectKind, args: &[Value], allowed: &[usize]) -> Result<()> {
    if allowed.contains(&args.len()) {
        return Ok(());
    }
    Err(HandleRegistryError::invalid_args(
        kind,
        format!("expected {allowed:?} arguments, got {}", args.len()),
    ))
}

fn number(kind: ObjectKind, args: &[Value], index: usize, name: &str) -> Result<f64> {
    args.get(index)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .ok_or_else(|| HandleRegistryError::invalid_args(kind, format!("{name} must be a finite number")))
}

fn integer(kind: ObjectKind, args: &[Value], index: usize, name: &str) -> Result<i64> {
    let v = number(kind, args, index, name)?;
    if v.fract() != 0.0 || v < i64::MIN as f64 || v > i64::MAX as f64 {
        return Err(HandleRegistryError::invalid_args(
            kind,
            format!("{name} must be an integer, got {v}"),
        ));
    }
    Ok(v as i64)
}

fn int32(kind: ObjectKind, args: &[Value], index: usize, name: &str) -> Result<i32> {
    let v = integer(kind, args, index, name)?;
    i32::try_from(v)
        .map_err(|_| HandleRegistryError::invalid_args(kind, format!("{name} {v} out of range")))
}

fn dimension(kind: ObjectKind, args: &[Value], index: usize, name: &str) -> Result<usize> {
    let v = int32(kind, args, index, name)?;
    usize::try_from(v)
        .map_err(|_| HandleRegistryError::invalid_args(kind, format!("{name} must be non-negative")))
}

fn number_array(kind: ObjectKind, value: &Value) -> Result<Vec<f64>> {
    let items = value
        .as_array()
        .ok_or_else(|| HandleRegistryError::invalid_args(kind, "data must be an array of numbers"))?;
    items
        .iter()
        .map(|item| {
            item.as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| HandleRegistryError::invalid_args(kind, "data must be finite numbers"))
        })
        .collect()
}
