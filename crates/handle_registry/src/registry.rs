//! Handle registry implementation
//!
//! Owns every live vision object and hands out generation-checked handles.
//! All identifier assignment and instance lookup goes through one lock.

use crate::arena::Arena;
use crate::args::ObjectSpec;
use crate::errors::*;
use crate::geometry::{Point, Rect, RotatedRect, Scalar, Size, Vec3b};
use crate::matrix::Matrix;
use crate::settings::RegistryConfig;
use crate::types::*;
use crate::value::{BufferData, BufferFormat, MatBufferData, MatData, ObjectValue, SizeF};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Payload behind a handle
#[derive(Debug)]
enum Instance {
    Matrix(Matrix),
    MatrixVector(Vec<Matrix>),
    Point(Point),
    PointVector(Vec<Point>),
    Rectangle(Rect),
    RectangleVector(Vec<Rect>),
    Size(Size),
    ByteTriple(Vec3b),
    Scalar(Scalar),
    RotatedRectangle(RotatedRect),
}

impl Instance {
    fn from_spec(spec: ObjectSpec) -> Result<Self> {
        Ok(match spec {
            ObjectSpec::Matrix {
                rows,
                cols,
                elem,
                data,
            } => Instance::Matrix(Matrix::new(rows, cols, elem, data.as_deref())?),
            ObjectSpec::MatrixVector => Instance::MatrixVector(Vec::new()),
            ObjectSpec::Point(p) => Instance::Point(p),
            ObjectSpec::PointVector => Instance::PointVector(Vec::new()),
            ObjectSpec::Rectangle(r) => Instance::Rectangle(r),
            ObjectSpec::RectangleVector => Instance::RectangleVector(Vec::new()),
            ObjectSpec::Size(s) => Instance::Size(s),
            ObjectSpec::ByteTriple(v) => Instance::ByteTriple(v),
            ObjectSpec::Scalar(s) => Instance::Scalar(s),
            ObjectSpec::RotatedRectangle(r) => Instance::RotatedRectangle(r),
        })
    }

    fn kind(&self) -> ObjectKind {
        match self {
            Instance::Matrix(_) => ObjectKind::Matrix,
            Instance::MatrixVector(_) => ObjectKind::MatrixVector,
            Instance::Point(_) => ObjectKind::Point,
            Instance::PointVector(_) => ObjectKind::PointVector,
            Instance::Rectangle(_) => ObjectKind::Rectangle,
            Instance::RectangleVector(_) => ObjectKind::RectangleVector,
            Instance::Size(_) => ObjectKind::Size,
            Instance::ByteTriple(_) => ObjectKind::ByteTriple,
            Instance::Scalar(_) => ObjectKind::Scalar,
            Instance::RotatedRectangle(_) => ObjectKind::RotatedRectangle,
        }
    }

    /// Independently owned copy; matrices get their own storage.
    fn deep_copy(&self) -> Instance {
        match self {
            Instance::Matrix(m) => Instance::Matrix(m.deep_copy()),
            Instance::MatrixVector(v) => {
                Instance::MatrixVector(v.iter().map(Matrix::deep_copy).collect())
            }
            Instance::Point(p) => Instance::Point(*p),
            Instance::PointVector(v) => Instance::PointVector(v.clone()),
            Instance::Rectangle(r) => Instance::Rectangle(*r),
            Instance::RectangleVector(v) => Instance::RectangleVector(v.clone()),
            Instance::Size(s) => Instance::Size(*s),
            Instance::ByteTriple(v) => Instance::ByteTriple(*v),
            Instance::Scalar(s) => Instance::Scalar(*s),
            Instance::RotatedRectangle(r) => Instance::RotatedRectangle(*r),
        }
    }

    fn to_value(&self) -> ObjectValue {
        match self {
            Instance::Matrix(m) => mat_value(m),
            Instance::MatrixVector(v) => ObjectValue::Array {
                array: v.iter().map(mat_header).collect(),
            },
            Instance::Point(p) => ObjectValue::Point(*p),
            Instance::PointVector(v) => ObjectValue::Array {
                array: v.iter().copied().map(ObjectValue::Point).collect(),
            },
            Instance::Rectangle(r) => ObjectValue::Rect(*r),
            Instance::RectangleVector(v) => ObjectValue::Array {
                array: v.iter().copied().map(ObjectValue::Rect).collect(),
            },
            Instance::Size(s) => ObjectValue::Size(*s),
            Instance::ByteTriple(Vec3b([a, b, c])) => ObjectValue::Vec3b {
                a: *a,
                b: *b,
                c: *c,
            },
            Instance::Scalar(s) => ObjectValue::Scalar(*s),
            Instance::RotatedRectangle(r) => ObjectValue::RotatedRect {
                center: r.center,
                size: SizeF {
                    width: r.width,
                    height: r.height,
                },
                angle: r.angle,
            },
        }
    }

    fn vector_len(&self) -> Option<usize> {
        match self {
            Instance::MatrixVector(v) => Some(v.len()),
            Instance::PointVector(v) => Some(v.len()),
            Instance::RectangleVector(v) => Some(v.len()),
            _ => None,
        }
    }

    fn as_matrix(&self, operation: &'static str) -> Result<&Matrix> {
        match self {
            Instance::Matrix(m) => Ok(m),
            other => Err(HandleRegistryError::KindMismatch {
                operation,
                actual: other.kind(),
            }),
        }
    }
}

fn mat_header(m: &Matrix) -> ObjectValue {
    ObjectValue::MatHeader {
        size: m.total(),
        cols: m.cols(),
        rows: m.rows(),
    }
}

fn mat_value(m: &Matrix) -> ObjectValue {
    ObjectValue::Mat {
        size: m.total(),
        cols: m.cols(),
        rows: m.rows(),
        base64: STANDARD.encode(m.snapshot().to_u8()),
    }
}

/// Looks up a live instance whose kind matches the one recorded in `handle`.
fn resolve<'a>(arena: &'a Arena<Instance>, handle: &Handle) -> Result<&'a Instance> {
    arena
        .get(handle.id)
        .filter(|instance| instance.kind() == handle.kind)
        .ok_or(HandleRegistryError::InvalidHandle { handle: *handle })
}

fn resolve_mut<'a>(arena: &'a mut Arena<Instance>, handle: &Handle) -> Result<&'a mut Instance> {
    arena
        .get_mut(handle.id)
        .filter(|instance| instance.kind() == handle.kind)
        .ok_or(HandleRegistryError::InvalidHandle { handle: *handle })
}

/// Handle registry
///
/// Owns all live vision objects. Cloning yields another reference to the
/// same registry.
#[derive(Debug, Clone)]
pub struct HandleRegistry {
    instances: Arc<RwLock<Arena<Instance>>>,
    config: Arc<RegistryConfig>,
}

impl HandleRegistry {
    /// Create a registry with default limits
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            instances: Arc::new(RwLock::new(Arena::new())),
            config: Arc::new(config),
        }
    }

    /// Number of live handles
    pub fn live_count(&self) -> usize {
        self.instances.read().len()
    }

    /// Create a new instance from a typed request
    pub fn create(&self, spec: ObjectSpec) -> Result<Handle> {
        let kind = spec.kind();
        let instance = self.build(spec).inspect_err(|err| {
            warn!(%kind, error = %err, "rejected create request");
        })?;
        let mut arena = self.instances.write();
        self.insert(&mut arena, instance)
    }

    /// Create a new instance from positional host arguments
    pub fn create_from_args(&self, kind: ObjectKind, args: &[serde_json::Value]) -> Result<Handle> {
        let spec = ObjectSpec::from_args(kind, args).inspect_err(|err| {
            warn!(%kind, error = %err, "rejected create arguments");
        })?;
        self.create(spec)
    }

    /// Wrap an interleaved 8-bit three channel frame as a matrix
    pub fn frame_buffer_to_mat(&self, rows: usize, cols: usize, bytes: Vec<u8>) -> Result<Handle> {
        self.check_matrix_size(rows, cols)?;
        let matrix = Matrix::from_bytes(rows, cols, ElementType::U8C3, bytes)?;
        let mut arena = self.instances.write();
        self.insert(&mut arena, Instance::Matrix(matrix))
    }

    /// Convert an instance to its host value
    pub fn to_value(&self, handle: &Handle) -> Result<ObjectValue> {
        let arena = self.instances.read();
        Ok(resolve(&arena, handle)?.to_value())
    }

    /// Kind of a live handle
    pub fn kind_of(&self, handle: &Handle) -> Result<ObjectKind> {
        let arena = self.instances.read();
        Ok(resolve(&arena, handle)?.kind())
    }

    /// Number of elements in a vector
    pub fn vector_len(&self, vector: &Handle) -> Result<usize> {
        let arena = self.instances.read();
        let instance = resolve(&arena, vector)?;
        instance
            .vector_len()
            .ok_or(HandleRegistryError::KindMismatch {
                operation: "vector_len",
                actual: instance.kind(),
            })
    }

    /// Deep-copy element `index` of a vector into a new handle
    pub fn copy_element(&self, vector: &Handle, index: usize) -> Result<Handle> {
        let mut arena = self.instances.write();
        let source = resolve(&arena, vector)?;
        let copy = match source {
            Instance::MatrixVector(v) => v.get(index).map(|m| Instance::Matrix(m.deep_copy())),
            Instance::PointVector(v) => v.get(index).copied().map(Instance::Point),
            Instance::RectangleVector(v) => v.get(index).copied().map(Instance::Rectangle),
            other => {
                return Err(HandleRegistryError::KindMismatch {
                    operation: "copy_element",
                    actual: other.kind(),
                });
            }
        };
        let copy = copy.ok_or(HandleRegistryError::IndexOutOfRange {
            index,
            len: source.vector_len().unwrap_or_default(),
        })?;
        self.insert(&mut arena, copy)
    }

    /// Append a deep copy of `element` to `vector`, returning the new length
    pub fn push_element(&self, vector: &Handle, element: &Handle) -> Result<usize> {
        let mut arena = self.instances.write();
        let copy = resolve(&arena, element)?.deep_copy();
        let target = resolve_mut(&mut arena, vector)?;

        let len = match (target, copy) {
            (Instance::MatrixVector(v), Instance::Matrix(m)) => {
                v.push(m);
                v.len()
            }
            (Instance::PointVector(v), Instance::Point(p)) => {
                v.push(p);
                v.len()
            }
            (Instance::RectangleVector(v), Instance::Rectangle(r)) => {
                v.push(r);
                v.len()
            }
            (target, copy) => {
                // Report whichever side is not a matching vector/element pair.
                let actual = if target.kind().is_vector() {
                    copy.kind()
                } else {
                    target.kind()
                };
                return Err(HandleRegistryError::KindMismatch {
                    operation: "push_element",
                    actual,
                });
            }
        };
        Ok(len)
    }

    /// Snapshot of a matrix as 8-bit values
    pub fn read_raw(&self, matrix: &Handle) -> Result<MatData> {
        let arena = self.instances.read();
        let m = resolve(&arena, matrix)?.as_matrix("read_raw")?;
        Ok(MatData {
            size: m.total(),
            cols: m.cols(),
            rows: m.rows(),
            data: m.snapshot().to_u8(),
        })
    }

    /// Typed copy of a matrix's elements
    pub fn read_buffer(&self, matrix: &Handle, format: BufferFormat) -> Result<MatBufferData> {
        let arena = self.instances.read();
        let m = resolve(&arena, matrix)?.as_matrix("read_buffer")?;
        let snapshot = m.snapshot();
        let buffer = match format {
            BufferFormat::U8 => BufferData::U8(snapshot.to_u8()),
            BufferFormat::F32 => BufferData::F32(snapshot.to_f32()),
        };
        Ok(MatBufferData {
            cols: m.cols(),
            rows: m.rows(),
            channels: m.element_type().channels(),
            buffer,
        })
    }

    /// Matrix view covering the rectangle held by `rect`
    pub fn sub_region(&self, matrix: &Handle, rect: &Handle) -> Result<Handle> {
        let region = {
            let arena = self.instances.read();
            match resolve(&arena, rect)? {
                Instance::Rectangle(r) => *r,
                other => {
                    return Err(HandleRegistryError::KindMismatch {
                        operation: "sub_region",
                        actual: other.kind(),
                    });
                }
            }
        };
        self.sub_region_at(matrix, region)
    }

    /// Matrix view covering `rect`; the view shares the source's storage
    pub fn sub_region_at(&self, matrix: &Handle, rect: Rect) -> Result<Handle> {
        let mut arena = self.instances.write();
        let view = resolve(&arena, matrix)?.as_matrix("sub_region")?.view(rect)?;
        let handle = self.insert(&mut arena, Instance::Matrix(view))?;
        debug!(source = %matrix, view = %handle, ?rect, "created matrix view");
        Ok(handle)
    }

    /// Fill every element of a matrix with a scalar
    pub fn set_to(&self, matrix: &Handle, scalar: &Handle) -> Result<()> {
        let arena = self.instances.read();
        let value = match resolve(&arena, scalar)? {
            Instance::Scalar(s) => *s,
            other => {
                return Err(HandleRegistryError::KindMismatch {
                    operation: "set_to",
                    actual: other.kind(),
                });
            }
        };
        resolve(&arena, matrix)?.as_matrix("set_to")?.set_to(&value);
        Ok(())
    }

    /// Release an instance; the handle is invalid afterwards
    pub fn release(&self, handle: &Handle) -> Result<()> {
        let removed = {
            let mut arena = self.instances.write();
            resolve(&arena, handle)?;
            arena.remove(handle.id)
        };
        debug!(%handle, "released handle");
        drop(removed);
        Ok(())
    }

    /// Release every instance, returning how many were live
    pub fn clear(&self) -> usize {
        let released = self.instances.write().clear();
        info!(released, "cleared handle registry");
        released
    }

    fn build(&self, spec: ObjectSpec) -> Result<Instance> {
        spec.validate()?;
        if let ObjectSpec::Matrix { rows, cols, .. } = spec {
            self.check_matrix_size(rows, cols)?;
        }
        Instance::from_spec(spec)
    }

    fn check_matrix_size(&self, rows: usize, cols: usize) -> Result<()> {
        if self.config.matrix_too_large(rows, cols) {
            return Err(HandleRegistryError::LimitExceeded {
                limit: "max_matrix_elements",
                max: self.config.max_matrix_elements,
            });
        }
        Ok(())
    }

    fn insert(&self, arena: &mut Arena<Instance>, instance: Instance) -> Result<Handle> {
        if self.config.handle_limit_reached(arena.len()) {
            return Err(HandleRegistryError::LimitExceeded {
                limit: "max_live_handles",
                max: self.config.max_live_handles,
            });
        }
        let kind = instance.kind();
        let id = arena.insert(instance).ok_or(HandleRegistryError::LimitExceeded {
            limit: "handle_index_space",
            max: u32::MAX as usize,
        })?;
        let handle = Handle::new(id, kind);
        debug!(%handle, "registered handle");
        Ok(handle)
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
