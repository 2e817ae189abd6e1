//! Matrix storage and region views.
//!
//! ## Storage and views
//! A [`Matrix`] is a rectangular window onto a shared [`MatBuffer`]. The
//! buffer sits behind `Arc<RwLock<..>>`; a sub-region is a second window onto
//! the same buffer, so the buffer lives as long as any window into it. Offsets
//! and stride are counted in elements (pixels), not bytes or channel values.
//!
//! ## Element conversion
//! Values entering a buffer are rounded half-to-even and saturated to the
//! buffer depth. Non-finite values are rejected by the caller before they
//! reach this module; NaN would otherwise saturate to zero.

use crate::errors::{HandleRegistryError, Result};
use crate::geometry::{Rect, Scalar};
use crate::types::{Depth, ElementType};
use parking_lot::RwLock;
use std::sync::Arc;

/// Channel value that can be stored in a [`MatBuffer`].
pub trait Element: Copy + Default {
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

macro_rules! int_element {
    ($($t:ty),*) => {$(
        impl Element for $t {
            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                // `as` saturates at the type bounds.
                value.round_ties_even() as $t
            }
        }
    )*};
}

int_element!(u8, i8, u16, i16, i32);

impl Element for f32 {
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        // Finite values past the f32 range would otherwise become infinite.
        value.clamp(f32::MIN as f64, f32::MAX as f64) as f32
    }
}

impl Element for f64 {
    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

/// Interleaved channel values of one depth.
#[derive(Debug, Clone, PartialEq)]
pub enum MatBuffer {
    U8(Vec<u8>),
    S8(Vec<i8>),
    U16(Vec<u16>),
    S16(Vec<i16>),
    S32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! dispatch {
    ($buf:expr, $data:ident => $body:expr) => {
        match $buf {
            MatBuffer::U8($data) => $body,
            MatBuffer::S8($data) => $body,
            MatBuffer::U16($data) => $body,
            MatBuffer::S16($data) => $body,
            MatBuffer::S32($data) => $body,
            MatBuffer::F32($data) => $body,
            MatBuffer::F64($data) => $body,
        }
    };
}

macro_rules! map_buffer {
    ($buf:expr, $data:ident => $body:expr) => {
        match $buf {
            MatBuffer::U8($data) => MatBuffer::U8($body),
            MatBuffer::S8($data) => MatBuffer::S8($body),
            MatBuffer::U16($data) => MatBuffer::U16($body),
            MatBuffer::S16($data) => MatBuffer::S16($body),
            MatBuffer::S32($data) => MatBuffer::S32($body),
            MatBuffer::F32($data) => MatBuffer::F32($body),
            MatBuffer::F64($data) => MatBuffer::F64($body),
        }
    };
}

fn convert<T: Element, U: Element>(src: &[T]) -> Vec<U> {
    src.iter().map(|&v| U::from_f64(v.to_f64())).collect()
}

fn zeroed_vec<T: Element>(len: usize) -> Option<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).ok()?;
    data.resize(len, T::default());
    Some(data)
}

impl MatBuffer {
    /// Zero-filled buffer, `None` when the allocation cannot be made.
    pub fn try_zeroed(depth: Depth, len: usize) -> Option<Self> {
        Some(match depth {
            Depth::U8 => MatBuffer::U8(zeroed_vec(len)?),
            Depth::S8 => MatBuffer::S8(zeroed_vec(len)?),
            Depth::U16 => MatBuffer::U16(zeroed_vec(len)?),
            Depth::S16 => MatBuffer::S16(zeroed_vec(len)?),
            Depth::S32 => MatBuffer::S32(zeroed_vec(len)?),
            Depth::F32 => MatBuffer::F32(zeroed_vec(len)?),
            Depth::F64 => MatBuffer::F64(zeroed_vec(len)?),
        })
    }

    /// Converts host numbers into `depth`, saturating out-of-range values.
    pub fn from_values(depth: Depth, values: &[f64]) -> Self {
        match depth {
            Depth::U8 => MatBuffer::U8(convert(values)),
            Depth::S8 => MatBuffer::S8(convert(values)),
            Depth::U16 => MatBuffer::U16(convert(values)),
            Depth::S16 => MatBuffer::S16(convert(values)),
            Depth::S32 => MatBuffer::S32(convert(values)),
            Depth::F32 => MatBuffer::F32(convert(values)),
            Depth::F64 => MatBuffer::F64(values.to_vec()),
        }
    }

    pub fn depth(&self) -> Depth {
        match self {
            MatBuffer::U8(_) => Depth::U8,
            MatBuffer::S8(_) => Depth::S8,
            MatBuffer::U16(_) => Depth::U16,
            MatBuffer::S16(_) => Depth::S16,
            MatBuffer::S32(_) => Depth::S32,
            MatBuffer::F32(_) => Depth::F32,
            MatBuffer::F64(_) => Depth::F64,
        }
    }

    /// Every value converted to 8-bit unsigned.
    pub fn to_u8(&self) -> Vec<u8> {
        match self {
            MatBuffer::U8(data) => data.clone(),
            other => dispatch!(other, data => convert(data)),
        }
    }

    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            MatBuffer::F32(data) => data.clone(),
            other => dispatch!(other, data => convert(data)),
        }
    }

    fn crop(&self, layout: &Layout) -> MatBuffer {
        map_buffer!(self, data => crop_rows(data, layout))
    }

    fn fill(&mut self, layout: &Layout, scalar: &Scalar) {
        dispatch!(self, data => fill_rows(data, layout, scalar))
    }
}

/// Window geometry inside a buffer, in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    row_offset: usize,
    col_offset: usize,
    rows: usize,
    cols: usize,
    stride: usize,
    channels: usize,
}

impl Layout {
    fn dense(rows: usize, cols: usize, channels: usize) -> Self {
        Self {
            row_offset: 0,
            col_offset: 0,
            rows,
            cols,
            stride: cols,
            channels,
        }
    }

    /// Channel-value range covered by window row `r`.
    fn row_span(&self, r: usize) -> std::ops::Range<usize> {
        let start = ((self.row_offset + r) * self.stride + self.col_offset) * self.channels;
        start..start + self.cols * self.channels
    }
}

fn crop_rows<T: Copy>(src: &[T], layout: &Layout) -> Vec<T> {
    let mut out = Vec::with_capacity(layout.rows * layout.cols * layout.channels);
    for r in 0..layout.rows {
        out.extend_from_slice(&src[layout.row_span(r)]);
    }
    out
}

fn fill_rows<T: Element>(dst: &mut [T], layout: &Layout, scalar: &Scalar) {
    let pixel: Vec<T> = (0..layout.channels)
        .map(|c| T::from_f64(scalar.component(c)))
        .collect();
    for r in 0..layout.rows {
        for chunk in dst[layout.row_span(r)].chunks_exact_mut(layout.channels) {
            chunk.copy_from_slice(&pixel);
        }
    }
}

/// Largest buffer, in bytes, a single matrix may allocate.
pub const MAX_BUFFER_BYTES: usize = isize::MAX as usize;

/// Number of channel values in a `rows x cols` matrix of `elem`.
pub fn value_count(rows: usize, cols: usize, elem: ElementType) -> Option<usize> {
    rows.checked_mul(cols)?.checked_mul(elem.channels())
}

/// Like [`value_count`], but fails when the buffer could never be allocated.
fn buffer_len(rows: usize, cols: usize, elem: ElementType) -> Result<usize> {
    value_count(rows, cols, elem)
        .filter(|&len| {
            len.checked_mul(elem.depth().byte_size())
                .is_some_and(|bytes| bytes <= MAX_BUFFER_BYTES)
        })
        .ok_or(HandleRegistryError::LimitExceeded {
            limit: "matrix_buffer_bytes",
            max: MAX_BUFFER_BYTES,
        })
}

/// Rectangular window onto shared matrix storage.
#[derive(Debug)]
pub struct Matrix {
    storage: Arc<RwLock<MatBuffer>>,
    elem: ElementType,
    layout: Layout,
}

impl Matrix {
    /// Builds a dense matrix; zero-filled when `data` is `None`.
    pub fn new(rows: usize, cols: usize, elem: ElementType, data: Option<&[f64]>) -> Result<Self> {
        let expected = buffer_len(rows, cols, elem)?;

        let buffer = match data {
            Some(values) if values.len() != expected => {
                return Err(HandleRegistryError::DataSizeMismatch {
                    expected,
                    actual: values.len(),
                });
            }
            Some(values) => MatBuffer::from_values(elem.depth(), values),
            None => MatBuffer::try_zeroed(elem.depth(), expected).ok_or(
                HandleRegistryError::LimitExceeded {
                    limit: "matrix_buffer_bytes",
                    max: MAX_BUFFER_BYTES,
                },
            )?,
        };

        Ok(Self::from_buffer(rows, cols, elem, buffer))
    }

    /// Wraps an interleaved 8-bit buffer without conversion.
    pub fn from_bytes(rows: usize, cols: usize, elem: ElementType, bytes: Vec<u8>) -> Result<Self> {
        let expected = buffer_len(rows, cols, elem)?;
        if elem.depth() != Depth::U8 || bytes.len() != expected {
            return Err(HandleRegistryError::DataSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self::from_buffer(rows, cols, elem, MatBuffer::U8(bytes)))
    }

    fn from_buffer(rows: usize, cols: usize, elem: ElementType, buffer: MatBuffer) -> Self {
        debug_assert_eq!(buffer.depth(), elem.depth());
        Self {
            storage: Arc::new(RwLock::new(buffer)),
            elem,
            layout: Layout::dense(rows, cols, elem.channels()),
        }
    }

    pub fn rows(&self) -> usize {
        self.layout.rows
    }

    pub fn cols(&self) -> usize {
        self.layout.cols
    }

    /// Element count, `rows * cols`.
    pub fn total(&self) -> usize {
        self.layout.rows * self.layout.cols
    }

    pub fn element_type(&self) -> ElementType {
        self.elem
    }

    /// True when the window covers its whole buffer.
    #[cfg(test)]
    fn is_dense(&self) -> bool {
        self.layout == Layout::dense(self.layout.rows, self.layout.cols, self.layout.channels)
    }

    /// Number of windows (this one included) sharing the storage.
    #[cfg(test)]
    fn storage_refs(&self) -> usize {
        Arc::strong_count(&self.storage)
    }

    pub fn shares_storage_with(&self, other: &Matrix) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// A second window onto the same storage covering `rect`.
    pub fn view(&self, rect: Rect) -> Result<Matrix> {
        if !rect.fits_within(self.cols(), self.rows()) {
            return Err(HandleRegistryError::RegionOutOfBounds {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                cols: self.cols(),
                rows: self.rows(),
            });
        }
        Ok(Matrix {
            storage: Arc::clone(&self.storage),
            elem: self.elem,
            layout: Layout {
                row_offset: self.layout.row_offset + rect.y as usize,
                col_offset: self.layout.col_offset + rect.x as usize,
                rows: rect.height as usize,
                cols: rect.width as usize,
                ..self.layout
            },
        })
    }

    /// Dense copy of the window's values.
    pub fn snapshot(&self) -> MatBuffer {
        self.storage.read().crop(&self.layout)
    }

    /// Independent dense matrix with the same contents.
    pub fn deep_copy(&self) -> Matrix {
        Self::from_buffer(self.rows(), self.cols(), self.elem, self.snapshot())
    }

    /// Writes `scalar` into every element of the window.
    pub fn set_to(&self, scalar: &Scalar) {
        self.storage.write().fill(&self.layout, scalar);
    }
}
