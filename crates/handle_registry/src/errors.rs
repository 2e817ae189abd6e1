//! Error types for the handle registry

use crate::types::{Handle, ObjectKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandleRegistryError {
    #[error("Invalid arguments for {kind}: {reason}")]
    InvalidArguments { kind: ObjectKind, reason: String },

    #[error("Data size mismatch: expected {expected} elements, got {actual}")]
    DataSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid handle: {handle}")]
    InvalidHandle { handle: Handle },

    #[error("Kind mismatch: {operation} does not accept {actual}")]
    KindMismatch {
        operation: &'static str,
        actual: ObjectKind,
    },

    #[error("Index {index} out of range for vector of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Region {x},{y} {width}x{height} exceeds matrix bounds {cols}x{rows}")]
    RegionOutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        cols: usize,
        rows: usize,
    },

    #[error("Registry limit exceeded: {limit} (max {max})")]
    LimitExceeded { limit: &'static str, max: usize },

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl HandleRegistryError {
    pub(crate) fn invalid_args(kind: ObjectKind, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            kind,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HandleRegistryError>;
