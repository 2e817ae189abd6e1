//! Handle registry for computer-vision objects exposed to a host runtime
//!
//! The host never touches matrices, points or rectangles directly. It holds
//! `{id, type}` handles, and every operation (create, convert to a host
//! value, copy out of a vector, read raw data, take a sub-region, release)
//! goes through [`HandleRegistry`], which checks the handle's generation and
//! kind before touching the instance.
//!
//! Sub-regions are views: they share the source matrix's storage, which stays
//! alive until the last window onto it is released.

pub mod arena;
pub mod args;
pub mod errors;
pub mod geometry;
pub mod matrix;
pub mod registry;
pub mod settings;
pub mod types;
pub mod value;

pub use args::ObjectSpec;
pub use errors::*;
pub use geometry::{Point, Rect, RotatedRect, Scalar, Size, Vec3b};
pub use registry::HandleRegistry;
pub use settings::RegistryConfig;
pub use types::*;
pub use value::{BufferData, BufferFormat, MatBufferData, MatData, ObjectValue, SizeF};
