//! Registry limits, loaded from an optional file plus `CVBIND_*` variables.

use crate::errors::Result;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default cap on matrix elements (`rows * cols`), 16384 x 16384.
pub const DEFAULT_MAX_MATRIX_ELEMENTS: usize = 1 << 28;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum simultaneously live handles, 0 for unlimited
    pub max_live_handles: usize,
    /// Maximum `rows * cols` of a single matrix, 0 for unlimited
    pub max_matrix_elements: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_live_handles: 0,
            max_matrix_elements: DEFAULT_MAX_MATRIX_ELEMENTS,
        }
    }
}

impl RegistryConfig {
    /// Layers `path` (format chosen by extension) under the `CVBIND_`
    /// environment, e.g. `CVBIND_MAX_LIVE_HANDLES=4096`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(Environment::with_prefix("CVBIND").try_parsing(true));

        let config = builder.build()?.try_deserialize::<RegistryConfig>()?;
        Ok(config)
    }

    pub(crate) fn handle_limit_reached(&self, live: usize) -> bool {
        self.max_live_handles != 0 && live >= self.max_live_handles
    }

    pub(crate) fn matrix_too_large(&self, rows: usize, cols: usize) -> bool {
        if self.max_matrix_elements == 0 {
            return false;
        }
        rows.checked_mul(cols)
            .map_or(true, |total| total > self.max_matrix_elements)
    }
}
