//! Query layer configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default depth limit when expanding eager relations.
pub const DEFAULT_MAX_FETCH_DEPTH: usize = 8;

fn default_max_fetch_depth() -> usize {
    DEFAULT_MAX_FETCH_DEPTH
}

/// Errors loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Limits applied by the executor, the paginator and the in-memory session.
///
/// One value can be handed to both sides. The executor side (`Repository`,
/// `Select`, `QueryExecutor`) reads `max_page_size` and `max_result_rows`;
/// `max_fetch_depth` only takes effect through `MemorySession::with_config`,
/// since relation loading belongs to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Largest accepted page size. None means unbounded.
    pub max_page_size: Option<u32>,

    /// Largest accepted list result. None means unbounded.
    pub max_result_rows: Option<usize>,

    /// How deep statically eager relations are followed. Read by the session only.
    #[serde(default = "default_max_fetch_depth")]
    pub max_fetch_depth: usize,
}

impl QueryConfig {
    /// Configuration without limits.
    pub fn new() -> Self {
        Self {
            max_page_size: None,
            max_result_rows: None,
            max_fetch_depth: DEFAULT_MAX_FETCH_DEPTH,
        }
    }

    /// Set the maximum page size.
    pub fn with_max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = Some(size);
        self
    }

    /// Set the maximum list result size.
    pub fn with_max_result_rows(mut self, rows: usize) -> Self {
        self.max_result_rows = Some(rows);
        self
    }

    /// Set the eager expansion depth.
    pub fn with_max_fetch_depth(mut self, depth: usize) -> Self {
        self.max_fetch_depth = depth;
        self
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self::new()
    }
}
