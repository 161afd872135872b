//! Database configuration
//!
//! ```yaml
//! store_dir: /var/lib/plants
//! index_provider: default
//! compress_snapshots: true
//! sync_on_commit: false
//! log_level: info
//! ```

use crate::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for opening a [`GraphDatabase`](crate::GraphDatabase)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Directory holding the store snapshot; `None` keeps everything in memory
    pub store_dir: Option<PathBuf>,
    /// Provider recorded on indices created without an explicit one
    pub index_provider: String,
    /// Gzip the snapshot file
    pub compress_snapshots: bool,
    /// Write the snapshot after every commit instead of only at shutdown
    pub sync_on_commit: bool,
    /// Default log level when `SAMYAMA_ORM_LOG` is unset
    pub log_level: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            store_dir: None,
            index_provider: "default".to_string(),
            compress_snapshots: true,
            sync_on_commit: false,
            log_level: "info".to_string(),
        }
    }
}

impl GraphConfig {
    pub fn in_memory() -> Self {
        GraphConfig::default()
    }

    pub fn with_store_dir(dir: impl AsRef<Path>) -> Self {
        GraphConfig {
            store_dir: Some(dir.as_ref().to_path_buf()),
            ..GraphConfig::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> GraphResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| GraphError::Storage(format!("invalid config: {}", e)))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> GraphResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GraphError::Storage(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }
}
