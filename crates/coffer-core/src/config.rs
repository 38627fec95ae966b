//! Config file resolution shared by the taxonomy and tax tables
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/coffer/config/<name>)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! An explicit path skips both layers and must exist.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Override path for a config file in the platform data dir
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("coffer").join("config").join(file_name))
}

/// Read config text from an explicit path, the data-dir override, or the embedded default
pub(crate) fn resolve(path: Option<&Path>, file_name: &str, embedded: &str) -> Result<String> {
    match path {
        Some(p) if p.exists() => read(p),
        Some(p) => Err(Error::Config(format!(
            "Config file not found: {}",
            p.display()
        ))),
        None => match default_config_path(file_name) {
            Some(override_path) if override_path.exists() => {
                debug!("Using config override {}", override_path.display());
                read(&override_path)
            }
            _ => Ok(embedded.to_string()),
        },
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))
}
