//! Resource path conventions
//!
//! Property resources live under a configuration root, CSV files and package
//! descriptors under a data root. Absolute paths bypass both roots.

use std::path::{Path, PathBuf};

use super::{ConfigError, CsvLocation};

/// Device path that marks a dataset as intentionally empty
pub const DEV_NULL: &str = "/dev/null";

/// Resolves resource names against the configuration and data roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    data_root: PathBuf,
    config_root: PathBuf,
}

impl ResourceLocator {
    /// Create a locator for the given roots
    pub fn new(data_root: impl Into<PathBuf>, config_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            config_root: config_root.into(),
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn config_root(&self) -> &Path {
        &self.config_root
    }

    /// Path of a configuration resource
    pub fn config_path(&self, name: &str) -> PathBuf {
        resolve(&self.config_root, name)
    }

    /// Path of a data resource
    pub fn data_path(&self, name: &str) -> PathBuf {
        resolve(&self.data_root, name)
    }

    /// Whether a configuration resource exists and is a readable file
    pub fn config_exists(&self, name: &str) -> bool {
        self.config_path(name).is_file()
    }

    /// Read the raw bytes of a configuration resource
    pub fn read_config(&self, dataset: &str, name: &str) -> Result<Vec<u8>, ConfigError> {
        let path = self.config_path(name);
        if !path.is_file() {
            return Err(ConfigError::ResourceNotFound {
                dataset: dataset.to_string(),
                resource: path,
            });
        }
        std::fs::read(&path).map_err(|e| ConfigError::Io { path, source: e })
    }

    /// Where the CSV of a dataset comes from
    ///
    /// `/dev/null` and an empty path (which resolves to the bare data root)
    /// both mean the dataset has no data to load.
    pub fn csv_location(&self, csv_path: &str) -> CsvLocation {
        let csv_path = csv_path.trim();
        if csv_path.is_empty() {
            return CsvLocation::Skip;
        }
        let path = self.data_path(csv_path);
        if path == Path::new(DEV_NULL) || path == self.data_root {
            CsvLocation::Skip
        } else {
            CsvLocation::File(path)
        }
    }
}

fn resolve(root: &Path, name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
