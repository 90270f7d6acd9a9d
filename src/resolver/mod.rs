//! Configuration resolution
//!
//! Turns a dataset identifier into the parameters needed to load it: target
//! table, CSV location, delete statement, primary key and ordered fields.
//! Two interchangeable sources provide this information, a package descriptor
//! or legacy property files. The source is chosen once per invocation and the
//! loader only ever sees the resolved [`DatasetConfiguration`].

pub mod datapackage;
pub mod legacy;
pub mod locator;
pub mod properties;

pub use datapackage::DataPackageSource;
pub use legacy::PropertiesSource;
pub use locator::ResourceLocator;
pub use properties::Properties;

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::LoaderConfig;
use crate::models::{Field, Schema, SchemaError};

/// Error type for configuration problems
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A descriptor or property resource backing a dataset does not exist
    #[error("Resource not found for dataset '{dataset}': {}", resource.display())]
    ResourceNotFound { dataset: String, resource: PathBuf },

    /// The configured package descriptor does not exist
    #[error("Package descriptor not found: {}", .0.display())]
    DescriptorNotFound(PathBuf),

    /// No table name could be resolved for a dataset
    #[error("Table name is not defined for dataset '{dataset}'")]
    MissingTableName { dataset: String },

    /// A required property is absent from a property resource
    #[error("Property '{key}' is missing in {}", resource.display())]
    MissingProperty { resource: PathBuf, key: String },

    /// Schema of a dataset is invalid
    #[error("Invalid schema for dataset '{dataset}': {source}")]
    Schema {
        dataset: String,
        #[source]
        source: SchemaError,
    },

    /// A configuration resource could not be read
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed or written
    #[error("Configuration file error: {0}")]
    Parse(String),

    /// A setting has an unusable value
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

/// Result type for configuration resolution
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where a dataset's rows come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvLocation {
    /// The dataset is intentionally empty; nothing is deleted or inserted
    Skip,
    /// CSV file to stream
    File(PathBuf),
}

impl CsvLocation {
    pub fn is_skip(&self) -> bool {
        matches!(self, CsvLocation::Skip)
    }
}

/// Resolved load parameters for one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfiguration {
    /// Dataset identifier
    pub dataset: String,
    /// Target table
    pub table_name: String,
    pub csv: CsvLocation,
    /// Statement run before inserting
    pub delete_query: String,
    pub primary_key: Option<String>,
    pub dataset_key: Option<String>,
    /// Ordered field list
    pub fields: Vec<Field>,
}

impl DatasetConfiguration {
    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Schema view of this configuration, as used for table generation
    pub fn schema(&self) -> Schema {
        Schema {
            table_name: Some(self.table_name.clone()),
            primary_key: self.primary_key.clone(),
            dataset_key: self.dataset_key.clone(),
            fields: self.fields.clone(),
        }
    }
}

/// A provider of dataset configurations
///
/// Implemented by the package descriptor source and the legacy property
/// source. Sources may cache what they parse; they live for one invocation.
pub trait ConfigurationSource {
    /// Short name of the source kind, for logs
    fn kind(&self) -> &'static str;

    /// Datasets this source defines on its own, in declaration order
    ///
    /// Legacy property files cannot be enumerated and return the configured
    /// dataset list instead.
    fn dataset_names(&self) -> Vec<String>;

    /// Resolve the configuration of one dataset
    fn resolve(&mut self, dataset: &str) -> ConfigResult<DatasetConfiguration>;

    /// Raw bytes of the resources backing a dataset's configuration
    fn resource_bytes(&mut self, dataset: &str) -> ConfigResult<Vec<u8>>;
}

/// Resolves dataset identifiers through one configuration source
///
/// Resolutions are cached for the lifetime of the resolver. Create a new
/// resolver for each invocation so changes on disk are picked up.
pub struct ConfigurationResolver {
    source: Box<dyn ConfigurationSource>,
    cache: HashMap<String, DatasetConfiguration>,
}

impl ConfigurationResolver {
    /// Create a resolver over a source
    pub fn new(source: impl ConfigurationSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: HashMap::new(),
        }
    }

    /// Create a resolver from loader settings
    ///
    /// A configured package descriptor is authoritative; legacy property files
    /// are used otherwise.
    pub fn from_config(config: &LoaderConfig) -> ConfigResult<Self> {
        let locator = ResourceLocator::new(
            &config.sources.data_root,
            &config.sources.config_root,
        );

        match config.sources.datapackage.as_deref().map(str::trim) {
            Some(descriptor) if !descriptor.is_empty() => {
                let path = locator.data_path(descriptor);
                info!("Using package descriptor {}", path.display());
                Ok(Self::new(DataPackageSource::open(locator, &path)?))
            }
            _ => {
                info!(
                    "Using property files under {}",
                    locator.config_root().display()
                );
                Ok(Self::new(PropertiesSource::new(
                    locator,
                    config.sources.datasets.clone(),
                )))
            }
        }
    }

    pub fn source_kind(&self) -> &'static str {
        self.source.kind()
    }

    /// Dataset identifiers to process when none are given explicitly
    pub fn dataset_names(&self) -> Vec<String> {
        self.source.dataset_names()
    }

    /// Resolve a dataset, reusing an earlier resolution
    pub fn resolve(&mut self, dataset: &str) -> ConfigResult<DatasetConfiguration> {
        if let Some(cached) = self.cache.get(dataset) {
            return Ok(cached.clone());
        }
        let resolved = self.source.resolve(dataset)?;
        debug!(
            "Resolved dataset '{}' to table '{}' ({} fields)",
            dataset,
            resolved.table_name,
            resolved.fields.len()
        );
        self.cache.insert(dataset.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Raw bytes of the resources backing a dataset's configuration
    pub fn resource_bytes(&mut self, dataset: &str) -> ConfigResult<Vec<u8>> {
        self.source.resource_bytes(dataset)
    }
}

impl std::fmt::Debug for ConfigurationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationResolver")
            .field("source", &self.source.kind())
            .field("cached", &self.cache.len())
            .finish()
    }
}
