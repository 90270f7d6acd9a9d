//! Package descriptor configuration source

use std::path::{Path, PathBuf};
use tracing::debug;

use super::{
    ConfigError, ConfigResult, ConfigurationSource, DatasetConfiguration, ResourceLocator,
};
use crate::database::sql;
use crate::models::DataPackage;

/// Resolves datasets from the resources of a package descriptor
#[derive(Debug, Clone)]
pub struct DataPackageSource {
    locator: ResourceLocator,
    descriptor_path: PathBuf,
    package: DataPackage,
}

impl DataPackageSource {
    /// Load the descriptor at `path`
    pub fn open(locator: ResourceLocator, path: &Path) -> ConfigResult<Self> {
        if !path.is_file() {
            return Err(ConfigError::DescriptorNotFound(path.to_path_buf()));
        }
        let package = DataPackage::load(path).map_err(|e| ConfigError::Schema {
            dataset: path.display().to_string(),
            source: e,
        })?;
        debug!(
            "Loaded package descriptor '{}' with {} resources",
            package.name,
            package.resources.len()
        );
        Ok(Self::from_package(locator, path, package))
    }

    /// Wrap an already loaded descriptor
    pub fn from_package(locator: ResourceLocator, path: &Path, package: DataPackage) -> Self {
        Self {
            locator,
            descriptor_path: path.to_path_buf(),
            package,
        }
    }

    pub fn package(&self) -> &DataPackage {
        &self.package
    }

    fn not_found(&self, dataset: &str) -> ConfigError {
        ConfigError::ResourceNotFound {
            dataset: dataset.to_string(),
            resource: self.descriptor_path.clone(),
        }
    }
}

impl ConfigurationSource for DataPackageSource {
    fn kind(&self) -> &'static str {
        "datapackage"
    }

    fn dataset_names(&self) -> Vec<String> {
        self.package.resource_names()
    }

    fn resolve(&mut self, dataset: &str) -> ConfigResult<DatasetConfiguration> {
        let resource = self
            .package
            .resource(dataset)
            .ok_or_else(|| self.not_found(dataset))?;
        let schema = &resource.schema;

        let table_name = schema
            .table()
            .ok_or_else(|| ConfigError::MissingTableName {
                dataset: dataset.to_string(),
            })?
            .to_string();
        schema.validate().map_err(|e| ConfigError::Schema {
            dataset: dataset.to_string(),
            source: e,
        })?;

        let dataset_key = schema
            .dataset_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        let delete_query = match resource.delete_query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => sql::substitute_table(query, &table_name),
            _ => sql::default_delete_query(&table_name, dataset_key.as_deref(), &resource.name),
        };

        Ok(DatasetConfiguration {
            dataset: dataset.to_string(),
            csv: self.locator.csv_location(&resource.path),
            delete_query,
            primary_key: schema.primary_key().map(str::to_string),
            dataset_key,
            fields: schema.fields.clone(),
            table_name,
        })
    }

    fn resource_bytes(&mut self, dataset: &str) -> ConfigResult<Vec<u8>> {
        self.package
            .resource_entry_bytes(dataset)
            .ok_or_else(|| self.not_found(dataset))
    }
}
