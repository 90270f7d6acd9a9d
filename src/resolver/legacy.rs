//! Legacy property file configuration source
//!
//! Each dataset is described by `<dataset>_dataset.properties`:
//!
//! ```text
//! __CSV_FILE=demo.csv
//! __TABLE=demo
//! __DELETE_SQL=DELETE FROM "${table}" WHERE source = 'demo'
//! ```
//!
//! and its table by `<table>_columns.properties`:
//!
//! ```text
//! __COLUMNS=id,label
//! id.type=int
//! id.constraints=is_index
//! label.type=varchar(255)
//! label.constraints=required
//! ```

use std::collections::HashMap;
use tracing::{debug, warn};

use super::{
    ConfigError, ConfigResult, ConfigurationSource, DatasetConfiguration, Properties,
    ResourceLocator,
};
use crate::database::sql;
use crate::models::Field;

/// CSV file used when a dataset does not name one
pub const DEFAULT_CSV_FILE: &str = "values.csv";

/// Column file shared by all tables of a single-dataset setup
pub const SHARED_COLUMNS_FILE: &str = "columns.properties";

/// SQL type assumed for columns without a `.type` entry
pub const DEFAULT_COLUMN_TYPE: &str = "VARCHAR";

const KEY_CSV_FILE: &str = "__CSV_FILE";
const KEY_TABLE: &str = "__TABLE";
const KEY_DELETE_SQL: &str = "__DELETE_SQL";
const KEY_COLUMNS: &str = "__COLUMNS";

/// Resolves datasets from `.properties` files under the configuration root
#[derive(Debug, Clone)]
pub struct PropertiesSource {
    locator: ResourceLocator,
    datasets: Vec<String>,
    /// Parsed files by resource name, with their raw bytes
    files: HashMap<String, (Vec<u8>, Properties)>,
}

impl PropertiesSource {
    pub fn new(locator: ResourceLocator, datasets: Vec<String>) -> Self {
        Self {
            locator,
            datasets,
            files: HashMap::new(),
        }
    }

    fn dataset_file(dataset: &str) -> String {
        format!("{}_dataset.properties", dataset)
    }

    /// Name of the column file describing `table`
    ///
    /// The shared columns file stands in for a missing table file only when
    /// the source was created for exactly one dataset.
    fn columns_file(&self, table: &str) -> String {
        let file = format!("{}_columns.properties", table.to_lowercase());
        if !self.locator.config_exists(&file)
            && self.datasets.len() == 1
            && self.locator.config_exists(SHARED_COLUMNS_FILE)
        {
            return SHARED_COLUMNS_FILE.to_string();
        }
        file
    }

    /// Read and parse a property file once per source
    fn load(&mut self, dataset: &str, name: &str) -> ConfigResult<()> {
        if !self.files.contains_key(name) {
            let bytes = self.locator.read_config(dataset, name)?;
            let properties = Properties::from_bytes(&bytes);
            debug!("Parsed {} ({} entries)", name, properties.len());
            self.files.insert(name.to_string(), (bytes, properties));
        }
        Ok(())
    }

    fn cached(&self, dataset: &str, name: &str) -> ConfigResult<&(Vec<u8>, Properties)> {
        self.files
            .get(name)
            .ok_or_else(|| ConfigError::ResourceNotFound {
                dataset: dataset.to_string(),
                resource: self.locator.config_path(name),
            })
    }

    fn table_name(&mut self, dataset: &str) -> ConfigResult<String> {
        let dataset_file = Self::dataset_file(dataset);
        self.load(dataset, &dataset_file)?;
        let (_, props) = self.cached(dataset, &dataset_file)?;
        props
            .get_trimmed(KEY_TABLE)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingTableName {
                dataset: dataset.to_string(),
            })
    }
}

/// Whether a column is flagged as the table's index
fn is_index(columns: &Properties, column: &str) -> bool {
    constraint_tokens(columns, column).any(|t| t == "is_index")
        || columns
            .get_trimmed(&format!("{}.is_index", column))
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn constraint_tokens<'a>(columns: &'a Properties, column: &str) -> impl Iterator<Item = &'a str> {
    columns
        .get(&format!("{}.constraints", column))
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl ConfigurationSource for PropertiesSource {
    fn kind(&self) -> &'static str {
        "properties"
    }

    fn dataset_names(&self) -> Vec<String> {
        self.datasets.clone()
    }

    fn resolve(&mut self, dataset: &str) -> ConfigResult<DatasetConfiguration> {
        let table_name = self.table_name(dataset)?;
        let dataset_file = Self::dataset_file(dataset);
        let columns_file = self.columns_file(&table_name);
        self.load(dataset, &columns_file)?;

        let (_, props) = self.cached(dataset, &dataset_file)?;
        let csv_file = props.get_trimmed(KEY_CSV_FILE).unwrap_or(DEFAULT_CSV_FILE);
        let csv = self.locator.csv_location(csv_file);
        let delete_query = match props.get_trimmed(KEY_DELETE_SQL) {
            Some(query) => sql::substitute_table(query, &table_name),
            None => sql::default_delete_query(&table_name, None, dataset),
        };

        let (_, columns) = self.cached(dataset, &columns_file)?;
        let column_list =
            columns
                .get_trimmed(KEY_COLUMNS)
                .ok_or_else(|| ConfigError::MissingProperty {
                    resource: self.locator.config_path(&columns_file),
                    key: KEY_COLUMNS.to_string(),
                })?;

        let mut fields = Vec::new();
        let mut primary_key = None;
        for column in column_list.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            let sql_type = match columns.get_trimmed(&format!("{}.type", column)) {
                Some(sql_type) => sql_type,
                None => {
                    warn!(
                        "Column type for {} is not defined in {}, using {}",
                        column, columns_file, DEFAULT_COLUMN_TYPE
                    );
                    DEFAULT_COLUMN_TYPE
                }
            };

            let mut field = Field::with_sql_type(column, sql_type);
            if constraint_tokens(columns, column).any(|t| t == "required") {
                field = field.required();
            }
            if primary_key.is_none() && is_index(columns, column) {
                primary_key = Some(column.to_string());
            }
            fields.push(field);
        }

        Ok(DatasetConfiguration {
            dataset: dataset.to_string(),
            table_name,
            csv,
            delete_query,
            primary_key,
            dataset_key: None,
            fields,
        })
    }

    fn resource_bytes(&mut self, dataset: &str) -> ConfigResult<Vec<u8>> {
        let table_name = self.table_name(dataset)?;
        let dataset_file = Self::dataset_file(dataset);
        let columns_file = self.columns_file(&table_name);
        self.load(dataset, &columns_file)?;

        let mut bytes = self.cached(dataset, &dataset_file)?.0.clone();
        bytes.extend_from_slice(&self.cached(dataset, &columns_file)?.0);
        Ok(bytes)
    }
}
