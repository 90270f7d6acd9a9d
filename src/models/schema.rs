//! Schema model for dataset tables

use serde::{Deserialize, Serialize};

use super::{Field, SchemaError};

/// Structural description of a dataset's target table
///
/// `dataset_key` names a discriminator column when several datasets share one
/// physical table; deletes are then scoped to the rows of one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Target table name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    /// Primary key column, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    /// Discriminator column for tables shared between datasets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_key: Option<String>,
    /// Ordered field list
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a schema for a table
    pub fn new(table_name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            table_name: Some(table_name.into()),
            primary_key: None,
            dataset_key: None,
            fields,
        }
    }

    /// Set the primary key column
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = Some(primary_key.into());
        self
    }

    /// Table name, ignoring blank values
    pub fn table(&self) -> Option<&str> {
        self.table_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Primary key, ignoring blank values
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Check the invariants SQL generation relies on
    ///
    /// The table name must be non-empty and the primary key, when present,
    /// must name a declared field.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.table().is_none() {
            return Err(SchemaError::MissingTableName);
        }
        if let Some(pk) = self.primary_key()
            && self.field(pk).is_none()
        {
            return Err(SchemaError::UnknownPrimaryKey(pk.to_string()));
        }
        Ok(())
    }
}
