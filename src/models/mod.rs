//! Schema model for datasets
//!
//! Defines the in-memory description of a dataset's target table (table name,
//! primary key, dataset key, ordered fields) and the package descriptor
//! document those schemas are read from.

pub mod datapackage;
pub mod field;
pub mod schema;

pub use datapackage::{DataPackage, Resource};
pub use field::{Constraints, Field, LogicalType, SqlType, short_type};
pub use schema::Schema;

use std::path::PathBuf;

/// Error type for schema and descriptor problems
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Logical type cannot be mapped to a SQL type
    #[error("Cannot infer SQL type from type '{0}'")]
    UnknownLogicalType(String),

    /// SQL type is not one of the supported families
    #[error("Unknown SQL type: {0}")]
    UnknownSqlType(String),

    /// Table name is absent or blank
    #[error("Table name is not defined")]
    MissingTableName,

    /// Primary key does not name a field of the schema
    #[error("Primary key '{0}' is not a field of the schema")]
    UnknownPrimaryKey(String),

    /// Descriptor file could not be read
    #[error("Cannot read descriptor {}: {source}", path.display())]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor file is not a valid package descriptor
    #[error("Cannot parse descriptor {}: {message}", path.display())]
    DescriptorParse { path: PathBuf, message: String },
}
