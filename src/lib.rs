//! Reference Data Loader - schema-driven CSV ingestion into SQL tables
//!
//! Provides:
//! - Dataset configuration from a package descriptor or legacy property files
//! - Type-directed CSV decoding against a declared schema
//! - Transactional delete-then-insert loading in batches
//! - Configuration fingerprints for change detection
//! - DuckDB and PostgreSQL backends

pub mod codec;
pub mod config;
pub mod database;
pub mod fingerprint;
pub mod loader;
pub mod models;
pub mod resolver;

// Re-export commonly used types
pub use codec::{CellValue, Codec, DecodeError, ValidationError, build_codec};
pub use config::LoaderConfig;
#[cfg(feature = "duckdb-backend")]
pub use database::DuckDBBackend;
#[cfg(feature = "postgres-backend")]
pub use database::PostgresBackend;
pub use database::{DatabaseBackend, DatabaseError, DatabaseResult, SqlParam};
pub use fingerprint::checksum;
pub use loader::{DatasetLoader, DatasetReport, LoadError, LoadPhase, LoadReport};
pub use models::{Constraints, DataPackage, Field, Schema, SchemaError, SqlType};
pub use resolver::{
    ConfigError, ConfigResult, ConfigurationResolver, ConfigurationSource, CsvLocation,
    DatasetConfiguration,
};
