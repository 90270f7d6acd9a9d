//! Table generation from dataset schemas
//!
//! Produces `CREATE TABLE IF NOT EXISTS` statements that work with both DuckDB
//! and PostgreSQL. Intended for development setups where the target tables do
//! not exist yet.

use std::collections::HashSet;
use tracing::{info, warn};

use super::DatabaseBackend;
use super::sql::quote_ident;
use crate::loader::LoadError;
use crate::models::{Schema, SchemaError};
use crate::resolver::{ConfigError, ConfigurationResolver};

/// Build the DDL statement creating a schema's table
///
/// Required fields are not declared `NOT NULL`; presence is checked while
/// decoding the CSV.
pub fn create_table_sql(schema: &Schema) -> Result<String, SchemaError> {
    schema.validate()?;
    let table = schema.table().ok_or(SchemaError::MissingTableName)?;

    let mut columns = Vec::with_capacity(schema.fields.len() + 1);
    for field in &schema.fields {
        columns.push(format!("{} {}", quote_ident(&field.name), field.sql_type()?));
    }
    if let Some(pk) = schema.primary_key() {
        columns.push(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            quote_ident(&format!("pk_{}", table)),
            quote_ident(pk)
        ));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        columns.join(", ")
    ))
}

/// Create the tables of the given datasets
///
/// Only package descriptors carry enough type information, so the resolver
/// must be backed by one. Each table is created once even when several
/// datasets share it.
///
/// # Returns
/// Names of the tables the statements were issued for
pub async fn generate_tables<B>(
    backend: &B,
    resolver: &mut ConfigurationResolver,
    datasets: &[String],
) -> Result<Vec<String>, LoadError>
where
    B: DatabaseBackend + ?Sized,
{
    if resolver.source_kind() != "datapackage" {
        return Err(ConfigError::InvalidSetting(
            "table generation requires a package descriptor".to_string(),
        )
        .into());
    }
    warn!("Generating tables from the package descriptor; intended for development only");

    let mut seen = HashSet::new();
    let mut created = Vec::new();
    for dataset in datasets {
        let config = resolver.resolve(dataset)?;
        if !seen.insert(config.table_name.clone()) {
            continue;
        }

        let ddl = create_table_sql(&config.schema()).map_err(|e| ConfigError::Schema {
            dataset: dataset.clone(),
            source: e,
        })?;
        backend
            .execute(&ddl)
            .await
            .map_err(|e| LoadError::Database {
                dataset: dataset.clone(),
                source: e,
            })?;
        info!("Ensured table {} for dataset {}", config.table_name, dataset);
        created.push(config.table_name);
    }

    Ok(created)
}
