//! CLI command implementations

pub mod checksum;
pub mod init;
pub mod load;
pub mod tables;

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::info;

use reference_data_loader::DatabaseBackend;
use reference_data_loader::config::{DatabaseBackendType, LoaderConfig};
use reference_data_loader::resolver::ConfigurationResolver;

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding `.reference-data.toml`
    pub workdir: PathBuf,
    /// Datasets given on the command line
    pub datasets: Vec<String>,
}

/// Load the configuration of the working directory
pub fn load_config(workdir: &Path) -> Result<LoaderConfig> {
    LoaderConfig::load(workdir)
        .with_context(|| format!("Failed to load configuration from {}", workdir.display()))
}

/// Build the resolver and the datasets to process
///
/// Datasets named on the command line replace the configured legacy dataset
/// list, so the shared columns file applies when exactly one is named.
/// Without names, every dataset the source defines is processed.
pub fn open_resolver(
    config: &LoaderConfig,
    explicit: &[String],
) -> Result<(ConfigurationResolver, Vec<String>)> {
    let mut config = config.clone();
    if !explicit.is_empty() {
        config.sources.datasets = explicit.to_vec();
    }

    let resolver = ConfigurationResolver::from_config(&config)?;
    let datasets = if explicit.is_empty() {
        resolver.dataset_names()
    } else {
        explicit.to_vec()
    };
    Ok((resolver, datasets))
}

/// Open the configured database backend
pub async fn open_backend(
    config: &LoaderConfig,
    workdir: &Path,
) -> Result<Box<dyn DatabaseBackend>> {
    match config.database.backend {
        DatabaseBackendType::DuckDB => {
            #[cfg(feature = "duckdb-backend")]
            {
                use reference_data_loader::DuckDBBackend;

                let db_path = config.get_duckdb_path(workdir);
                info!("Opening DuckDB database {}", db_path.display());
                let backend = DuckDBBackend::new(&db_path)
                    .with_context(|| format!("Failed to open {}", db_path.display()))?;
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "duckdb-backend"))]
            {
                let _ = workdir;
                bail!("DuckDB backend not enabled. Build with --features duckdb-backend")
            }
        }
        DatabaseBackendType::Postgres => {
            #[cfg(feature = "postgres-backend")]
            {
                use reference_data_loader::PostgresBackend;

                let Some(conn_str) = config.get_postgres_connection_string() else {
                    bail!("PostgreSQL connection string not configured");
                };
                let backend = PostgresBackend::new(conn_str)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "postgres-backend"))]
            {
                bail!("PostgreSQL backend not enabled. Build with --features postgres-backend")
            }
        }
    }
}
