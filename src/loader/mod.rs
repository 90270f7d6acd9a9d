//! Transactional dataset loading
//!
//! Loads a set of datasets inside one transaction. Every dataset is prepared
//! first (configuration resolved, CSV header read, decoders built), so
//! configuration and header problems abort the load before any SQL runs.
//! Each dataset then goes through
//!
//! ```text
//! Idle -> DeletePhase -> StreamPhase <-> FlushPhase -> Committed
//! ```
//!
//! with any failure ending in `Failed` and rolling back the whole set.

pub mod bind;

pub use bind::{BindMismatch, bind};

use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::codec::{Codec, DecodeError, ValidationError, build_codec};
use crate::config::DEFAULT_BATCH_SIZE;
use crate::database::{DatabaseBackend, DatabaseError, InsertStatement, SqlParam};
use crate::resolver::{ConfigError, ConfigurationResolver, CsvLocation, DatasetConfiguration};

/// Error type for a load invocation
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Configuration could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// CSV header does not fit the schema
    #[error("Dataset '{dataset}' (table '{table}'): {source}")]
    Validation {
        dataset: String,
        table: String,
        #[source]
        source: ValidationError,
    },

    /// A cell could not be decoded
    #[error("Dataset '{dataset}' (table '{table}'), line {line}: {source}")]
    Decode {
        dataset: String,
        table: String,
        line: u64,
        #[source]
        source: DecodeError,
    },

    /// A decoded value does not have the representation of its column type
    #[error(
        "Dataset '{dataset}' (table '{table}'), line {line}: column '{column}' expects a {expected} value, got {actual}"
    )]
    TypeMismatch {
        dataset: String,
        table: String,
        line: u64,
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The CSV file could not be read
    #[error("Cannot read CSV {} for dataset '{dataset}': {source}", path.display())]
    Csv {
        dataset: String,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A statement of a dataset failed
    #[error("Database error in dataset '{dataset}': {source}")]
    Database {
        dataset: String,
        #[source]
        source: DatabaseError,
    },

    /// Starting or committing the transaction failed
    #[error("Transaction failed: {0}")]
    Transaction(#[source] DatabaseError),
}

/// Load state of one dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    #[default]
    Idle,
    DeletePhase,
    StreamPhase,
    FlushPhase,
    Committed,
    Failed,
}

/// Outcome of loading one dataset
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DatasetReport {
    pub dataset: String,
    pub table: String,
    pub rows_inserted: u64,
    pub batches_flushed: u64,
    pub rows_deleted: u64,
    /// Non-fatal findings, such as schema columns missing from the CSV
    pub warnings: Vec<String>,
    /// The dataset is marked as intentionally empty
    pub skipped: bool,
    pub phase: LoadPhase,
}

/// Outcome of a load invocation
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LoadReport {
    pub datasets: Vec<DatasetReport>,
}

impl LoadReport {
    /// Rows inserted across all datasets
    pub fn total_rows(&self) -> u64 {
        self.datasets.iter().map(|d| d.rows_inserted).sum()
    }

    /// Report of one dataset
    pub fn dataset(&self, dataset: &str) -> Option<&DatasetReport> {
        self.datasets.iter().find(|d| d.dataset == dataset)
    }
}

/// A dataset ready to stream: header read, decoders built
struct PreparedLoad {
    path: PathBuf,
    reader: csv::Reader<File>,
    codec: Codec,
    statement: InsertStatement,
}

struct PreparedDataset {
    config: DatasetConfiguration,
    /// None for datasets marked as intentionally empty
    load: Option<PreparedLoad>,
    report: DatasetReport,
}

/// Loads datasets through a backend
///
/// # Example
///
/// ```rust,no_run
/// use reference_data_loader::config::LoaderConfig;
/// use reference_data_loader::database::DuckDBBackend;
/// use reference_data_loader::loader::DatasetLoader;
/// use reference_data_loader::resolver::ConfigurationResolver;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = LoaderConfig::load(std::path::Path::new("."))?;
/// let resolver = ConfigurationResolver::from_config(&config)?;
/// let datasets = resolver.dataset_names();
/// let backend = DuckDBBackend::new("reference-data.duckdb")?;
///
/// let report = DatasetLoader::new(&backend, resolver)
///     .with_batch_size(config.load.batch_size)
///     .load(&datasets)
///     .await?;
/// println!("{} rows loaded", report.total_rows());
/// # Ok(())
/// # }
/// ```
pub struct DatasetLoader<'a, B: DatabaseBackend + ?Sized> {
    backend: &'a B,
    resolver: ConfigurationResolver,
    batch_size: usize,
}

impl<'a, B: DatabaseBackend + ?Sized> DatasetLoader<'a, B> {
    pub fn new(backend: &'a B, resolver: ConfigurationResolver) -> Self {
        Self {
            backend,
            resolver,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the number of rows per insert batch (at least 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Load datasets in order inside a single transaction
    ///
    /// Either every dataset is committed or none is.
    pub async fn load(&mut self, datasets: &[String]) -> Result<LoadReport, LoadError> {
        let mut prepared = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            prepared.push(self.prepare(dataset)?);
        }

        if prepared.iter().all(|p| p.load.is_none()) {
            let datasets = prepared
                .into_iter()
                .map(|mut p| {
                    p.report.phase = LoadPhase::Committed;
                    p.report
                })
                .collect();
            return Ok(LoadReport { datasets });
        }

        self.backend.begin().await.map_err(LoadError::Transaction)?;

        let outcome = self.run(&mut prepared).await;
        match outcome {
            Ok(()) => {
                let datasets: Vec<DatasetReport> = prepared
                    .into_iter()
                    .map(|mut p| {
                        p.report.phase = LoadPhase::Committed;
                        p.report
                    })
                    .collect();
                info!(
                    "Committed {} datasets ({} rows)",
                    datasets.len(),
                    datasets.iter().map(|d| d.rows_inserted).sum::<u64>()
                );
                Ok(LoadReport { datasets })
            }
            Err(e) => {
                if let Err(rollback_err) = self.backend.rollback().await {
                    error!("Rollback failed after load error: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Resolve a dataset and read its CSV header
    fn prepare(&mut self, dataset: &str) -> Result<PreparedDataset, LoadError> {
        let config = self.resolver.resolve(dataset)?;
        let mut report = DatasetReport {
            dataset: dataset.to_string(),
            table: config.table_name.clone(),
            ..Default::default()
        };

        let path = match config.csv.clone() {
            CsvLocation::Skip => {
                warn!("Dataset {} is marked as empty, skipping", dataset);
                report.skipped = true;
                return Ok(PreparedDataset {
                    config,
                    load: None,
                    report,
                });
            }
            CsvLocation::File(path) => path,
        };

        let csv_error = |source: csv::Error| LoadError::Csv {
            dataset: dataset.to_string(),
            path: path.clone(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .map_err(csv_error)?;
        let header: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let name = if i == 0 {
                    name.trim_start_matches('\u{feff}')
                } else {
                    name
                };
                name.trim().to_string()
            })
            .collect();

        let codec = build_codec(&config.fields, config.primary_key.as_deref(), &header).map_err(
            |source| LoadError::Validation {
                dataset: dataset.to_string(),
                table: config.table_name.clone(),
                source,
            },
        )?;
        report.warnings = codec.warnings.clone();
        let statement = codec.insert_statement(&config.table_name);

        Ok(PreparedDataset {
            config,
            load: Some(PreparedLoad {
                path,
                reader,
                codec,
                statement,
            }),
            report,
        })
    }

    async fn run(&self, prepared: &mut [PreparedDataset]) -> Result<(), LoadError> {
        for dataset in prepared.iter_mut() {
            let span = info_span!(
                "dataset",
                dataset = %dataset.config.dataset,
                table = %dataset.config.table_name
            );
            let result = self.load_dataset(dataset).instrument(span).await;
            if let Err(e) = result {
                dataset.report.phase = LoadPhase::Failed;
                error!("Loading dataset {} failed: {}", dataset.config.dataset, e);
                return Err(e);
            }
        }

        self.backend.commit().await.map_err(LoadError::Transaction)
    }

    async fn load_dataset(&self, dataset: &mut PreparedDataset) -> Result<(), LoadError> {
        let PreparedDataset {
            config,
            load,
            report,
        } = dataset;
        let config = &*config;
        let Some(load) = load.as_mut() else {
            return Ok(());
        };
        let database_error = |source: DatabaseError| LoadError::Database {
            dataset: config.dataset.clone(),
            source,
        };

        report.phase = LoadPhase::DeletePhase;
        info!("Loading dataset {} into {}", config.dataset, config.table_name);
        debug!(phase = ?report.phase, "{}", config.delete_query);
        report.rows_deleted = self
            .backend
            .execute(&config.delete_query)
            .await
            .map_err(database_error)?;

        report.phase = LoadPhase::StreamPhase;
        let mut batch: Vec<Vec<SqlParam>> = Vec::with_capacity(self.batch_size);
        let mut record = csv::StringRecord::new();
        loop {
            let has_record = load
                .reader
                .read_record(&mut record)
                .map_err(|source| LoadError::Csv {
                    dataset: config.dataset.clone(),
                    path: load.path.clone(),
                    source,
                })?;
            if !has_record {
                break;
            }
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let values = load
                .codec
                .decode_row(record.iter())
                .map_err(|source| LoadError::Decode {
                    dataset: config.dataset.clone(),
                    table: config.table_name.clone(),
                    line,
                    source,
                })?;

            let mut row = Vec::with_capacity(values.len());
            for (value, column) in values.into_iter().zip(&load.codec.columns) {
                let param = bind(value, column.sql_type).map_err(|m| LoadError::TypeMismatch {
                    dataset: config.dataset.clone(),
                    table: config.table_name.clone(),
                    line,
                    column: column.name.clone(),
                    expected: m.expected,
                    actual: m.actual,
                })?;
                row.push(param);
            }
            batch.push(row);

            if batch.len() >= self.batch_size {
                self.flush(&load.statement, &mut batch, report)
                    .await
                    .map_err(database_error)?;
            }
        }

        if !batch.is_empty() {
            self.flush(&load.statement, &mut batch, report)
                .await
                .map_err(database_error)?;
        }

        info!(
            "Dataset {} loaded: {} rows deleted, {} rows inserted in {} batches",
            config.dataset, report.rows_deleted, report.rows_inserted, report.batches_flushed
        );
        Ok(())
    }

    async fn flush(
        &self,
        statement: &InsertStatement,
        batch: &mut Vec<Vec<SqlParam>>,
        report: &mut DatasetReport,
    ) -> Result<(), DatabaseError> {
        report.phase = LoadPhase::FlushPhase;
        debug!(phase = ?report.phase, "Flushing {} rows into {}", batch.len(), statement.table);

        report.rows_inserted += self.backend.execute_batch(statement, batch).await?;
        report.batches_flushed += 1;
        batch.clear();

        report.phase = LoadPhase::StreamPhase;
        Ok(())
    }
}
