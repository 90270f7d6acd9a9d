//! Database backend abstraction
//!
//! This module provides the connection seam the loader writes through:
//! - DuckDB: Embedded database, file based or in-memory
//! - PostgreSQL: For server deployments
//!
//! A backend holds exactly one connection. The loader drives it strictly
//! sequentially: begin, delete, batched inserts, commit or rollback.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// Re-export implementations based on features
#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

#[cfg(feature = "postgres-backend")]
pub mod postgres;

pub mod schema;
pub mod sql;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDBBackend;

#[cfg(feature = "postgres-backend")]
pub use self::postgres::PostgresBackend;

pub use schema::{create_table_sql, generate_tables};
pub use sql::{InsertStatement, PlaceholderStyle};

use crate::models::SqlType;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction control failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A statement of an insert batch failed
    #[error(
        "Batch insert into '{table}' failed at statement {statement_index} of {batch_size}: {cause}"
    )]
    BatchFailed {
        table: String,
        /// Zero-based position of the first failing statement in the batch
        statement_index: usize,
        batch_size: usize,
        cause: String,
    },
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// A typed value bound to one insert parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// SQL null of the given destination type
    Null(SqlType),
    Text(String),
    Integer(i32),
    Numeric(f64),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

/// Query result row as a JSON value
pub type QueryRow = serde_json::Value;

/// Query result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data
    pub rows: Vec<QueryRow>,
    /// Number of rows affected (for INSERT/UPDATE/DELETE)
    pub rows_affected: Option<u64>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: None,
            execution_time_ms: 0,
        }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row as an integer, as returned by `COUNT(*)`
    pub fn scalar_i64(&self) -> Option<i64> {
        let column = self.columns.first()?;
        let value = self.rows.first()?.get(column)?;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }
}

/// Database backend trait for loading datasets
///
/// All operations are async so network backends can suspend on I/O. Callers
/// await each operation before issuing the next; a backend never sees two
/// operations in flight.
#[async_trait(?Send)]
pub trait DatabaseBackend: Send + Sync {
    /// Start a transaction spanning all following statements
    async fn begin(&self) -> DatabaseResult<()>;

    /// Execute a statement that returns no rows
    ///
    /// # Returns
    /// Number of rows affected
    async fn execute(&self, sql: &str) -> DatabaseResult<u64>;

    /// Execute an insert once per row of a batch
    ///
    /// The first failing row aborts the batch with
    /// [`DatabaseError::BatchFailed`].
    ///
    /// # Arguments
    /// * `statement` - Insert statement; its placeholders are rendered by the backend
    /// * `rows` - Parameter rows, each parallel to `statement.columns`
    ///
    /// # Returns
    /// Number of rows inserted
    async fn execute_batch(
        &self,
        statement: &InsertStatement,
        rows: &[Vec<SqlParam>],
    ) -> DatabaseResult<u64>;

    /// Commit the current transaction
    async fn commit(&self) -> DatabaseResult<()>;

    /// Roll back the current transaction
    async fn rollback(&self) -> DatabaseResult<()>;

    /// Execute a SQL query and return results
    ///
    /// # Arguments
    /// * `sql` - SQL query to execute
    ///
    /// # Returns
    /// Query result with columns and rows
    async fn execute_query(&self, sql: &str) -> DatabaseResult<QueryResult>;

    /// Check if database is healthy and accessible
    ///
    /// # Returns
    /// True if healthy
    async fn health_check(&self) -> DatabaseResult<bool>;

    /// Get the database backend type name
    ///
    /// # Returns
    /// Backend type string ("duckdb" or "postgres")
    fn backend_type(&self) -> &'static str;
}
