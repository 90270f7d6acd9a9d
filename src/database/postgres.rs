//! PostgreSQL database backend implementation
//!
//! Provides a PostgreSQL backend for server deployments. Insert statements are
//! prepared with explicit parameter types, so each bound value reaches the
//! server with the type the loader checked it against.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::types::{ToSql, Type};
use tracing::{debug, error};

use super::sql::PlaceholderStyle;
use super::{
    DatabaseBackend, DatabaseError, DatabaseResult, InsertStatement, QueryResult, SqlParam,
};
use crate::models::SqlType;

/// PostgreSQL database backend
///
/// Holds one client; transaction state lives on that client between calls.
pub struct PostgresBackend {
    /// PostgreSQL client (wrapped for async access)
    client: Arc<Mutex<tokio_postgres::Client>>,
}

impl PostgresBackend {
    /// Create a new PostgreSQL backend
    ///
    /// # Arguments
    /// * `connection_string` - PostgreSQL connection string
    ///
    /// # Returns
    /// A new PostgreSQL backend instance
    pub async fn new(connection_string: &str) -> DatabaseResult<Self> {
        let (client, connection) =
            tokio_postgres::connect(connection_string, tokio_postgres::NoTls)
                .await
                .map_err(|e| {
                    DatabaseError::ConnectionFailed(format!(
                        "Failed to connect to PostgreSQL: {}",
                        e
                    ))
                })?;

        // Spawn connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self {
            client: Arc::new(Mutex::new(client)),
        })
    }

    /// Server-side parameter type of a destination column
    fn param_type(sql_type: SqlType) -> Type {
        match sql_type {
            SqlType::Char | SqlType::Varchar | SqlType::Text => Type::TEXT,
            SqlType::Integer => Type::INT4,
            SqlType::Numeric => Type::FLOAT8,
            SqlType::Date => Type::DATE,
            SqlType::Timestamp => Type::TIMESTAMP,
        }
    }

    /// Borrow a bound parameter as a driver value
    fn to_sql_ref(param: &SqlParam) -> Box<dyn ToSql + Sync + '_> {
        match param {
            SqlParam::Null(sql_type) => match sql_type {
                SqlType::Char | SqlType::Varchar | SqlType::Text => Box::new(None::<String>),
                SqlType::Integer => Box::new(None::<i32>),
                SqlType::Numeric => Box::new(None::<f64>),
                SqlType::Date => Box::new(None::<chrono::NaiveDate>),
                SqlType::Timestamp => Box::new(None::<chrono::NaiveDateTime>),
            },
            SqlParam::Text(s) => Box::new(s.as_str()),
            SqlParam::Integer(i) => Box::new(*i),
            SqlParam::Numeric(n) => Box::new(*n),
            SqlParam::Date(d) => Box::new(*d),
            SqlParam::Timestamp(ts) => Box::new(*ts),
        }
    }

    async fn transaction_statement(&self, sql: &str) -> DatabaseResult<()> {
        let client = self.client.lock().await;
        client
            .batch_execute(sql)
            .await
            .map_err(|e| DatabaseError::TransactionFailed(format!("{} failed: {}", sql, e)))
    }

    /// Convert a PostgreSQL row to a JSON value
    fn row_to_json(row: &tokio_postgres::Row, columns: &[String]) -> serde_json::Value {
        let mut map = serde_json::Map::new();

        for (i, col_name) in columns.iter().enumerate() {
            let value = Self::get_column_value(row, i);
            map.insert(col_name.clone(), value);
        }

        serde_json::Value::Object(map)
    }

    /// Get a column value as JSON
    fn get_column_value(row: &tokio_postgres::Row, idx: usize) -> serde_json::Value {
        // Try different types
        if let Ok(v) = row.try_get::<_, Option<String>>(idx) {
            return v
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<_, Option<i64>>(idx) {
            return v
                .map(|n| serde_json::Value::Number(n.into()))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<_, Option<i32>>(idx) {
            return v
                .map(|n| serde_json::Value::Number(n.into()))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<_, Option<bool>>(idx) {
            return v
                .map(serde_json::Value::Bool)
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<_, Option<f64>>(idx) {
            return v
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<_, Option<chrono::NaiveDate>>(idx) {
            return v
                .map(|d| serde_json::Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<_, Option<chrono::NaiveDateTime>>(idx) {
            return v
                .map(|ts| {
                    serde_json::Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
                })
                .unwrap_or(serde_json::Value::Null);
        }

        serde_json::Value::Null
    }
}

#[async_trait(?Send)]
impl DatabaseBackend for PostgresBackend {
    async fn begin(&self) -> DatabaseResult<()> {
        self.transaction_statement("BEGIN").await
    }

    async fn execute(&self, sql: &str) -> DatabaseResult<u64> {
        let client = self.client.lock().await;
        client
            .execute(sql, &[])
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Execute failed: {}", e)))
    }

    async fn execute_batch(
        &self,
        statement: &InsertStatement,
        rows: &[Vec<SqlParam>],
    ) -> DatabaseResult<u64> {
        let client = self.client.lock().await;
        let sql = statement.to_sql(PlaceholderStyle::Numbered);
        let types: Vec<Type> = statement
            .sql_types
            .iter()
            .map(|t| Self::param_type(*t))
            .collect();

        let prepared = client
            .prepare_typed(&sql, &types)
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        let mut inserted = 0u64;
        for (index, row) in rows.iter().enumerate() {
            let values: Vec<Box<dyn ToSql + Sync + '_>> =
                row.iter().map(Self::to_sql_ref).collect();
            let params: Vec<&(dyn ToSql + Sync)> = values.iter().map(|v| v.as_ref()).collect();

            inserted += client.execute(&prepared, &params).await.map_err(|e| {
                DatabaseError::BatchFailed {
                    table: statement.table.clone(),
                    statement_index: index,
                    batch_size: rows.len(),
                    cause: e
                        .as_db_error()
                        .map(|db| db.message().to_string())
                        .unwrap_or_else(|| e.to_string()),
                }
            })?;
        }

        debug!("Flushed {} rows into {}", inserted, statement.table);
        Ok(inserted)
    }

    async fn commit(&self) -> DatabaseResult<()> {
        self.transaction_statement("COMMIT").await
    }

    async fn rollback(&self) -> DatabaseResult<()> {
        self.transaction_statement("ROLLBACK").await
    }

    async fn execute_query(&self, sql: &str) -> DatabaseResult<QueryResult> {
        let start = std::time::Instant::now();
        let client = self.client.lock().await;

        let rows = client
            .query(sql, &[])
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let json_rows: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| Self::row_to_json(row, &columns))
            .collect();

        Ok(QueryResult {
            columns,
            rows: json_rows,
            rows_affected: None,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        let result = self.execute_query("SELECT 1 as healthy").await?;
        Ok(!result.rows.is_empty())
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }
}
