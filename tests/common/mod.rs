//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

use reference_data_loader::database::{
    DatabaseBackend, DatabaseError, DatabaseResult, InsertStatement, PlaceholderStyle, QueryResult,
    SqlParam,
};
use reference_data_loader::resolver::{
    ConfigurationResolver, DataPackageSource, PropertiesSource, ResourceLocator,
};

/// Schema of the `demo` table used across tests
pub const DEMO_SCHEMA: &str = r#"{
    "tableName": "demo",
    "primaryKey": "id",
    "fields": [
        {"name": "id", "type": "integer"},
        {"name": "label", "type": "string", "constraints": {"required": true}}
    ]
}"#;

/// A backend that records every statement instead of executing it
#[derive(Default)]
pub struct RecordingBackend {
    pub statements: Mutex<Vec<String>>,
    pub rows: Mutex<Vec<Vec<SqlParam>>>,
    /// Fail the n-th batch (0-based)
    pub fail_batch: Option<usize>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_batch(index: usize) -> Self {
        Self {
            fail_batch: Some(index),
            ..Self::default()
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn rows(&self) -> Vec<Vec<SqlParam>> {
        self.rows.lock().unwrap().clone()
    }

    fn record(&self, statement: impl Into<String>) {
        self.statements.lock().unwrap().push(statement.into());
    }

    fn batches(&self) -> usize {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.starts_with("INSERT"))
            .count()
    }
}

#[async_trait(?Send)]
impl DatabaseBackend for RecordingBackend {
    async fn begin(&self) -> DatabaseResult<()> {
        self.record("BEGIN");
        Ok(())
    }

    async fn execute(&self, sql: &str) -> DatabaseResult<u64> {
        self.record(sql);
        Ok(0)
    }

    async fn execute_batch(
        &self,
        statement: &InsertStatement,
        rows: &[Vec<SqlParam>],
    ) -> DatabaseResult<u64> {
        if self.fail_batch == Some(self.batches()) {
            return Err(DatabaseError::BatchFailed {
                table: statement.table.clone(),
                statement_index: 0,
                batch_size: rows.len(),
                cause: "injected failure".to_string(),
            });
        }
        self.record(format!(
            "{} x{}",
            statement.to_sql(PlaceholderStyle::QuestionMark),
            rows.len()
        ));
        self.rows.lock().unwrap().extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    async fn commit(&self) -> DatabaseResult<()> {
        self.record("COMMIT");
        Ok(())
    }

    async fn rollback(&self) -> DatabaseResult<()> {
        self.record("ROLLBACK");
        Ok(())
    }

    async fn execute_query(&self, sql: &str) -> DatabaseResult<QueryResult> {
        self.record(sql);
        Ok(QueryResult::empty())
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(true)
    }

    fn backend_type(&self) -> &'static str {
        "recording"
    }
}

pub fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Package descriptor entry for one resource
pub fn resource(name: &str, path: &str, schema: &str) -> String {
    format!(
        r#"{{"name": "{}", "path": "{}", "schema": {}}}"#,
        name, path, schema
    )
}

/// Write `datapackage.json` with the given resource entries
pub fn write_package(dir: &Path, resources: &[String]) {
    write(
        dir,
        "datapackage.json",
        &format!(
            r#"{{"name": "test", "resources": [{}]}}"#,
            resources.join(", ")
        ),
    );
}

/// Write the `demo` dataset with the given CSV content
pub fn write_demo(dir: &Path, csv: &str) {
    write(dir, "demo.csv", csv);
    write_package(dir, &[resource("demo", "demo.csv", DEMO_SCHEMA)]);
}

/// A resolver over `datapackage.json` in `dir`
pub fn package_resolver(dir: &Path) -> ConfigurationResolver {
    let locator = ResourceLocator::new(dir, dir);
    let source = DataPackageSource::open(locator, &dir.join("datapackage.json")).unwrap();
    ConfigurationResolver::new(source)
}

/// A resolver over legacy property files, with CSVs under `data` and
/// property files under `config`
pub fn properties_resolver(data: &Path, config: &Path, datasets: &[&str]) -> ConfigurationResolver {
    let locator = ResourceLocator::new(data, config);
    ConfigurationResolver::new(PropertiesSource::new(
        locator,
        datasets.iter().map(|d| d.to_string()).collect(),
    ))
}

pub fn names(datasets: &[&str]) -> Vec<String> {
    datasets.iter().map(|d| d.to_string()).collect()
}
