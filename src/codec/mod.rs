//! Type-directed CSV decoding
//!
//! Builds one decode rule per CSV header column from a dataset's fields.
//! The header order governs decoding and binding order; the schema may
//! declare more columns than the CSV carries, but never fewer.

pub mod rule;

pub use rule::{DecodeKind, DecodeRule, ValueCheck};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::database::InsertStatement;
use crate::models::{Field, SchemaError, SqlType};

/// Error type for CSV headers that cannot be decoded with a schema
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Header columns the schema does not declare
    #[error("CSV columns not declared in the schema: {}", .0.join(", "))]
    UnknownColumn(Vec<String>),

    /// A header column appears more than once
    #[error("CSV column '{0}' appears more than once in the header")]
    DuplicateColumn(String),

    /// A column's type is not supported
    #[error("Unsupported type '{sql_type}' for column '{column}'")]
    UnknownType { column: String, sql_type: String },

    /// A column's pattern constraint is not a valid regular expression
    #[error("Invalid pattern '{pattern}' for column '{column}': {message}")]
    InvalidPattern {
        column: String,
        pattern: String,
        message: String,
    },
}

/// Error type for cells that cannot be decoded
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Missing value for required column '{column}'")]
    MissingValue { column: String },

    #[error("Invalid integer '{value}' in column '{column}'")]
    InvalidInteger { column: String, value: String },

    #[error("Invalid number '{value}' in column '{column}'")]
    InvalidNumeric { column: String, value: String },

    #[error("Invalid date '{value}' in column '{column}', expected YYYY-MM-DD")]
    InvalidDate { column: String, value: String },

    #[error("Invalid timestamp '{value}' in column '{column}', expected YYYY-MM-DDTHH:MM:SS")]
    InvalidTimestamp { column: String, value: String },

    /// A value repeats in a column whose values must be unique
    #[error("Duplicate value '{value}' in unique column '{column}'")]
    DuplicateValue { column: String, value: String },

    #[error("Value '{value}' in column '{column}' must be {constraint}")]
    ConstraintViolation {
        column: String,
        value: String,
        constraint: String,
    },

    /// The row does not have one cell per header column
    #[error("Row has {actual} cells, header has {expected} columns")]
    CellCount { expected: usize, actual: usize },
}

/// A decoded cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Integer(i32),
    Numeric(f64),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl CellValue {
    /// Name of the runtime representation, comparable with
    /// [`SqlType::expected_representation`]
    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Text(_) => "string",
            CellValue::Integer(_) => "integer",
            CellValue::Numeric(_) => "numeric",
            CellValue::Date(_) => "date",
            CellValue::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Decoder of one CSV column
#[derive(Debug, Clone)]
pub struct ColumnCodec {
    /// Header name
    pub name: String,
    /// Destination SQL type
    pub sql_type: SqlType,
    pub rule: DecodeRule,
}

impl ColumnCodec {
    pub fn decode(&mut self, raw: &str) -> Result<CellValue, DecodeError> {
        self.rule.decode(&self.name, raw)
    }
}

/// Decoders for every column of a CSV file, in header order
#[derive(Debug, Clone)]
pub struct Codec {
    pub columns: Vec<ColumnCodec>,
    /// Schema columns missing from the CSV header
    pub warnings: Vec<String>,
}

impl Codec {
    /// Header column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Insert statement binding exactly the header columns
    pub fn insert_statement(&self, table: &str) -> InsertStatement {
        InsertStatement::new(
            table,
            self.columns
                .iter()
                .map(|c| (c.name.clone(), c.sql_type))
                .collect(),
        )
    }

    /// Decode the cells of one row
    pub fn decode_row<'a, I>(&mut self, cells: I) -> Result<Vec<CellValue>, DecodeError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let cells: Vec<&str> = cells.into_iter().collect();
        if cells.len() != self.columns.len() {
            return Err(DecodeError::CellCount {
                expected: self.columns.len(),
                actual: cells.len(),
            });
        }

        self.columns
            .iter_mut()
            .zip(cells)
            .map(|(column, raw)| column.decode(raw))
            .collect()
    }
}

fn unknown_type(column: &str, err: SchemaError) -> ValidationError {
    let sql_type = match err {
        SchemaError::UnknownLogicalType(t) | SchemaError::UnknownSqlType(t) => t,
        other => other.to_string(),
    };
    ValidationError::UnknownType {
        column: column.to_string(),
        sql_type,
    }
}

fn column_rule(
    field: &Field,
    sql_type: SqlType,
    is_primary_key: bool,
) -> Result<DecodeRule, ValidationError> {
    if is_primary_key {
        return Ok(DecodeRule::primary_key(sql_type));
    }

    let kind = DecodeKind::for_sql_type(sql_type);
    let mut rule = if field.is_required() {
        DecodeRule::required(kind)
    } else {
        DecodeRule::optional(kind)
    };
    if field.is_unique() {
        rule = rule.unique();
    }

    let constraints = &field.constraints;
    if let Some(pattern) = &constraints.pattern {
        let re = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            ValidationError::InvalidPattern {
                column: field.name.clone(),
                pattern: pattern.clone(),
                message: e.to_string(),
            }
        })?;
        rule = rule.with_check(ValueCheck::Pattern(re));
    }
    if let Some(allowed) = &constraints.enumeration {
        rule = rule.with_check(ValueCheck::OneOf(allowed.clone()));
    }
    if let Some(min) = constraints.min_length {
        rule = rule.with_check(ValueCheck::MinLength(min));
    }
    if let Some(max) = constraints.max_length {
        rule = rule.with_check(ValueCheck::MaxLength(max));
    }

    Ok(rule)
}

/// Build the decoders of a CSV file from its header
///
/// Header columns unknown to the schema are collected and reported together.
/// Schema fields absent from the header are reported as warnings only. The
/// database is never consulted.
pub fn build_codec(
    fields: &[Field],
    primary_key: Option<&str>,
    header: &[String],
) -> Result<Codec, ValidationError> {
    let mut by_name: HashMap<&str, &Field> = HashMap::with_capacity(fields.len());
    for field in fields {
        by_name.entry(field.name.as_str()).or_insert(field);
    }

    let unknown: Vec<String> = header
        .iter()
        .filter(|column| !by_name.contains_key(column.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(ValidationError::UnknownColumn(unknown));
    }
    let known: Vec<&Field> = header
        .iter()
        .filter_map(|column| by_name.get(column.as_str()).copied())
        .collect();

    let mut seen = HashSet::new();
    for column in header {
        if !seen.insert(column.as_str()) {
            return Err(ValidationError::DuplicateColumn(column.clone()));
        }
    }

    let mut warnings = Vec::new();
    for field in fields {
        if !seen.contains(field.name.as_str()) {
            let message = format!(
                "Column '{}' is declared in the schema but absent from the CSV header",
                field.name
            );
            warn!("{}", message);
            warnings.push(message);
        }
    }

    let mut columns = Vec::with_capacity(header.len());
    for (column, field) in header.iter().zip(known) {
        let sql_type = field
            .short_sql_type()
            .map_err(|e| unknown_type(column, e))?;
        let is_primary_key = primary_key == Some(column.as_str());
        let rule = column_rule(field, sql_type, is_primary_key)?;

        debug!(
            "Column {} decoded as {:?} (sql type {}, required: {}, unique: {})",
            column,
            rule.kind(),
            sql_type,
            rule.is_required(),
            rule.is_unique()
        );
        columns.push(ColumnCodec {
            name: column.clone(),
            sql_type,
            rule,
        });
    }

    Ok(Codec { columns, warnings })
}
