//! SQL text building
//!
//! Identifiers are always double-quoted so table and column names keep their
//! case. Literal values only appear in derived delete statements; row values
//! are always bound as parameters.

use crate::models::SqlType;

/// Token replaced by the table name in configured delete statements
pub const TABLE_TOKEN: &str = "${table}";

/// Parameter placeholder syntax of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (DuckDB)
    QuestionMark,
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Replace the table token of a configured statement
pub fn substitute_table(query: &str, table: &str) -> String {
    query.replace(TABLE_TOKEN, table)
}

/// Delete statement used when none is configured
///
/// With a dataset key only the rows of this dataset are removed, so several
/// datasets can share one table.
pub fn default_delete_query(table: &str, dataset_key: Option<&str>, dataset: &str) -> String {
    match dataset_key {
        Some(key) => format!(
            "DELETE FROM {} WHERE {} = {}",
            quote_ident(table),
            quote_ident(key),
            quote_literal(dataset)
        ),
        None => format!("DELETE FROM {}", quote_ident(table)),
    }
}

/// A parameterized insert into a fixed list of columns
///
/// Columns follow the CSV header order, which is also the binding order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    /// Destination type of each column, parallel to `columns`
    pub sql_types: Vec<SqlType>,
}

impl InsertStatement {
    pub fn new(table: impl Into<String>, columns: Vec<(String, SqlType)>) -> Self {
        let (columns, sql_types) = columns.into_iter().unzip();
        Self {
            table: table.into(),
            columns,
            sql_types,
        }
    }

    /// Render the statement for a placeholder style
    pub fn to_sql(&self, style: PlaceholderStyle) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=self.columns.len())
            .map(|i| match style {
                PlaceholderStyle::QuestionMark => "?".to_string(),
                PlaceholderStyle::Numbered => format!("${}", i),
            })
            .collect();

        format!(
            "INSERT INTO {}({}) VALUES({})",
            quote_ident(&self.table),
            columns.join(","),
            placeholders.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("demo"), "\"demo\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("o'clock"), "'o''clock'");
    }

    #[test]
    fn test_default_delete_query() {
        assert_eq!(default_delete_query("demo", None, "demo"), "DELETE FROM \"demo\"");
        assert_eq!(
            default_delete_query("codes", Some("dataset"), "eu's"),
            "DELETE FROM \"codes\" WHERE \"dataset\" = 'eu''s'"
        );
    }

    #[test]
    fn test_substitute_table() {
        assert_eq!(
            substitute_table("DELETE FROM \"${table}\" WHERE 1=1", "demo"),
            "DELETE FROM \"demo\" WHERE 1=1"
        );
        assert_eq!(substitute_table("TRUNCATE t", "demo"), "TRUNCATE t");
    }

    #[test]
    fn test_insert_statement() {
        let statement = InsertStatement::new(
            "demo",
            vec![
                ("id".to_string(), SqlType::Integer),
                ("label".to_string(), SqlType::Text),
            ],
        );
        assert_eq!(
            statement.to_sql(PlaceholderStyle::QuestionMark),
            "INSERT INTO \"demo\"(\"id\",\"label\") VALUES(?,?)"
        );
        assert_eq!(
            statement.to_sql(PlaceholderStyle::Numbered),
            "INSERT INTO \"demo\"(\"id\",\"label\") VALUES($1,$2)"
        );
        assert_eq!(statement.sql_types, vec![SqlType::Integer, SqlType::Text]);
    }
}
