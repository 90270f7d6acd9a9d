//! Field model for dataset schemas
//!
//! A field describes one column of a dataset's target table: its name, the
//! logical type declared by the descriptor, its constraints and the SQL type
//! used to bind and create it. The SQL type is either given explicitly or
//! derived from the logical type.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::SchemaError;

// Parenthesized length/precision suffix, e.g. `varchar(255)` or `numeric(10, 2)`
static RE_TYPE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(.*\)").expect("Invalid regex"));

/// Logical type of a field as declared by a package descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    /// Free text, stored as `text`
    String,
    /// Bounded text, stored as `varchar`
    Varchar,
    /// Free text, stored as `text`
    Text,
    /// Floating point number, stored as `numeric`
    Numeric,
    /// 32-bit integer, stored as `int`
    Integer,
    /// Calendar date
    Date,
    /// Date and time without zone
    Timestamp,
}

impl LogicalType {
    /// SQL type a field of this logical type is stored as
    pub fn default_sql_type(&self) -> &'static str {
        match self {
            LogicalType::String | LogicalType::Text => "text",
            LogicalType::Varchar => "varchar",
            LogicalType::Numeric => "numeric",
            LogicalType::Integer => "int",
            LogicalType::Date => "date",
            LogicalType::Timestamp => "timestamp",
        }
    }
}

impl std::str::FromStr for LogicalType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" => Ok(LogicalType::String),
            "varchar" => Ok(LogicalType::Varchar),
            "text" => Ok(LogicalType::Text),
            "numeric" | "number" => Ok(LogicalType::Numeric),
            "int" | "integer" => Ok(LogicalType::Integer),
            "date" => Ok(LogicalType::Date),
            "timestamp" => Ok(LogicalType::Timestamp),
            _ => Err(SchemaError::UnknownLogicalType(s.to_string())),
        }
    }
}

/// SQL type family a column is bound and decoded as
///
/// Parsed from the short form of a SQL type name: lower-cased, with any
/// parenthesized length suffix removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Char,
    Varchar,
    Text,
    Integer,
    Numeric,
    Date,
    Timestamp,
}

impl SqlType {
    /// Parse a SQL type name such as `VARCHAR(255)`, `int` or `string`
    pub fn parse(sql_type: &str) -> Result<Self, SchemaError> {
        match short_type(sql_type).as_str() {
            "char" => Ok(SqlType::Char),
            "varchar" => Ok(SqlType::Varchar),
            "text" | "string" => Ok(SqlType::Text),
            "int" | "integer" => Ok(SqlType::Integer),
            "numeric" | "number" => Ok(SqlType::Numeric),
            "date" => Ok(SqlType::Date),
            "timestamp" => Ok(SqlType::Timestamp),
            _ => Err(SchemaError::UnknownSqlType(sql_type.to_string())),
        }
    }

    /// Name of the runtime value representation a bound value must have
    pub fn expected_representation(&self) -> &'static str {
        match self {
            SqlType::Char | SqlType::Varchar | SqlType::Text => "string",
            SqlType::Integer => "integer",
            SqlType::Numeric => "numeric",
            SqlType::Date => "date",
            SqlType::Timestamp => "timestamp",
        }
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlType::Char => write!(f, "char"),
            SqlType::Varchar => write!(f, "varchar"),
            SqlType::Text => write!(f, "text"),
            SqlType::Integer => write!(f, "int"),
            SqlType::Numeric => write!(f, "numeric"),
            SqlType::Date => write!(f, "date"),
            SqlType::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// Lower-case a SQL type name and strip its parenthesized suffix
pub fn short_type(sql_type: &str) -> String {
    RE_TYPE_SUFFIX
        .replace_all(sql_type, "")
        .trim()
        .to_lowercase()
}

/// Field constraints from a package descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    /// Whether a value must be present in every row
    #[serde(default)]
    pub required: bool,
    /// Whether values must be unique within one CSV file
    #[serde(default)]
    pub unique: bool,
    /// Regular expression every non-null value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed values
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// A column of a dataset's table
///
/// # Example
///
/// ```rust
/// use reference_data_loader::models::{Field, SqlType};
///
/// let field = Field::new("label", "string").required();
/// assert_eq!(field.sql_type().unwrap(), "text");
/// assert_eq!(field.short_sql_type().unwrap(), SqlType::Text);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Column name
    pub name: String,
    /// Logical type (e.g. "string", "integer", "date")
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Explicit SQL type, overriding derivation from the logical type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<String>,
    #[serde(default)]
    pub constraints: Constraints,
}

fn default_format() -> String {
    "default".to_string()
}

impl Field {
    /// Create an optional field with a logical type
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            format: default_format(),
            title: String::new(),
            description: String::new(),
            sql_type: None,
            constraints: Constraints::default(),
        }
    }

    /// Create a field from an explicit SQL type, as legacy column definitions do
    pub fn with_sql_type(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        let mut field = Self::new(name, "");
        field.sql_type = Some(sql_type.into());
        field
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.constraints.required = true;
        self
    }

    /// Whether a value must be present in every row
    pub fn is_required(&self) -> bool {
        self.constraints.required
    }

    /// Whether values must be unique within one CSV file
    pub fn is_unique(&self) -> bool {
        self.constraints.unique
    }

    /// The SQL type of this field, explicit or derived from the logical type
    pub fn sql_type(&self) -> Result<String, SchemaError> {
        match &self.sql_type {
            Some(sql_type) => Ok(sql_type.clone()),
            None => {
                let logical: LogicalType = self.field_type.parse()?;
                Ok(logical.default_sql_type().to_string())
            }
        }
    }

    /// The SQL type family of this field
    pub fn short_sql_type(&self) -> Result<SqlType, SchemaError> {
        SqlType::parse(&self.sql_type()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_sql_type_from_logical_type() {
        assert_eq!(Field::new("a", "string").sql_type().unwrap(), "text");
        assert_eq!(Field::new("a", "varchar").sql_type().unwrap(), "varchar");
        assert_eq!(Field::new("a", "number").sql_type().unwrap(), "numeric");
        assert_eq!(Field::new("a", "integer").sql_type().unwrap(), "int");
        assert_eq!(Field::new("a", "date").sql_type().unwrap(), "date");
        assert_eq!(
            Field::new("a", "timestamp").sql_type().unwrap(),
            "timestamp"
        );
    }

    #[test]
    fn test_unknown_logical_type_is_an_error() {
        let err = Field::new("a", "geopoint").sql_type().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownLogicalType(t) if t == "geopoint"));
    }

    #[test]
    fn test_explicit_sql_type_wins() {
        let field = Field::with_sql_type("code", "VARCHAR(32)");
        assert_eq!(field.sql_type().unwrap(), "VARCHAR(32)");
        assert_eq!(field.short_sql_type().unwrap(), SqlType::Varchar);
    }

    #[test]
    fn test_short_type_strips_suffix() {
        assert_eq!(short_type("VARCHAR(255)"), "varchar");
        assert_eq!(short_type("numeric(10, 2)"), "numeric");
        assert_eq!(short_type(" Int "), "int");
    }

    #[test]
    fn test_sql_type_parse() {
        assert_eq!(SqlType::parse("char(1)").unwrap(), SqlType::Char);
        assert_eq!(SqlType::parse("STRING").unwrap(), SqlType::Text);
        assert_eq!(SqlType::parse("integer").unwrap(), SqlType::Integer);
        assert_eq!(SqlType::parse("Number").unwrap(), SqlType::Numeric);
        assert!(matches!(
            SqlType::parse("blob"),
            Err(SchemaError::UnknownSqlType(_))
        ));
    }

    #[test]
    fn test_deserialize_field_from_descriptor() {
        let json = r#"{
            "name": "code",
            "type": "string",
            "title": "Code",
            "constraints": {"required": true, "enum": ["a", "b"], "maxLength": 3}
        }"#;
        let field: Field = serde_json::from_str(json).unwrap();
        assert_eq!(field.name, "code");
        assert_eq!(field.format, "default");
        assert!(field.is_required());
        assert!(!field.is_unique());
        assert_eq!(
            field.constraints.enumeration,
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(field.constraints.max_length, Some(3));
        assert_eq!(field.sql_type, None);
    }
}
