//! Per-column decode rules
//!
//! A rule turns one raw CSV cell into a [`CellValue`]. Blank cells (empty or
//! whitespace only) are absent: optional columns map them to null, required
//! columns reject them. Text passes through unmodified; other kinds are parsed
//! from the trimmed cell.
//!
//! A whitespace-only cell in an optional text column is stored as null, not
//! as the whitespace.
//!
//! Uniqueness compares decoded values, so `1` and `01` in an integer column
//! are the same value.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::collections::HashSet;

use super::{CellValue, DecodeError};
use crate::models::SqlType;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Value family a cell is parsed into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeKind {
    Text,
    Integer,
    Numeric,
    Date,
    Timestamp,
}

impl DecodeKind {
    /// Decode kind of a destination SQL type
    pub fn for_sql_type(sql_type: SqlType) -> Self {
        match sql_type {
            SqlType::Char | SqlType::Varchar | SqlType::Text => DecodeKind::Text,
            SqlType::Integer => DecodeKind::Integer,
            SqlType::Numeric => DecodeKind::Numeric,
            SqlType::Date => DecodeKind::Date,
            SqlType::Timestamp => DecodeKind::Timestamp,
        }
    }

    fn parse(&self, column: &str, raw: &str) -> Result<CellValue, DecodeError> {
        match self {
            DecodeKind::Text => Ok(CellValue::Text(raw.to_string())),
            DecodeKind::Integer => parse_integer(column, raw.trim()),
            DecodeKind::Numeric => parse_numeric(column, raw.trim()),
            DecodeKind::Date => parse_date(column, raw.trim()),
            DecodeKind::Timestamp => parse_timestamp(column, raw.trim()),
        }
    }
}

fn parse_integer(column: &str, value: &str) -> Result<CellValue, DecodeError> {
    value
        .parse::<i32>()
        .map(CellValue::Integer)
        .map_err(|_| DecodeError::InvalidInteger {
            column: column.to_string(),
            value: value.to_string(),
        })
}

fn parse_numeric(column: &str, value: &str) -> Result<CellValue, DecodeError> {
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(CellValue::Numeric(n)),
        _ => Err(DecodeError::InvalidNumeric {
            column: column.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_date(column: &str, value: &str) -> Result<CellValue, DecodeError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(CellValue::Date)
        .map_err(|_| DecodeError::InvalidDate {
            column: column.to_string(),
            value: value.to_string(),
        })
}

fn parse_timestamp(column: &str, value: &str) -> Result<CellValue, DecodeError> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(CellValue::Timestamp(ts));
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| CellValue::Timestamp(ts.naive_utc()))
        .map_err(|_| DecodeError::InvalidTimestamp {
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Canonical form of a decoded value, so `1` and `01` collide
fn unique_key(value: &CellValue) -> String {
    match value {
        CellValue::Null => String::new(),
        CellValue::Text(text) => text.clone(),
        CellValue::Integer(i) => i.to_string(),
        // Adding zero folds -0.0 into 0.0
        CellValue::Numeric(n) => (n + 0.0).to_string(),
        CellValue::Date(d) => d.to_string(),
        CellValue::Timestamp(ts) => ts.to_string(),
    }
}

/// Constraint checked on non-null text values
#[derive(Debug, Clone)]
pub enum ValueCheck {
    /// Whole value must match
    Pattern(Regex),
    /// Value must be one of the listed values
    OneOf(Vec<String>),
    MinLength(usize),
    MaxLength(usize),
}

impl ValueCheck {
    fn check(&self, column: &str, value: &str) -> Result<(), DecodeError> {
        let (ok, constraint) = match self {
            ValueCheck::Pattern(re) => (re.is_match(value), format!("pattern {}", re.as_str())),
            ValueCheck::OneOf(allowed) => (
                allowed.iter().any(|a| a == value),
                format!("one of [{}]", allowed.join(", ")),
            ),
            ValueCheck::MinLength(min) => (
                value.chars().count() >= *min,
                format!("at least {} characters", min),
            ),
            ValueCheck::MaxLength(max) => (
                value.chars().count() <= *max,
                format!("at most {} characters", max),
            ),
        };
        if ok {
            Ok(())
        } else {
            Err(DecodeError::ConstraintViolation {
                column: column.to_string(),
                value: value.to_string(),
                constraint,
            })
        }
    }
}

/// Decode behaviour of one CSV column
#[derive(Debug, Clone)]
pub struct DecodeRule {
    kind: DecodeKind,
    required: bool,
    /// Values seen so far, when values must be unique within the file
    seen: Option<HashSet<String>>,
    checks: Vec<ValueCheck>,
}

impl DecodeRule {
    /// A rule for an optional column
    pub fn optional(kind: DecodeKind) -> Self {
        Self {
            kind,
            required: false,
            seen: None,
            checks: Vec::new(),
        }
    }

    /// A rule for a column that must have a value in every row
    pub fn required(kind: DecodeKind) -> Self {
        Self {
            required: true,
            ..Self::optional(kind)
        }
    }

    /// Primary key rule: integer keys are parsed as integers, any other key
    /// is an opaque required string that must be unique within the file
    pub fn primary_key(sql_type: SqlType) -> Self {
        match sql_type {
            SqlType::Integer => Self::required(DecodeKind::Integer),
            _ => Self::required(DecodeKind::Text).unique(),
        }
    }

    /// Reject values already seen in the file
    pub fn unique(mut self) -> Self {
        self.seen = Some(HashSet::new());
        self
    }

    /// Add a check run on non-null text values
    pub fn with_check(mut self, check: ValueCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn kind(&self) -> DecodeKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_unique(&self) -> bool {
        self.seen.is_some()
    }

    /// Decode one cell of `column`
    pub fn decode(&mut self, column: &str, raw: &str) -> Result<CellValue, DecodeError> {
        if raw.trim().is_empty() {
            return if self.required {
                Err(DecodeError::MissingValue {
                    column: column.to_string(),
                })
            } else {
                Ok(CellValue::Null)
            };
        }

        let value = self.kind.parse(column, raw)?;

        if let CellValue::Text(text) = &value {
            for check in &self.checks {
                check.check(column, text)?;
            }
        }

        if let Some(seen) = &mut self.seen
            && !seen.insert(unique_key(&value))
        {
            let shown = match &value {
                CellValue::Text(text) => text.clone(),
                _ => raw.trim().to_string(),
            };
            return Err(DecodeError::DuplicateValue {
                column: column.to_string(),
                value: shown,
            });
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_cells() {
        let mut optional = DecodeRule::optional(DecodeKind::Text);
        assert_eq!(optional.decode("label", "").unwrap(), CellValue::Null);
        assert_eq!(optional.decode("label", "   ").unwrap(), CellValue::Null);

        let mut required = DecodeRule::required(DecodeKind::Text);
        assert!(matches!(
            required.decode("label", " "),
            Err(DecodeError::MissingValue { column }) if column == "label"
        ));
    }

    #[test]
    fn test_text_is_not_trimmed() {
        let mut rule = DecodeRule::optional(DecodeKind::Text);
        assert_eq!(
            rule.decode("label", " padded ").unwrap(),
            CellValue::Text(" padded ".to_string())
        );
    }

    #[test]
    fn test_integer_and_numeric() {
        let mut int = DecodeRule::optional(DecodeKind::Integer);
        assert_eq!(int.decode("n", " 42 ").unwrap(), CellValue::Integer(42));
        assert_eq!(int.decode("n", "-7").unwrap(), CellValue::Integer(-7));
        assert!(matches!(
            int.decode("n", "4.2"),
            Err(DecodeError::InvalidInteger { value, .. }) if value == "4.2"
        ));
        assert!(int.decode("n", "3000000000").is_err());

        let mut num = DecodeRule::optional(DecodeKind::Numeric);
        assert_eq!(num.decode("x", "1.25").unwrap(), CellValue::Numeric(1.25));
        assert_eq!(num.decode("x", "3").unwrap(), CellValue::Numeric(3.0));
        assert!(matches!(
            num.decode("x", "abc"),
            Err(DecodeError::InvalidNumeric { .. })
        ));
        assert!(num.decode("x", "NaN").is_err());
    }

    #[test]
    fn test_dates_and_timestamps() {
        let mut date = DecodeRule::optional(DecodeKind::Date);
        assert_eq!(
            date.decode("d", "2024-02-29").unwrap(),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert!(matches!(
            date.decode("d", "29/02/2024"),
            Err(DecodeError::InvalidDate { .. })
        ));

        let mut ts = DecodeRule::optional(DecodeKind::Timestamp);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(
            ts.decode("t", "2024-01-02T03:04:05").unwrap(),
            CellValue::Timestamp(expected)
        );
        assert_eq!(
            ts.decode("t", "2024-01-02 03:04:05").unwrap(),
            CellValue::Timestamp(expected)
        );
        assert_eq!(
            ts.decode("t", "2024-01-02T05:04:05+02:00").unwrap(),
            CellValue::Timestamp(expected)
        );
        assert!(matches!(
            ts.decode("t", "2024-01-02"),
            Err(DecodeError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_primary_key_rules() {
        let mut int_key = DecodeRule::primary_key(SqlType::Integer);
        assert_eq!(int_key.kind(), DecodeKind::Integer);
        assert!(int_key.is_required());
        assert!(!int_key.is_unique());
        assert_eq!(int_key.decode("id", "1").unwrap(), CellValue::Integer(1));

        let mut code_key = DecodeRule::primary_key(SqlType::Varchar);
        assert!(code_key.is_unique());
        code_key.decode("code", "a").unwrap();
        code_key.decode("code", "b").unwrap();
        assert!(matches!(
            code_key.decode("code", "a"),
            Err(DecodeError::DuplicateValue { value, .. }) if value == "a"
        ));
        assert!(matches!(
            code_key.decode("code", ""),
            Err(DecodeError::MissingValue { .. })
        ));
    }

    #[test]
    fn test_unique_compares_decoded_values() {
        let mut int = DecodeRule::optional(DecodeKind::Integer).unique();
        int.decode("n", "1").unwrap();
        assert!(matches!(
            int.decode("n", "01"),
            Err(DecodeError::DuplicateValue { column, value }) if column == "n" && value == "01"
        ));
        assert!(int.decode("n", " +2").is_ok());
        assert!(int.decode("n", "2").is_err());

        let mut num = DecodeRule::optional(DecodeKind::Numeric).unique();
        num.decode("x", "1.0").unwrap();
        assert!(num.decode("x", "1").is_err());
        num.decode("x", "-0").unwrap();
        assert!(num.decode("x", "0.0").is_err());

        let mut date = DecodeRule::optional(DecodeKind::Date).unique();
        date.decode("d", "2024-01-31").unwrap();
        assert!(date.decode("d", " 2024-01-31 ").is_err());

        // Nulls never collide
        assert_eq!(int.decode("n", "").unwrap(), CellValue::Null);
        assert_eq!(int.decode("n", "").unwrap(), CellValue::Null);
    }

    #[test]
    fn test_value_checks() {
        let mut rule = DecodeRule::optional(DecodeKind::Text)
            .with_check(ValueCheck::Pattern(Regex::new("^(?:[A-Z]{2})$").unwrap()))
            .with_check(ValueCheck::OneOf(vec!["FR".to_string(), "DE".to_string()]));
        assert!(rule.decode("country", "FR").is_ok());
        assert!(rule.decode("country", "").is_ok());
        assert!(matches!(
            rule.decode("country", "fr"),
            Err(DecodeError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            rule.decode("country", "IT"),
            Err(DecodeError::ConstraintViolation { constraint, .. }) if constraint == "one of [FR, DE]"
        ));

        let mut length = DecodeRule::optional(DecodeKind::Text)
            .with_check(ValueCheck::MinLength(2))
            .with_check(ValueCheck::MaxLength(3));
        assert!(length.decode("c", "ab").is_ok());
        assert!(length.decode("c", "a").is_err());
        assert!(length.decode("c", "abcd").is_err());
    }
}
