//! Strict binding of decoded cells to insert parameters

use crate::codec::CellValue;
use crate::database::SqlParam;
use crate::models::SqlType;

/// A decoded value whose representation differs from its destination type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindMismatch {
    pub expected: &'static str,
    pub actual: &'static str,
}

/// Bind a decoded value to a column of `sql_type`
///
/// Nulls bind as typed SQL nulls. Any other value must already have the
/// representation of the destination type; nothing is coerced.
pub fn bind(value: CellValue, sql_type: SqlType) -> Result<SqlParam, BindMismatch> {
    let expected = sql_type.expected_representation();
    let actual = value.kind();

    match (value, sql_type) {
        (CellValue::Null, _) => Ok(SqlParam::Null(sql_type)),
        (CellValue::Text(s), SqlType::Char | SqlType::Varchar | SqlType::Text) => {
            Ok(SqlParam::Text(s))
        }
        (CellValue::Integer(i), SqlType::Integer) => Ok(SqlParam::Integer(i)),
        (CellValue::Numeric(n), SqlType::Numeric) => Ok(SqlParam::Numeric(n)),
        (CellValue::Date(d), SqlType::Date) => Ok(SqlParam::Date(d)),
        (CellValue::Timestamp(ts), SqlType::Timestamp) => Ok(SqlParam::Timestamp(ts)),
        _ => Err(BindMismatch { expected, actual }),
    }
}
