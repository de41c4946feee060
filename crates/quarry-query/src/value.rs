//! Runtime values and their static SQL types.

use crate::error::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Static type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Boolean,
}

impl SqlType {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }

    /// Integer and Real compare with each other; everything else only with itself.
    pub fn is_comparable_with(self, other: SqlType) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }

    /// Column type used in generated DDL and casts
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "Integer",
            Self::Real => "Real",
            Self::Text => "Text",
            Self::Boolean => "Boolean",
        };
        f.write_str(name)
    }
}

/// A single SQL value, as bound into a query or read back from a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `None` for NULL, which is compatible with every type.
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Self::Null => None,
            Self::Integer(_) => Some(SqlType::Integer),
            Self::Real(_) => Some(SqlType::Real),
            Self::Text(_) => Some(SqlType::Text),
            Self::Boolean(_) => Some(SqlType::Boolean),
        }
    }

    fn type_name(&self) -> String {
        self.sql_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "NULL".to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Real(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
            Self::Boolean(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

// ============================================================================
// Typed conversions
// ============================================================================

/// Rust types that stand for one non-null SQL column type.
pub trait SqlValue: Into<Value> + Sized {
    const SQL_TYPE: SqlType;
}

/// Marker for types that support `sum` and `avg`.
pub trait Numeric: SqlValue {}

/// Decoding of a value read back from the backend.
///
/// Non-`Option` targets reject NULL with a type mismatch.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> QueryResult<Self>;
}

fn mismatch<T>(expected: SqlType, value: &Value) -> QueryResult<T> {
    Err(QueryError::type_mismatch(
        expected,
        value.type_name(),
        "result decoding",
    ))
}

impl SqlValue for i64 {
    const SQL_TYPE: SqlType = SqlType::Integer;
}

impl SqlValue for i32 {
    const SQL_TYPE: SqlType = SqlType::Integer;
}

impl SqlValue for f64 {
    const SQL_TYPE: SqlType = SqlType::Real;
}

impl SqlValue for String {
    const SQL_TYPE: SqlType = SqlType::Text;
}

impl SqlValue for bool {
    const SQL_TYPE: SqlType = SqlType::Boolean;
}

impl Numeric for i64 {}
impl Numeric for i32 {}
impl Numeric for f64 {}

impl FromValue for i64 {
    fn from_value(value: Value) -> QueryResult<Self> {
        match value {
            Value::Integer(v) => Ok(v),
            Value::Boolean(v) => Ok(i64::from(v)),
            other => mismatch(SqlType::Integer, &other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> QueryResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| {
            QueryError::type_mismatch("32-bit Integer", wide, "result decoding")
        })
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> QueryResult<Self> {
        match value {
            Value::Real(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            other => mismatch(SqlType::Real, &other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> QueryResult<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => mismatch(SqlType::Text, &other),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> QueryResult<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            // SQLite stores booleans as 0/1
            Value::Integer(v) => Ok(v != 0),
            other => mismatch(SqlType::Boolean, &other),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> QueryResult<Self> {
        Ok(value)
    }
}

macro_rules! nullable_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for Option<$ty> {
                fn from_value(value: Value) -> QueryResult<Self> {
                    if value.is_null() {
                        Ok(None)
                    } else {
                        <$ty as FromValue>::from_value(value).map(Some)
                    }
                }
            }
        )*
    };
}

nullable_from_value!(i64, i32, f64, String, bool);
