//! Error types for SQLite persistence

use quarry_query::{PersistenceError, QueryError};
use rusqlite::ErrorCode;
use thiserror::Error;

/// SQLite persistence error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// Schema/migration error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Unit-of-work misuse
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Value cannot be stored or read back
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;

impl From<SqliteError> for PersistenceError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Connection(msg) => Self::connectivity(msg),
            SqliteError::Rusqlite(e) => {
                let message = e.to_string();
                match e.sqlite_error_code() {
                    Some(ErrorCode::ConstraintViolation) => Self::constraint(message),
                    Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                        Self::timeout(message)
                    }
                    Some(ErrorCode::CannotOpen) | Some(ErrorCode::NotADatabase) => {
                        Self::connectivity(message)
                    }
                    _ => Self::backend(message),
                }
            }
            other => Self::backend(other.to_string()),
        }
    }
}

impl From<SqliteError> for QueryError {
    fn from(err: SqliteError) -> Self {
        QueryError::Persistence(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_query::PersistenceErrorKind;

    fn sqlite_failure(code: i32) -> SqliteError {
        SqliteError::Rusqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            Some("boom".to_string()),
        ))
    }

    #[test]
    fn test_constraint_classified() {
        let err: PersistenceError = sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT).into();
        assert_eq!(err.kind, PersistenceErrorKind::Constraint);
    }

    #[test]
    fn test_busy_is_timeout() {
        let err: PersistenceError = sqlite_failure(rusqlite::ffi::SQLITE_BUSY).into();
        assert_eq!(err.kind, PersistenceErrorKind::Timeout);
    }

    #[test]
    fn test_connection_is_connectivity() {
        let err: PersistenceError = SqliteError::Connection("gone".into()).into();
        assert_eq!(err.kind, PersistenceErrorKind::Connectivity);
        assert_eq!(err.to_string(), "Connection error: gone");
    }

    #[test]
    fn test_schema_is_backend() {
        let err: PersistenceError = SqliteError::Schema("bad".into()).into();
        assert_eq!(err.kind, PersistenceErrorKind::Backend);
    }
}
