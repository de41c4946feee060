//! Error types for query building, rendering and execution.

use std::fmt;
use thiserror::Error;

/// Errors raised while building, validating or executing a query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Operands of an expression have incompatible types.
    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        context: String,
    },

    /// The plan is structurally inconsistent and was never sent to the backend.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A single-result fetch matched more than one row.
    #[error("Expected at most one result, but the query matched {count} rows")]
    TooManyResults { count: usize },

    /// Failure reported by the persistence context.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl QueryError {
    pub fn type_mismatch(
        expected: impl fmt::Display,
        found: impl fmt::Display,
        context: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
            context: context.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while rendering a plan into backend text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Nothing to select
    #[error("Query has an empty projection")]
    EmptyProjection,

    /// The plan has no FROM source
    #[error("Query has no source entity")]
    MissingSource,

    /// The renderer cannot express this construct
    #[error("Unsupported expression: {message}")]
    UnsupportedExpression { message: String },
}

impl From<RenderError> for QueryError {
    fn from(err: RenderError) -> Self {
        Self::InvalidQuery(err.to_string())
    }
}

/// Category of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceErrorKind {
    Connectivity,
    Constraint,
    Timeout,
    Backend,
}

impl fmt::Display for PersistenceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connectivity => "Connection error",
            Self::Constraint => "Constraint violation",
            Self::Timeout => "Timeout",
            Self::Backend => "Backend error",
        };
        f.write_str(name)
    }
}

/// Failure reported by a persistence context, passed through unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct PersistenceError {
    pub kind: PersistenceErrorKind,
    pub message: String,
}

impl PersistenceError {
    pub fn new(kind: PersistenceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::Connectivity, message)
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::Constraint, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::Timeout, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::Backend, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_error_passes_through() {
        let err: QueryError = PersistenceError::constraint("UNIQUE failed: team.name").into();

        assert!(matches!(
            &err,
            QueryError::Persistence(PersistenceError {
                kind: PersistenceErrorKind::Constraint,
                ..
            })
        ));
        assert_eq!(
            err.to_string(),
            "Constraint violation: UNIQUE failed: team.name"
        );
    }

    #[test]
    fn test_render_error_becomes_invalid_query() {
        let err: QueryError = RenderError::MissingSource.into();
        assert!(matches!(err, QueryError::InvalidQuery(_)));
    }
}
