//! Column paths (`alias.column`).

use super::{Expr, ExprNode};
use crate::value::{SqlType, SqlValue};

/// Reference to a column of an aliased query source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
    pub ty: SqlType,
}

impl ColumnRef {
    pub fn new(alias: impl Into<String>, column: impl Into<String>, ty: SqlType) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
            ty,
        }
    }
}

impl<T: SqlValue> Expr<T> {
    /// Typed path to `alias.column`.
    pub fn column(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Expr::from_node(ExprNode::Column(ColumnRef::new(alias, column, T::SQL_TYPE)))
    }
}
