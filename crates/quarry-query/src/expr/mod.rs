//! Expression model.
//!
//! [`ExprNode`] is the untyped, immutable expression tree the renderer works
//! on. [`Expr<T>`] wraps a node with the Rust type it evaluates to, so the
//! typed API rejects mismatched operands at compile time. Building an
//! expression never touches a persistence context.

mod aggregate;
mod case;
mod order;
mod path;
mod predicate;
mod string;

pub use aggregate::{count_all, AggregateFn};
pub use case::{
    CaseBuilder, CaseCondition, CaseExpr, SearchedCases, SearchedCasesWhen, SearchedWhen,
    SimpleCases, SimpleCasesWhen, SimpleWhen,
};
pub use order::{Direction, NullHandling, OrderSpecifier};
pub use path::ColumnRef;
pub use predicate::{null, CompareOp, InList, Predicate};

use crate::query::QueryPlan;
use crate::value::{Numeric, SqlType, SqlValue, Value};
use std::fmt;
use std::marker::PhantomData;

/// Untyped expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// `alias.column`
    Column(ColumnRef),
    /// Bound as a parameter, never inlined
    Literal(Value),
    /// `None` argument means `COUNT(*)`
    Aggregate {
        func: AggregateFn,
        arg: Option<Box<ExprNode>>,
        distinct: bool,
    },
    Case(CaseExpr),
    Concat(Vec<ExprNode>),
    Cast {
        expr: Box<ExprNode>,
        ty: SqlType,
    },
    /// Renamed select item (`expr AS name`)
    Alias {
        expr: Box<ExprNode>,
        name: String,
    },
    /// Scalar subquery
    Subquery(Box<QueryPlan>),
    /// Boolean-valued predicate used as a value
    Predicate(Box<Predicate>),
}

impl ExprNode {
    /// Static type, when it can be inferred. NULL literals have none.
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Self::Column(col) => Some(col.ty),
            Self::Literal(value) => value.sql_type(),
            Self::Aggregate { func, arg, .. } => match func {
                AggregateFn::Count => Some(SqlType::Integer),
                AggregateFn::Avg => Some(SqlType::Real),
                AggregateFn::Sum | AggregateFn::Max | AggregateFn::Min => {
                    arg.as_ref().and_then(|a| a.sql_type())
                }
            },
            Self::Case(case) => case.result_type(),
            Self::Concat(_) => Some(SqlType::Text),
            Self::Cast { ty, .. } => Some(*ty),
            Self::Alias { expr, .. } => expr.sql_type(),
            Self::Subquery(plan) => plan.scalar_type(),
            Self::Predicate(_) => Some(SqlType::Boolean),
        }
    }

    /// Name used for DTO binding: the alias, or the column name of a path.
    pub fn binding_name(&self) -> Option<&str> {
        match self {
            Self::Alias { name, .. } => Some(name),
            Self::Column(col) => Some(&col.column),
            _ => None,
        }
    }

    /// The expression with any select alias removed.
    pub fn unaliased(&self) -> &ExprNode {
        match self {
            Self::Alias { expr, .. } => expr.unaliased(),
            other => other,
        }
    }

    /// True if an aggregate appears outside of nested subqueries.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Aggregate { .. } => true,
            Self::Column(_) | Self::Literal(_) | Self::Subquery(_) => false,
            Self::Case(case) => case.children().any(|c| c.contains_aggregate()),
            Self::Concat(parts) => parts.iter().any(|p| p.contains_aggregate()),
            Self::Cast { expr, .. } | Self::Alias { expr, .. } => expr.contains_aggregate(),
            Self::Predicate(pred) => pred.expressions().iter().any(|e| e.contains_aggregate()),
        }
    }

    /// Columns referenced outside of aggregates and subqueries.
    pub fn bare_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Self::Column(col) => out.push(col),
            Self::Literal(_) | Self::Aggregate { .. } | Self::Subquery(_) => {}
            Self::Case(case) => case.children().for_each(|c| c.bare_columns(out)),
            Self::Concat(parts) => parts.iter().for_each(|p| p.bare_columns(out)),
            Self::Cast { expr, .. } | Self::Alias { expr, .. } => expr.bare_columns(out),
            Self::Predicate(pred) => pred
                .expressions()
                .into_iter()
                .for_each(|e| e.bare_columns(out)),
        }
    }

    /// Every column referenced outside nested subqueries, aggregates included.
    pub fn columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Self::Column(col) => out.push(col),
            Self::Literal(_) | Self::Subquery(_) => {}
            Self::Aggregate { arg, .. } => {
                if let Some(arg) = arg {
                    arg.columns(out);
                }
            }
            Self::Case(case) => case.children().for_each(|c| c.columns(out)),
            Self::Concat(parts) => parts.iter().for_each(|p| p.columns(out)),
            Self::Cast { expr, .. } | Self::Alias { expr, .. } => expr.columns(out),
            Self::Predicate(pred) => pred.expressions().into_iter().for_each(|e| e.columns(out)),
        }
    }

    /// Subquery plans nested directly in this expression.
    pub fn subqueries<'a>(&'a self, out: &mut Vec<&'a QueryPlan>) {
        match self {
            Self::Subquery(plan) => out.push(plan),
            Self::Column(_) | Self::Literal(_) => {}
            Self::Aggregate { arg, .. } => {
                if let Some(arg) = arg {
                    arg.subqueries(out);
                }
            }
            Self::Case(case) => {
                if let Some(subject) = &case.subject {
                    subject.subqueries(out);
                }
                for (condition, result) in &case.branches {
                    match condition {
                        CaseCondition::Equals(value) => value.subqueries(out),
                        CaseCondition::Matches(pred) => pred.subqueries(out),
                    }
                    result.subqueries(out);
                }
                case.otherwise.subqueries(out);
            }
            Self::Concat(parts) => parts.iter().for_each(|p| p.subqueries(out)),
            Self::Cast { expr, .. } | Self::Alias { expr, .. } => expr.subqueries(out),
            Self::Predicate(pred) => pred.subqueries(out),
        }
    }
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(col) => write!(f, "{}.{}", col.alias, col.column),
            Self::Literal(value) => write!(f, "{}", value),
            Self::Aggregate { func, arg, distinct } => {
                let arg = arg
                    .as_ref()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "*".to_string());
                if *distinct {
                    write!(f, "{}(distinct {})", func.keyword().to_lowercase(), arg)
                } else {
                    write!(f, "{}({})", func.keyword().to_lowercase(), arg)
                }
            }
            Self::Case(_) => f.write_str("case"),
            Self::Concat(parts) => {
                let parts: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                write!(f, "concat({})", parts.join(", "))
            }
            Self::Cast { expr, ty } => write!(f, "cast({} as {})", expr, ty),
            Self::Alias { expr, name } => write!(f, "{} as {}", expr, name),
            Self::Subquery(_) => f.write_str("(subquery)"),
            Self::Predicate(_) => f.write_str("(predicate)"),
        }
    }
}

/// An expression that evaluates to `T`.
pub struct Expr<T> {
    node: ExprNode,
    _type: PhantomData<fn() -> T>,
}

impl<T> Expr<T> {
    /// Wrap an untyped node. The caller vouches for the type.
    pub fn from_node(node: ExprNode) -> Self {
        Self {
            node,
            _type: PhantomData,
        }
    }

    pub fn node(&self) -> &ExprNode {
        &self.node
    }

    pub fn into_node(self) -> ExprNode {
        self.node
    }

    /// Rename the expression in the select list (`expr AS name`).
    pub fn alias(&self, name: impl Into<String>) -> Expr<T> {
        Expr::from_node(ExprNode::Alias {
            expr: Box::new(self.node.unaliased().clone()),
            name: name.into(),
        })
    }

    /// Project this expression as `Option<T>` so NULLs decode to `None`.
    pub fn nullable(&self) -> Expr<Option<T>> {
        Expr::from_node(self.node.clone())
    }

    /// `CAST(expr AS TEXT)`
    pub fn string_value(&self) -> Expr<String> {
        Expr::from_node(ExprNode::Cast {
            expr: Box::new(self.node.unaliased().clone()),
            ty: SqlType::Text,
        })
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull {
            expr: self.node.unaliased().clone(),
            negated: false,
        }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNull {
            expr: self.node.unaliased().clone(),
            negated: true,
        }
    }
}

impl<T: Numeric> Expr<T> {
    /// `CAST(expr AS REAL)`, to compare integer paths with `avg` results.
    pub fn as_real(&self) -> Expr<f64> {
        Expr::from_node(ExprNode::Cast {
            expr: Box::new(self.node.unaliased().clone()),
            ty: SqlType::Real,
        })
    }
}

impl<T> Clone for Expr<T> {
    fn clone(&self) -> Self {
        Self::from_node(self.node.clone())
    }
}

impl<T> fmt::Debug for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({})", self.node)
    }
}

impl<T> fmt::Display for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)
    }
}

impl<T> PartialEq for Expr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<T> From<Expr<T>> for ExprNode {
    fn from(expr: Expr<T>) -> Self {
        expr.node
    }
}

impl<T> From<&Expr<T>> for ExprNode {
    fn from(expr: &Expr<T>) -> Self {
        expr.node.clone()
    }
}

/// A literal usable as a select item.
///
/// `constant("A")` is an `Expr<String>`.
pub fn constant<T: SqlValue>(value: impl Operand<T>) -> Expr<T> {
    Expr::from_node(value.into_operand())
}

// ============================================================================
// Operands
// ============================================================================

/// Anything usable where an expression of type `T` is expected: another
/// expression, a literal of the matching Rust type, or a scalar subquery.
pub trait Operand<T> {
    fn into_operand(self) -> ExprNode;
}

impl<T> Operand<T> for Expr<T> {
    fn into_operand(self) -> ExprNode {
        self.node.unaliased().clone()
    }
}

impl<T> Operand<T> for &Expr<T> {
    fn into_operand(self) -> ExprNode {
        self.node.unaliased().clone()
    }
}

macro_rules! literal_operand {
    ($target:ty => $($source:ty),*) => {
        $(
            impl Operand<$target> for $source {
                fn into_operand(self) -> ExprNode {
                    ExprNode::Literal(Value::from(self))
                }
            }
        )*
    };
}

literal_operand!(i64 => i64);
literal_operand!(i32 => i32);
literal_operand!(f64 => f64);
literal_operand!(bool => bool);
literal_operand!(String => String, &str);

impl Operand<String> for &String {
    fn into_operand(self) -> ExprNode {
        ExprNode::Literal(Value::Text(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn age() -> Expr<i32> {
        Expr::column("member", "age")
    }

    fn username() -> Expr<String> {
        Expr::column("member", "username")
    }

    #[test]
    fn test_paths_equal_by_alias_and_column() {
        assert_eq!(age(), Expr::<i32>::column("member", "age"));
        assert_ne!(age(), Expr::<i32>::column("memberSub", "age"));
    }

    #[test]
    fn test_alias_sets_binding_name() {
        let aliased = username().alias("name");
        assert_eq!(aliased.node().binding_name(), Some("name"));
        assert_eq!(username().node().binding_name(), Some("username"));
        assert_eq!(age().string_value().node().binding_name(), None);
    }

    #[test]
    fn test_realiasing_replaces_alias() {
        let twice = username().alias("a").alias("b");
        match twice.node() {
            ExprNode::Alias { expr, name } => {
                assert_eq!(name, "b");
                assert!(matches!(**expr, ExprNode::Column(_)));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_inferred_types() {
        assert_eq!(age().node().sql_type(), Some(SqlType::Integer));
        assert_eq!(age().avg().node().sql_type(), Some(SqlType::Real));
        assert_eq!(age().string_value().node().sql_type(), Some(SqlType::Text));
        assert_eq!(age().as_real().node().sql_type(), Some(SqlType::Real));
        assert_eq!(constant("A").node().sql_type(), Some(SqlType::Text));
    }

    #[test]
    fn test_aggregate_detection() {
        assert!(age().max().node().contains_aggregate());
        assert!(!age().node().contains_aggregate());

        let sum = age().sum();
        let mut bare = Vec::new();
        sum.node().bare_columns(&mut bare);
        assert!(bare.is_empty());
    }
}
