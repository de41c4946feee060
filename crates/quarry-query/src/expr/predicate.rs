//! Boolean predicates and the typed comparison operators that build them.

use super::{Expr, ExprNode, Operand};
use crate::error::QueryResult;
use crate::query::{validate, Query, QueryPlan};
use crate::value::{SqlValue, Value};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Goe,
    Lt,
    Loe,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Goe => ">=",
            Self::Lt => "<",
            Self::Loe => "<=",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Goe => "goe",
            Self::Lt => "lt",
            Self::Loe => "loe",
        }
    }
}

/// Right-hand side of `IN`.
#[derive(Debug, Clone, PartialEq)]
pub enum InList {
    Values(Vec<ExprNode>),
    Subquery(Box<QueryPlan>),
}

/// Immutable boolean expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        op: CompareOp,
        lhs: ExprNode,
        rhs: ExprNode,
    },
    Between {
        expr: ExprNode,
        low: ExprNode,
        high: ExprNode,
    },
    In {
        expr: ExprNode,
        list: InList,
        negated: bool,
    },
    IsNull {
        expr: ExprNode,
        negated: bool,
    },
    /// `LIKE` with `\` as the escape character
    Like {
        expr: ExprNode,
        pattern: ExprNode,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Conjunction; nested `And`s are flattened. Operands are untouched.
    pub fn and(&self, other: impl Into<Predicate>) -> Predicate {
        let mut parts = match self {
            Self::And(parts) => parts.clone(),
            single => vec![single.clone()],
        };
        match other.into() {
            Self::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Self::And(parts)
    }

    /// Disjunction; nested `Or`s are flattened.
    pub fn or(&self, other: impl Into<Predicate>) -> Predicate {
        let mut parts = match self {
            Self::Or(parts) => parts.clone(),
            single => vec![single.clone()],
        };
        match other.into() {
            Self::Or(more) => parts.extend(more),
            single => parts.push(single),
        }
        Self::Or(parts)
    }

    pub fn not(&self) -> Predicate {
        match self {
            Self::Not(inner) => (**inner).clone(),
            other => Self::Not(Box::new(other.clone())),
        }
    }

    /// AND together any number of predicates; `None` for an empty input.
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        predicates
            .into_iter()
            .fold(None, |acc: Option<Predicate>, p| match acc {
                None => Some(p),
                Some(acc) => Some(acc.and(p)),
            })
    }

    /// Untyped comparison, checked eagerly for operand compatibility.
    pub fn try_compare(op: CompareOp, lhs: ExprNode, rhs: ExprNode) -> QueryResult<Predicate> {
        let predicate = Self::Compare { op, lhs, rhs };
        validate::check_predicate(&predicate)?;
        Ok(predicate)
    }

    /// Untyped `BETWEEN`, checked eagerly for operand compatibility.
    pub fn try_between(expr: ExprNode, low: ExprNode, high: ExprNode) -> QueryResult<Predicate> {
        let predicate = Self::Between { expr, low, high };
        validate::check_predicate(&predicate)?;
        Ok(predicate)
    }

    /// Expression operands, descending through boolean connectives.
    pub fn expressions(&self) -> Vec<&ExprNode> {
        let mut out = Vec::new();
        self.collect_expressions(&mut out);
        out
    }

    fn collect_expressions<'a>(&'a self, out: &mut Vec<&'a ExprNode>) {
        match self {
            Self::Compare { lhs, rhs, .. } => {
                out.push(lhs);
                out.push(rhs);
            }
            Self::Between { expr, low, high } => {
                out.extend([expr, low, high]);
            }
            Self::In { expr, list, .. } => {
                out.push(expr);
                if let InList::Values(values) = list {
                    out.extend(values.iter());
                }
            }
            Self::IsNull { expr, .. } => out.push(expr),
            Self::Like { expr, pattern } => {
                out.push(expr);
                out.push(pattern);
            }
            Self::And(parts) | Self::Or(parts) => {
                parts.iter().for_each(|p| p.collect_expressions(out));
            }
            Self::Not(inner) => inner.collect_expressions(out),
        }
    }

    /// Subquery plans nested in this predicate (not descending into them).
    pub fn subqueries<'a>(&'a self, out: &mut Vec<&'a QueryPlan>) {
        if let Self::In {
            list: InList::Subquery(plan),
            ..
        } = self
        {
            out.push(plan);
        }
        match self {
            Self::And(parts) | Self::Or(parts) => {
                parts.iter().for_each(|p| p.subqueries(out));
            }
            Self::Not(inner) => inner.subqueries(out),
            _ => {
                for expr in self.expressions() {
                    expr.subqueries(out);
                }
            }
        }
    }
}

impl From<&Predicate> for Predicate {
    fn from(p: &Predicate) -> Self {
        p.clone()
    }
}

impl From<Predicate> for ExprNode {
    fn from(p: Predicate) -> Self {
        ExprNode::Predicate(Box::new(p))
    }
}

// ============================================================================
// Typed comparisons
// ============================================================================

impl<T: SqlValue> Expr<T> {
    fn compare(&self, op: CompareOp, rhs: impl Operand<T>) -> Predicate {
        Predicate::Compare {
            op,
            lhs: self.node().unaliased().clone(),
            rhs: rhs.into_operand(),
        }
    }

    pub fn eq(&self, rhs: impl Operand<T>) -> Predicate {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn ne(&self, rhs: impl Operand<T>) -> Predicate {
        self.compare(CompareOp::Ne, rhs)
    }

    pub fn gt(&self, rhs: impl Operand<T>) -> Predicate {
        self.compare(CompareOp::Gt, rhs)
    }

    pub fn goe(&self, rhs: impl Operand<T>) -> Predicate {
        self.compare(CompareOp::Goe, rhs)
    }

    pub fn lt(&self, rhs: impl Operand<T>) -> Predicate {
        self.compare(CompareOp::Lt, rhs)
    }

    pub fn loe(&self, rhs: impl Operand<T>) -> Predicate {
        self.compare(CompareOp::Loe, rhs)
    }

    /// Inclusive range `low <= expr <= high`.
    pub fn between(&self, low: impl Operand<T>, high: impl Operand<T>) -> Predicate {
        Predicate::Between {
            expr: self.node().unaliased().clone(),
            low: low.into_operand(),
            high: high.into_operand(),
        }
    }

    /// `expr IN (...)`. An empty list matches nothing.
    pub fn is_in<O: Operand<T>>(&self, values: impl IntoIterator<Item = O>) -> Predicate {
        Predicate::In {
            expr: self.node().unaliased().clone(),
            list: InList::Values(values.into_iter().map(Operand::into_operand).collect()),
            negated: false,
        }
    }

    /// `expr NOT IN (...)`. An empty list matches everything.
    pub fn not_in<O: Operand<T>>(&self, values: impl IntoIterator<Item = O>) -> Predicate {
        Predicate::In {
            expr: self.node().unaliased().clone(),
            list: InList::Values(values.into_iter().map(Operand::into_operand).collect()),
            negated: true,
        }
    }

    /// `expr IN (SELECT ...)`
    pub fn in_query(&self, subquery: Query<Expr<T>>) -> Predicate {
        Predicate::In {
            expr: self.node().unaliased().clone(),
            list: InList::Subquery(Box::new(subquery.into_plan())),
            negated: false,
        }
    }
}

/// NULL literal, for comparisons built through the untyped API.
pub fn null() -> ExprNode {
    ExprNode::Literal(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::expr::ColumnRef;
    use crate::value::SqlType;

    fn age() -> Expr<i32> {
        Expr::column("member", "age")
    }

    #[test]
    fn test_and_flattens_without_mutating() {
        let a = age().gt(10);
        let b = age().lt(40);
        let c = age().ne(20);

        let ab = a.and(&b);
        let abc = ab.and(c.clone());

        assert_eq!(abc, Predicate::And(vec![a.clone(), b.clone(), c]));
        assert_eq!(ab, Predicate::And(vec![a, b]));
    }

    #[test]
    fn test_double_negation_cancels() {
        let p = age().eq(10);
        assert_eq!(p.not().not(), p);
    }

    #[test]
    fn test_all_of_empty_is_none() {
        assert!(Predicate::all(Vec::new()).is_none());
        let single = Predicate::all(vec![age().eq(10)]).unwrap();
        assert_eq!(single, age().eq(10));
    }

    #[test]
    fn test_try_compare_rejects_text_vs_integer() {
        let lhs = ExprNode::Column(ColumnRef::new("member", "username", SqlType::Text));
        let err = Predicate::try_compare(CompareOp::Eq, lhs, ExprNode::Literal(Value::Integer(1)))
            .unwrap_err();

        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }

    #[test]
    fn test_try_compare_accepts_integer_vs_real() {
        let lhs = ExprNode::Column(ColumnRef::new("member", "age", SqlType::Integer));
        let result =
            Predicate::try_compare(CompareOp::Goe, lhs, ExprNode::Literal(Value::Real(2.5)));
        assert!(result.is_ok());
    }

    #[test]
    fn test_try_compare_accepts_null() {
        let lhs = ExprNode::Column(ColumnRef::new("member", "username", SqlType::Text));
        assert!(Predicate::try_compare(CompareOp::Eq, lhs, null()).is_ok());
    }

    #[test]
    fn test_try_between_rejects_mixed_bounds() {
        let err = Predicate::try_between(
            age().into_node(),
            ExprNode::Literal(Value::Integer(1)),
            ExprNode::Literal(Value::Text("x".into())),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }
}
