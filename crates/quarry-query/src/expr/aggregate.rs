//! Aggregate functions.

use super::{Expr, ExprNode};
use crate::value::Numeric;

/// SQL aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFn {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Max => "MAX",
            Self::Min => "MIN",
        }
    }

    pub fn requires_numeric(self) -> bool {
        matches!(self, Self::Sum | Self::Avg)
    }
}

fn aggregate(func: AggregateFn, arg: &ExprNode, distinct: bool) -> ExprNode {
    ExprNode::Aggregate {
        func,
        arg: Some(Box::new(arg.unaliased().clone())),
        distinct,
    }
}

impl<T> Expr<T> {
    pub fn count(&self) -> Expr<i64> {
        Expr::from_node(aggregate(AggregateFn::Count, self.node(), false))
    }

    pub fn count_distinct(&self) -> Expr<i64> {
        Expr::from_node(aggregate(AggregateFn::Count, self.node(), true))
    }

    pub fn max(&self) -> Expr<T> {
        Expr::from_node(aggregate(AggregateFn::Max, self.node(), false))
    }

    pub fn min(&self) -> Expr<T> {
        Expr::from_node(aggregate(AggregateFn::Min, self.node(), false))
    }
}

impl<T: Numeric> Expr<T> {
    pub fn sum(&self) -> Expr<T> {
        Expr::from_node(aggregate(AggregateFn::Sum, self.node(), false))
    }

    /// Floating-point mean over the matching rows.
    pub fn avg(&self) -> Expr<f64> {
        Expr::from_node(aggregate(AggregateFn::Avg, self.node(), false))
    }
}

/// `COUNT(*)`
pub fn count_all() -> Expr<i64> {
    Expr::from_node(ExprNode::Aggregate {
        func: AggregateFn::Count,
        arg: None,
        distinct: false,
    })
}
