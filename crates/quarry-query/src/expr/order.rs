//! Sort keys.

use super::{Expr, ExprNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Where NULL sort keys land. `Default` leaves it to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullHandling {
    #[default]
    Default,
    NullsFirst,
    NullsLast,
}

/// One `ORDER BY` key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpecifier {
    pub expr: ExprNode,
    pub direction: Direction,
    pub nulls: NullHandling,
}

impl OrderSpecifier {
    pub fn new(expr: ExprNode, direction: Direction) -> Self {
        Self {
            expr,
            direction,
            nulls: NullHandling::Default,
        }
    }

    /// NULLs first regardless of direction.
    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullHandling::NullsFirst;
        self
    }

    /// NULLs last regardless of direction.
    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullHandling::NullsLast;
        self
    }
}

impl<T> Expr<T> {
    pub fn asc(&self) -> OrderSpecifier {
        OrderSpecifier::new(self.node().unaliased().clone(), Direction::Asc)
    }

    pub fn desc(&self) -> OrderSpecifier {
        OrderSpecifier::new(self.node().unaliased().clone(), Direction::Desc)
    }
}
