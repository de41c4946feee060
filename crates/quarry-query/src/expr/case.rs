//! `CASE` expressions.
//!
//! Branches are tried in order and the first match wins. The builders are
//! type-states: an expression only comes out of `otherwise`, so every case
//! has a default.

use super::{Expr, ExprNode, Operand, Predicate};
use crate::value::{SqlType, SqlValue};
use std::marker::PhantomData;

/// Condition of one `WHEN` branch.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseCondition {
    /// Simple case: subject equals this value
    Equals(ExprNode),
    /// Searched case: predicate holds
    Matches(Predicate),
}

/// `CASE [subject] WHEN ... THEN ... ELSE ... END`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub subject: Option<Box<ExprNode>>,
    pub branches: Vec<(CaseCondition, ExprNode)>,
    pub otherwise: Box<ExprNode>,
}

impl CaseExpr {
    /// Type of the first branch result whose type is known.
    pub fn result_type(&self) -> Option<SqlType> {
        self.branches
            .iter()
            .map(|(_, result)| result)
            .chain(std::iter::once(self.otherwise.as_ref()))
            .find_map(|e| e.sql_type())
    }

    /// Every expression inside the case, including predicate operands.
    pub fn children(&self) -> impl Iterator<Item = &ExprNode> + '_ {
        let mut out: Vec<&ExprNode> = Vec::new();
        if let Some(subject) = &self.subject {
            out.push(subject);
        }
        for (condition, result) in &self.branches {
            match condition {
                CaseCondition::Equals(value) => out.push(value),
                CaseCondition::Matches(predicate) => out.extend(predicate.expressions()),
            }
            out.push(result);
        }
        out.push(&self.otherwise);
        out.into_iter()
    }

    /// Predicates of searched branches.
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> + '_ {
        self.branches.iter().filter_map(|(condition, _)| match condition {
            CaseCondition::Matches(p) => Some(p),
            CaseCondition::Equals(_) => None,
        })
    }
}

// ============================================================================
// Simple case: expr.when(v).then(r)...otherwise(d)
// ============================================================================

impl<T: SqlValue> Expr<T> {
    /// Start a simple case on this expression.
    pub fn when(&self, value: impl Operand<T>) -> SimpleWhen<T> {
        SimpleWhen {
            subject: self.node().unaliased().clone(),
            pending: value.into_operand(),
            _type: PhantomData,
        }
    }
}

/// First `WHEN` of a simple case, waiting for its result.
pub struct SimpleWhen<T> {
    subject: ExprNode,
    pending: ExprNode,
    _type: PhantomData<fn() -> T>,
}

impl<T> SimpleWhen<T> {
    pub fn then<R: SqlValue>(self, result: impl Operand<R>) -> SimpleCases<T, R> {
        SimpleCases {
            subject: self.subject,
            branches: vec![(CaseCondition::Equals(self.pending), result.into_operand())],
            _type: PhantomData,
        }
    }
}

/// Simple case with at least one branch.
pub struct SimpleCases<T, R> {
    subject: ExprNode,
    branches: Vec<(CaseCondition, ExprNode)>,
    _type: PhantomData<fn() -> (T, R)>,
}

impl<T, R> SimpleCases<T, R> {
    pub fn when(self, value: impl Operand<T>) -> SimpleCasesWhen<T, R> {
        SimpleCasesWhen {
            cases: self,
            pending: value.into_operand(),
        }
    }

    pub fn otherwise(self, default: impl Operand<R>) -> Expr<R> {
        Expr::from_node(ExprNode::Case(CaseExpr {
            subject: Some(Box::new(self.subject)),
            branches: self.branches,
            otherwise: Box::new(default.into_operand()),
        }))
    }
}

/// Later `WHEN` of a simple case, waiting for its result.
pub struct SimpleCasesWhen<T, R> {
    cases: SimpleCases<T, R>,
    pending: ExprNode,
}

impl<T, R> SimpleCasesWhen<T, R> {
    pub fn then(mut self, result: impl Operand<R>) -> SimpleCases<T, R> {
        self.cases
            .branches
            .push((CaseCondition::Equals(self.pending), result.into_operand()));
        self.cases
    }
}

// ============================================================================
// Searched case: CaseBuilder::new().when(p).then(r)...otherwise(d)
// ============================================================================

/// Entry point for a searched case.
#[derive(Debug, Default, Clone, Copy)]
pub struct CaseBuilder;

impl CaseBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn when(self, condition: impl Into<Predicate>) -> SearchedWhen {
        SearchedWhen {
            pending: condition.into(),
        }
    }
}

/// First `WHEN` of a searched case, waiting for its result.
pub struct SearchedWhen {
    pending: Predicate,
}

impl SearchedWhen {
    pub fn then<R: SqlValue>(self, result: impl Operand<R>) -> SearchedCases<R> {
        SearchedCases {
            branches: vec![(CaseCondition::Matches(self.pending), result.into_operand())],
            _type: PhantomData,
        }
    }
}

/// Searched case with at least one branch.
pub struct SearchedCases<R> {
    branches: Vec<(CaseCondition, ExprNode)>,
    _type: PhantomData<fn() -> R>,
}

impl<R> SearchedCases<R> {
    pub fn when(self, condition: impl Into<Predicate>) -> SearchedCasesWhen<R> {
        SearchedCasesWhen {
            cases: self,
            pending: condition.into(),
        }
    }

    pub fn otherwise(self, default: impl Operand<R>) -> Expr<R> {
        Expr::from_node(ExprNode::Case(CaseExpr {
            subject: None,
            branches: self.branches,
            otherwise: Box::new(default.into_operand()),
        }))
    }
}

/// Later `WHEN` of a searched case, waiting for its result.
pub struct SearchedCasesWhen<R> {
    cases: SearchedCases<R>,
    pending: Predicate,
}

impl<R> SearchedCasesWhen<R> {
    pub fn then(mut self, result: impl Operand<R>) -> SearchedCases<R> {
        self.cases
            .branches
            .push((CaseCondition::Matches(self.pending), result.into_operand()));
        self.cases
    }
}
