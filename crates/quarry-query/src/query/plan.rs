//! Immutable query plan accumulated by the builder.

use crate::entity::{AssociationMeta, EntityMeta, EntityPath};
use crate::expr::{ExprNode, OrderSpecifier, Predicate};
use crate::value::SqlType;

/// An aliased entity table in FROM or JOIN position.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub alias: String,
    pub meta: &'static EntityMeta,
}

impl Source {
    pub fn of<E: EntityPath + ?Sized>(path: &E) -> Self {
        Self {
            alias: path.alias().to_string(),
            meta: path.meta(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// One JOIN clause, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub target: Source,
    /// Owner alias and association for association joins; `None` joins the
    /// target entity with only the `on` predicate.
    pub association: Option<(String, &'static AssociationMeta)>,
    /// Extra join-time filter. For outer joins it filters before padding.
    pub on: Option<Predicate>,
    /// Also materialize the joined entity into the persistence context
    pub fetch: bool,
}

/// One entry of the SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Expr(ExprNode),
    /// All columns of an entity source
    Entity(Source),
}

impl SelectItem {
    /// Number of result columns this item occupies.
    pub fn width(&self) -> usize {
        match self {
            Self::Expr(_) => 1,
            Self::Entity(source) => source.meta.columns.len(),
        }
    }
}

/// Everything one query needs, compiled only at a terminal fetch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPlan {
    pub select: Vec<SelectItem>,
    pub distinct: bool,
    pub sources: Vec<Source>,
    pub joins: Vec<Join>,
    pub filter: Option<Predicate>,
    pub group_by: Vec<ExprNode>,
    pub having: Option<Predicate>,
    pub order_by: Vec<OrderSpecifier>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    /// Builder misuse recorded at the call site, reported by validation
    pub problems: Vec<String>,
}

impl QueryPlan {
    /// Type of a single-expression projection; `None` otherwise.
    pub fn scalar_type(&self) -> Option<SqlType> {
        match self.select.as_slice() {
            [SelectItem::Expr(expr)] => expr.sql_type(),
            _ => None,
        }
    }

    /// True if results are grouped or reduced by aggregates.
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty()
            || self.select.iter().any(|item| match item {
                SelectItem::Expr(expr) => expr.contains_aggregate(),
                SelectItem::Entity(_) => false,
            })
    }

    /// Fetch-joined entities, appended after the visible select items.
    pub fn fetched(&self) -> impl Iterator<Item = &Source> + '_ {
        self.joins.iter().filter(|j| j.fetch).map(|j| &j.target)
    }

    /// Select list as rendered: visible items followed by fetched entities.
    pub fn output_items(&self) -> Vec<SelectItem> {
        self.select
            .iter()
            .cloned()
            .chain(self.fetched().cloned().map(SelectItem::Entity))
            .collect()
    }
}
