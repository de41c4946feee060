//! What each result row becomes.
//!
//! A [`Projection`] contributes select items to the plan and maps each
//! returned [`Row`] to its output type:
//!
//! - `Expr<T>` yields `T`
//! - `&QMember` (any [`EntityPath`]) yields the entity
//! - a Rust tuple of two to six items yields a [`Tuple`]
//! - [`crate::dto`] projections yield DTOs

use crate::entity::EntityPath;
use crate::error::{QueryError, QueryResult};
use crate::expr::{Expr, ExprNode};
use crate::query::{Query, SelectItem, Source};
use crate::row::{Row, Tuple};
use crate::value::FromValue;

pub trait Projection {
    type Output;

    /// Select items in the order [`Projection::project`] reads them.
    fn select_items(&self) -> Vec<SelectItem>;

    fn project(&self, row: &Row) -> QueryResult<Self::Output>;
}

impl<T: FromValue> Projection for Expr<T> {
    type Output = T;

    fn select_items(&self) -> Vec<SelectItem> {
        vec![SelectItem::Expr(self.node().clone())]
    }

    fn project(&self, row: &Row) -> QueryResult<T> {
        row.decode(0)
    }
}

impl<'a, E: EntityPath> Projection for &'a E {
    type Output = E::Entity;

    fn select_items(&self) -> Vec<SelectItem> {
        vec![SelectItem::Entity(Source::of(*self))]
    }

    fn project(&self, row: &Row) -> QueryResult<E::Entity> {
        row.entity(0)?.ok_or_else(|| {
            QueryError::invalid(format!("row for '{}' has no id", self.alias()))
        })
    }
}

/// One element of a tuple projection.
pub trait TupleItem {
    fn tuple_item(&self) -> SelectItem;
}

impl<T> TupleItem for Expr<T> {
    fn tuple_item(&self) -> SelectItem {
        SelectItem::Expr(self.node().clone())
    }
}

impl<'a, E: EntityPath> TupleItem for &'a E {
    fn tuple_item(&self) -> SelectItem {
        SelectItem::Entity(Source::of(*self))
    }
}

/// Scalar subquery as a select item.
impl<T> TupleItem for Query<Expr<T>> {
    fn tuple_item(&self) -> SelectItem {
        SelectItem::Expr(ExprNode::Subquery(Box::new(self.plan().clone())))
    }
}

macro_rules! tuple_projection {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: TupleItem),+> Projection for ($($name,)+) {
            type Output = Tuple;

            fn select_items(&self) -> Vec<SelectItem> {
                vec![$(self.$idx.tuple_item()),+]
            }

            fn project(&self, row: &Row) -> QueryResult<Tuple> {
                Ok(Tuple::new(row.clone()))
            }
        }
    };
}

tuple_projection!(A: 0, B: 1);
tuple_projection!(A: 0, B: 1, C: 2);
tuple_projection!(A: 0, B: 1, C: 2, D: 3);
tuple_projection!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_projection!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
