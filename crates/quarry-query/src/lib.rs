//! Quarry query layer.
//!
//! Typed query expressions over entity paths, an owned fluent builder that
//! accumulates an immutable [`QueryPlan`], plan validation, SQLite
//! rendering, and row mapping into scalars, entities, tuples and DTOs.
//!
//! ## Architecture
//!
//! ```text
//! Expr<T> / Predicate ──▶ Query<P> ──▶ validate ──▶ QueryRenderer ──▶ PersistenceContext
//!                          (plan)                    (SQL + params)     (rows ──▶ P::Output)
//! ```
//!
//! Nothing touches a persistence context until a terminal `fetch*` call.

pub mod association;
pub mod context;
pub mod dto;
pub mod entity;
pub mod error;
pub mod expr;
pub mod projection;
pub mod query;
pub mod render;
pub mod row;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use association::AssociationIndex;
pub use context::{EntityStore, PersistenceContext};
pub use dto::{BeanBinding, ConstructorBinding, FieldBinding, FieldSlot, Projections, Setter};
pub use entity::{
    decode_column, AssociationMeta, AssociationPath, ColumnMeta, Entity, EntityMeta, EntityPath,
};
pub use error::{PersistenceError, PersistenceErrorKind, QueryError, QueryResult, RenderError};
pub use expr::{constant, count_all, CaseBuilder, Expr, ExprNode, OrderSpecifier, Predicate};
pub use projection::{Projection, TupleItem};
pub use query::{select, select_from, subquery, Query, QueryPlan, QueryResults};
pub use render::{QueryRenderer, RenderedQuery, SqliteRenderer};
pub use row::{Row, Tuple};
pub use value::{FromValue, SqlType, SqlValue, Value};
