//! Entity metadata and typed entity paths.
//!
//! Entities describe themselves through a static [`EntityMeta`] instead of
//! runtime reflection. A generated-style path type (`QMember`, `QTeam`)
//! implements [`EntityPath`] and exposes one [`Expr`] per column.

use crate::error::{QueryError, QueryResult};
use crate::expr::Expr;
use crate::value::{FromValue, SqlType, SqlValue, Value};
use std::marker::PhantomData;

/// A persisted column of an entity table.
#[derive(Debug, PartialEq)]
pub struct ColumnMeta {
    pub name: &'static str,
    pub ty: SqlType,
    pub nullable: bool,
}

/// A many-to-one association stored as a foreign key on the owning entity.
#[derive(Debug, PartialEq)]
pub struct AssociationMeta {
    /// Property name on the owning entity (`team`)
    pub name: &'static str,
    /// Foreign key column on the owning table (`team_id`)
    pub column: &'static str,
    /// Entity the foreign key points at
    pub target: &'static EntityMeta,
    /// Property name of the inverse collection on the target (`members`)
    pub inverse: Option<&'static str>,
}

/// Static description of an entity table.
///
/// `columns` starts with the id column and fixes the order used by
/// [`Entity::to_values`] and [`Entity::from_values`].
#[derive(Debug, PartialEq)]
pub struct EntityMeta {
    pub name: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    pub columns: &'static [ColumnMeta],
    pub associations: &'static [AssociationMeta],
}

impl EntityMeta {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn id_index(&self) -> usize {
        self.column_index(self.id_column).unwrap_or(0)
    }

    pub fn association(&self, name: &str) -> Option<&'static AssociationMeta> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// Read the id out of a row laid out in column order.
    pub fn id_of(&self, values: &[Value]) -> Option<i64> {
        match values.get(self.id_index()) {
            Some(Value::Integer(id)) => Some(*id),
            _ => None,
        }
    }
}

/// A record type persisted in one table.
pub trait Entity: Sized {
    fn meta() -> &'static EntityMeta;

    /// `None` until the entity store assigns an id
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Column values in [`EntityMeta::columns`] order.
    fn to_values(&self) -> Vec<Value>;

    /// Hydrate from column values in [`EntityMeta::columns`] order.
    fn from_values(values: &[Value]) -> QueryResult<Self>;

    /// Target id of a many-to-one association, if set.
    fn association_id(&self, _association: &str) -> Option<i64> {
        None
    }

    /// Point a many-to-one association at a new target. Returns false for
    /// unknown associations.
    fn set_association_id(&mut self, _association: &str, _target: Option<i64>) -> bool {
        false
    }
}

/// Decode column `index` of an entity row.
pub fn decode_column<T: FromValue>(
    meta: &EntityMeta,
    values: &[Value],
    index: usize,
) -> QueryResult<T> {
    let value = values.get(index).cloned().ok_or_else(|| {
        QueryError::invalid(format!(
            "{} row has {} columns, expected at least {}",
            meta.name,
            values.len(),
            index + 1
        ))
    })?;
    T::from_value(value).map_err(|err| match err {
        QueryError::TypeMismatch {
            expected, found, ..
        } => QueryError::TypeMismatch {
            expected,
            found,
            context: format!(
                "{}.{}",
                meta.name,
                meta.columns.get(index).map(|c| c.name).unwrap_or("?")
            ),
        },
        other => other,
    })
}

/// Alias-qualified handle on an entity used as a query source.
pub trait EntityPath {
    type Entity: Entity;

    fn alias(&self) -> &str;

    fn meta(&self) -> &'static EntityMeta {
        Self::Entity::meta()
    }

    /// Path to a column of this entity.
    fn column<T: SqlValue>(&self, name: &str) -> Expr<T> {
        Expr::column(self.alias(), name)
    }

    fn id_path(&self) -> Expr<i64> {
        Expr::column(self.alias(), self.meta().id_column)
    }

    /// `count(alias.id)`
    fn count(&self) -> Expr<i64> {
        self.id_path().count()
    }
}

/// Path to a declared many-to-one association, used by `join`/`left_join`.
pub struct AssociationPath<E> {
    owner: String,
    meta: &'static AssociationMeta,
    _target: PhantomData<fn() -> E>,
}

impl<E: Entity> AssociationPath<E> {
    pub fn new(owner: impl Into<String>, meta: &'static AssociationMeta) -> Self {
        Self {
            owner: owner.into(),
            meta,
            _target: PhantomData,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn meta(&self) -> &'static AssociationMeta {
        self.meta
    }
}

impl<E> Clone for AssociationPath<E> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            meta: self.meta,
            _target: PhantomData,
        }
    }
}

impl<E> std::fmt::Debug for AssociationPath<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.owner, self.meta.name)
    }
}
