//! Persistence seams.
//!
//! Query execution only talks to a [`PersistenceContext`]; the backend owns
//! connection handling, the identity map and units of work.

use crate::entity::{Entity, EntityMeta};
use crate::error::{PersistenceError, QueryResult};
use crate::render::{QueryRenderer, RenderedQuery};
use crate::value::Value;

/// Executes rendered queries and tracks loaded entities.
pub trait PersistenceContext {
    /// Renderer for this backend's dialect.
    fn renderer(&self) -> &dyn QueryRenderer;

    /// Run a rendered query and return raw rows. Pending writes are flushed
    /// first.
    fn execute(&self, query: &RenderedQuery) -> Result<Vec<Vec<Value>>, PersistenceError>;

    /// Record an entity row returned by a query in the identity map.
    fn attach(&self, meta: &'static EntityMeta, values: &[Value]) -> Result<(), PersistenceError>;

    /// True if the entity with this id is in the identity map.
    fn is_loaded(&self, meta: &'static EntityMeta, id: i64) -> bool;

    /// True if the target of `entity.association` is in the identity map.
    /// An unset association counts as loaded.
    fn is_association_loaded<E: Entity>(&self, entity: &E, association: &str) -> bool
    where
        Self: Sized,
    {
        let Some(meta) = E::meta().association(association) else {
            return false;
        };
        match entity.association_id(association) {
            Some(target) => self.is_loaded(meta.target, target),
            None => true,
        }
    }

    fn begin_unit_of_work(&self) -> Result<(), PersistenceError>;

    fn commit(&self) -> Result<(), PersistenceError>;

    fn rollback(&self) -> Result<(), PersistenceError>;
}

/// Entity writes and lookups through the identity map.
pub trait EntityStore {
    /// Assign an id, queue the row for writing and attach it.
    fn insert<E: Entity>(&self, entity: &mut E) -> QueryResult<i64>;

    /// Write every queued row.
    fn flush(&self) -> QueryResult<()>;

    /// Empty the identity map. Unflushed writes are discarded.
    fn clear_cache(&self);

    /// Identity map first, then the database.
    fn find<E: Entity>(&self, id: i64) -> QueryResult<Option<E>>;
}
