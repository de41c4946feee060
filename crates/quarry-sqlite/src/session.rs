//! SQLite-backed persistence context
//!
//! A [`SqliteSession`] is one unit of work: it owns an identity map keyed by
//! `(table, id)`, a queue of pending writes that is flushed before every
//! query, and the association indexes of every entity it has seen.

use crate::config::SqliteConfig;
use crate::connection::SqlitePool;
use crate::error::{SqliteError, SqliteResult};
use parking_lot::Mutex;
use quarry_query::{
    AssociationIndex, Entity, EntityMeta, EntityStore, PersistenceContext, PersistenceError,
    QueryError, QueryRenderer, QueryResult, RenderedQuery, SqliteRenderer, Value,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

type EntityKey = (&'static str, i64);

#[derive(Debug, Clone)]
enum PendingWrite {
    Insert {
        meta: &'static EntityMeta,
        values: Vec<Value>,
    },
    Update {
        meta: &'static EntityMeta,
        id: i64,
        column: &'static str,
        value: Value,
    },
}

#[derive(Default)]
struct SessionState {
    identity: HashMap<EntityKey, Vec<Value>>,
    pending: Vec<PendingWrite>,
    /// Highest id handed out per table
    sequences: HashMap<&'static str, i64>,
    /// `(owning table, association name)` -> both directions of the link
    associations: HashMap<(&'static str, &'static str), AssociationIndex>,
}

impl SessionState {
    fn remember(&mut self, meta: &'static EntityMeta, id: i64, values: Vec<Value>) {
        for association in meta.associations {
            let parent = meta
                .column_index(association.column)
                .and_then(|index| match values.get(index) {
                    Some(Value::Integer(parent)) => Some(*parent),
                    _ => None,
                });
            self.associations
                .entry((meta.table, association.name))
                .or_default()
                .link(id, parent);
        }
        self.identity.insert((meta.table, id), values);
    }

    fn reset(&mut self) {
        self.identity.clear();
        self.pending.clear();
        self.sequences.clear();
        self.associations.clear();
    }
}

/// Persistence context over a [`SqlitePool`].
pub struct SqliteSession {
    pool: SqlitePool,
    renderer: SqliteRenderer,
    state: Mutex<SessionState>,
}

impl SqliteSession {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            renderer: SqliteRenderer,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Open a database and create the tables of `entities`.
    pub fn open(config: SqliteConfig, entities: &[&'static EntityMeta]) -> SqliteResult<Self> {
        let pool = SqlitePool::new(config)?;
        pool.ensure_schema(entities)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of writes waiting for the next flush.
    pub fn pending_writes(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Number of entities in the identity map.
    pub fn managed_count(&self) -> usize {
        self.state.lock().identity.len()
    }

    /// Point `child.association` at `parent` and keep the inverse side in
    /// step. Managed children get their foreign key written on the next
    /// flush.
    pub fn relate<C: Entity, P: Entity>(
        &self,
        child: &mut C,
        association: &str,
        parent: &P,
    ) -> QueryResult<()> {
        let meta = C::meta();
        let association = meta.association(association).ok_or_else(|| {
            QueryError::invalid(format!("{} has no association {}", meta.name, association))
        })?;
        if !std::ptr::eq(association.target, P::meta()) {
            return Err(QueryError::invalid(format!(
                "{}.{} points at {}, not {}",
                meta.name,
                association.name,
                association.target.name,
                P::meta().name
            )));
        }
        let parent_id = parent.id().ok_or_else(|| {
            QueryError::invalid(format!(
                "{} must be inserted before it can be related",
                P::meta().name
            ))
        })?;
        if !child.set_association_id(association.name, Some(parent_id)) {
            return Err(QueryError::invalid(format!(
                "{} does not expose association {}",
                meta.name, association.name
            )));
        }

        let Some(child_id) = child.id() else {
            return Ok(());
        };
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(values) = state.identity.get_mut(&(meta.table, child_id)) else {
            return Ok(());
        };
        let column = meta.column_index(association.column).ok_or_else(|| {
            QueryError::invalid(format!(
                "{} has no column {}",
                meta.name, association.column
            ))
        })?;
        if let Some(slot) = values.get_mut(column) {
            *slot = Value::Integer(parent_id);
        }

        let mut queued = false;
        for write in state.pending.iter_mut() {
            if let PendingWrite::Insert { meta: m, values } = write {
                if m.table == meta.table && m.id_of(values) == Some(child_id) {
                    if let Some(slot) = values.get_mut(column) {
                        *slot = Value::Integer(parent_id);
                    }
                    queued = true;
                    break;
                }
            }
        }
        if !queued {
            state.pending.push(PendingWrite::Update {
                meta,
                id: child_id,
                column: association.column,
                value: Value::Integer(parent_id),
            });
        }

        state
            .associations
            .entry((meta.table, association.name))
            .or_default()
            .link(child_id, Some(parent_id));
        Ok(())
    }

    /// Ids of managed `C` entities whose `association` points at `parent_id`,
    /// in the order they were linked.
    pub fn children_of<C: Entity>(&self, association: &str, parent_id: i64) -> Vec<i64> {
        let Some(association) = C::meta().association(association) else {
            return Vec::new();
        };
        self.state
            .lock()
            .associations
            .get(&(C::meta().table, association.name))
            .map(|index| index.children_of(parent_id).to_vec())
            .unwrap_or_default()
    }

    /// Current sequence value for `meta`, read from the table on first use.
    fn sequence(&self, state: &SessionState, meta: &'static EntityMeta) -> SqliteResult<i64> {
        if let Some(current) = state.sequences.get(meta.table) {
            return Ok(*current);
        }
        let rows = self.pool.query(
            &format!(
                "SELECT COALESCE(MAX({}), 0) FROM {}",
                meta.id_column, meta.table
            ),
            &[],
        )?;
        match rows.first().and_then(|row| row.first()) {
            Some(Value::Integer(max)) => Ok(*max),
            _ => Ok(0),
        }
    }

    fn flush_pending(&self, state: &mut SessionState) -> SqliteResult<()> {
        if state.pending.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut state.pending);
        debug!(writes = pending.len(), "Flushing pending writes");

        for (index, write) in pending.iter().enumerate() {
            if let Err(e) = self.apply(write) {
                state.pending = pending[index..].to_vec();
                return Err(e);
            }
        }
        Ok(())
    }

    fn apply(&self, write: &PendingWrite) -> SqliteResult<()> {
        match write {
            PendingWrite::Insert { meta, values } => {
                let columns: Vec<&str> = meta.columns.iter().map(|c| c.name).collect();
                let placeholders = vec!["?"; columns.len()].join(", ");
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    meta.table,
                    columns.join(", "),
                    placeholders
                );
                self.log_statement(&sql);
                self.pool.execute(&sql, values)?;
            }
            PendingWrite::Update {
                meta,
                id,
                column,
                value,
            } => {
                let sql = format!(
                    "UPDATE {} SET {} = ? WHERE {} = ?",
                    meta.table, column, meta.id_column
                );
                self.log_statement(&sql);
                let changed = self
                    .pool
                    .execute(&sql, &[value.clone(), Value::Integer(*id)])?;
                if changed == 0 {
                    return Err(SqliteError::InvalidOperation(format!(
                        "{} {} no longer exists",
                        meta.name, id
                    )));
                }
            }
        }
        Ok(())
    }

    fn log_statement(&self, sql: &str) {
        if self.pool.config().show_sql {
            info!(sql = %sql, "Executing statement");
        } else {
            debug!(sql = %sql, "Executing statement");
        }
    }
}

impl PersistenceContext for SqliteSession {
    fn renderer(&self) -> &dyn QueryRenderer {
        &self.renderer
    }

    fn execute(&self, query: &RenderedQuery) -> Result<Vec<Vec<Value>>, PersistenceError> {
        {
            let mut state = self.state.lock();
            self.flush_pending(&mut state)?;
        }

        if self.pool.config().show_sql {
            info!(sql = %query.sql, params = ?query.params, "Executing query");
        } else {
            debug!(sql = %query.sql, params = ?query.params, "Executing query");
        }
        Ok(self.pool.query(&query.sql, &query.params)?)
    }

    fn attach(&self, meta: &'static EntityMeta, values: &[Value]) -> Result<(), PersistenceError> {
        let id = meta
            .id_of(values)
            .ok_or_else(|| PersistenceError::backend(format!("{} row has no id", meta.name)))?;

        let mut state = self.state.lock();
        // The managed copy wins over what the database returned
        if !state.identity.contains_key(&(meta.table, id)) {
            state.remember(meta, id, values.to_vec());
        }
        Ok(())
    }

    fn is_loaded(&self, meta: &'static EntityMeta, id: i64) -> bool {
        self.state.lock().identity.contains_key(&(meta.table, id))
    }

    fn begin_unit_of_work(&self) -> Result<(), PersistenceError> {
        if self.pool.in_transaction() {
            return Err(SqliteError::InvalidOperation(
                "a unit of work is already active".to_string(),
            )
            .into());
        }
        self.pool.execute_batch("BEGIN")?;
        debug!("Began unit of work");
        Ok(())
    }

    fn commit(&self) -> Result<(), PersistenceError> {
        if !self.pool.in_transaction() {
            return Err(SqliteError::InvalidOperation("no active unit of work".to_string()).into());
        }
        {
            let mut state = self.state.lock();
            self.flush_pending(&mut state)?;
        }
        self.pool.execute_batch("COMMIT")?;
        debug!("Committed unit of work");
        Ok(())
    }

    fn rollback(&self) -> Result<(), PersistenceError> {
        if !self.pool.in_transaction() {
            return Err(SqliteError::InvalidOperation("no active unit of work".to_string()).into());
        }
        self.pool.execute_batch("ROLLBACK")?;
        self.state.lock().reset();
        debug!("Rolled back unit of work");
        Ok(())
    }
}

impl EntityStore for SqliteSession {
    fn insert<E: Entity>(&self, entity: &mut E) -> QueryResult<i64> {
        let meta = E::meta();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let id = match entity.id() {
            Some(id) => {
                if state.identity.contains_key(&(meta.table, id)) {
                    return Err(QueryError::invalid(format!(
                        "{} {} is already managed by this session",
                        meta.name, id
                    )));
                }
                let current = self.sequence(state, meta)?;
                state.sequences.insert(meta.table, current.max(id));
                id
            }
            None => {
                let id = self.sequence(state, meta)? + 1;
                state.sequences.insert(meta.table, id);
                entity.set_id(id);
                id
            }
        };

        let values = entity.to_values();
        debug!(entity = meta.name, id, "Queued insert");
        state.pending.push(PendingWrite::Insert {
            meta,
            values: values.clone(),
        });
        state.remember(meta, id, values);
        Ok(id)
    }

    fn flush(&self) -> QueryResult<()> {
        let mut state = self.state.lock();
        Ok(self.flush_pending(&mut state)?)
    }

    fn clear_cache(&self) {
        let mut state = self.state.lock();
        if !state.pending.is_empty() {
            warn!(
                discarded = state.pending.len(),
                "Clearing session with unflushed writes"
            );
        }
        let managed = state.identity.len();
        state.identity.clear();
        state.pending.clear();
        state.associations.clear();
        debug!(managed, "Cleared session cache");
    }

    fn find<E: Entity>(&self, id: i64) -> QueryResult<Option<E>> {
        let meta = E::meta();
        let cached = self.state.lock().identity.get(&(meta.table, id)).cloned();
        if let Some(values) = cached {
            return E::from_values(&values).map(Some);
        }

        let columns: Vec<&str> = meta.columns.iter().map(|c| c.name).collect();
        let query = RenderedQuery {
            sql: format!(
                "SELECT {} FROM {} WHERE {} = :id",
                columns.join(", "),
                meta.table,
                meta.id_column
            ),
            params: vec![("id".to_string(), Value::Integer(id))],
        };
        let Some(values) = self.execute(&query)?.into_iter().next() else {
            return Ok(None);
        };
        self.attach(meta, &values)?;
        E::from_values(&values).map(Some)
    }
}
