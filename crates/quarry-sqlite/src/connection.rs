//! SQLite connection management
//!
//! Uses a simple Arc<Mutex<Connection>> pattern; one connection serves a
//! session and its units of work.

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};
use crate::schema;
use parking_lot::Mutex;
use quarry_query::{EntityMeta, Value};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql};
use std::sync::Arc;
use tracing::{debug, info};

/// Thread-safe SQLite connection wrapper
#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
    config: SqliteConfig,
}

impl SqlitePool {
    /// Open a connection and apply pragmas and the migration table.
    pub fn new(config: SqliteConfig) -> SqliteResult<Self> {
        info!(path = ?config.path, "Creating SQLite connection");

        let conn = if config.is_memory() {
            Connection::open_in_memory()?
        } else {
            // Ensure parent directory exists
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SqliteError::Connection(format!("Failed to create directory: {}", e))
                })?;
            }
            Connection::open(&config.path)
                .map_err(|e| SqliteError::Connection(format!("Failed to open database: {}", e)))?
        };

        let pool = Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        };
        pool.initialize()?;
        Ok(pool)
    }

    /// Create an in-memory pool for testing
    pub fn memory() -> SqliteResult<Self> {
        Self::new(SqliteConfig::memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Execute a closure with the connection
    pub fn with_connection<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Create tables for `entities` that do not exist yet.
    pub fn ensure_schema(&self, entities: &[&'static EntityMeta]) -> SqliteResult<()> {
        self.with_connection(|conn| schema::apply_entity_migrations(conn, entities))
    }

    /// Run a statement with named parameters and collect every row.
    pub fn query(&self, sql: &str, params: &[(String, Value)]) -> SqliteResult<Vec<Vec<Value>>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            bind_named(&mut stmt, params)?;
            let width = stmt.column_count();

            let mut rows = stmt.raw_query();
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(width);
                for index in 0..width {
                    values.push(from_sql_value(row.get_ref(index)?)?);
                }
                out.push(values);
            }
            Ok(out)
        })
    }

    /// Run a statement with positional parameters; returns changed rows.
    pub fn execute(&self, sql: &str, params: &[Value]) -> SqliteResult<usize> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let bound: Vec<SqlParam<'_>> = params.iter().map(SqlParam).collect();
            Ok(stmt.execute(rusqlite::params_from_iter(bound.iter()))?)
        })
    }

    /// Execute a batch of statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        self.with_connection(|conn| Ok(conn.execute_batch(sql)?))
    }

    /// True if the connection is not in autocommit mode.
    pub fn in_transaction(&self) -> bool {
        !self.conn.lock().is_autocommit()
    }

    /// Initialize the database (configure pragmas and migration bookkeeping)
    fn initialize(&self) -> SqliteResult<()> {
        self.with_connection(|conn| {
            self.configure_pragmas(conn)?;
            schema::ensure_migrations_table(conn)?;

            info!("SQLite database initialized successfully");
            Ok(())
        })
    }

    /// Configure SQLite PRAGMA settings
    fn configure_pragmas(&self, conn: &Connection) -> SqliteResult<()> {
        debug!("Configuring SQLite pragmas");

        // WAL mode for better concurrency
        if self.config.wal_mode && !self.config.is_memory() {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        }

        // Foreign key enforcement
        if self.config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }

        conn.busy_timeout(std::time::Duration::from_millis(u64::from(
            self.config.busy_timeout_ms,
        )))?;

        conn.execute_batch(&format!("PRAGMA cache_size = {};", self.config.cache_size))?;

        // MMAP for faster reads (if configured)
        if self.config.mmap_size > 0 {
            conn.execute_batch(&format!("PRAGMA mmap_size = {};", self.config.mmap_size))?;
        }

        // LIKE patterns match case-sensitively
        conn.execute_batch("PRAGMA case_sensitive_like = ON;")?;
        conn.execute_batch("PRAGMA temp_store = MEMORY;")?;

        Ok(())
    }
}

/// Borrowed [`Value`] bound as a statement parameter.
struct SqlParam<'a>(&'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Integer(v) => ToSqlOutput::from(*v),
            Value::Real(v) => ToSqlOutput::from(*v),
            Value::Text(v) => ToSqlOutput::from(v.as_str()),
            Value::Boolean(v) => ToSqlOutput::from(*v),
        })
    }
}

fn bind_named(
    stmt: &mut rusqlite::CachedStatement<'_>,
    params: &[(String, Value)],
) -> SqliteResult<()> {
    for (name, value) in params {
        let placeholder = format!(":{}", name);
        let index = stmt.parameter_index(&placeholder)?.ok_or_else(|| {
            SqliteError::InvalidOperation(format!("statement has no parameter {}", placeholder))
        })?;
        stmt.raw_bind_parameter(index, SqlParam(value))?;
    }
    Ok(())
}

fn from_sql_value(value: ValueRef<'_>) -> SqliteResult<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(bytes) => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| SqliteError::UnsupportedValue(format!("invalid UTF-8 text: {}", e)))?
                .to_string(),
        ),
        ValueRef::Blob(_) => {
            return Err(SqliteError::UnsupportedValue(
                "BLOB columns are not supported".to_string(),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_pool() {
        let pool = SqlitePool::memory().expect("Failed to create memory pool");

        pool.with_connection(|conn| {
            let result: i64 = conn.query_row("SELECT 1 + 1", [], |row| row.get(0))?;
            assert_eq!(result, 2);
            Ok(())
        })
        .expect("Query failed");
    }

    #[test]
    fn test_file_pool_uses_wal() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("test.db");

        let pool = SqlitePool::new(SqliteConfig::new(&db_path)).expect("Failed to create pool");

        pool.with_connection(|conn| {
            let mode: String = conn.query_row("PRAGMA journal_mode;", [], |row| row.get(0))?;
            assert_eq!(mode.to_lowercase(), "wal");
            Ok(())
        })
        .expect("Query failed");
        assert!(db_path.exists());
    }

    #[test]
    fn test_query_binds_named_params() {
        let pool = SqlitePool::memory().unwrap();
        let rows = pool
            .query(
                "SELECT :p1 + :p2, :p3, :p4",
                &[
                    ("p1".to_string(), Value::Integer(2)),
                    ("p2".to_string(), Value::Integer(3)),
                    ("p3".to_string(), Value::Text("x".into())),
                    ("p4".to_string(), Value::Null),
                ],
            )
            .unwrap();

        assert_eq!(
            rows,
            vec![vec![Value::Integer(5), Value::Text("x".into()), Value::Null]]
        );
    }

    #[test]
    fn test_unknown_param_rejected() {
        let pool = SqlitePool::memory().unwrap();
        let err = pool
            .query("SELECT 1", &[("p1".to_string(), Value::Integer(1))])
            .unwrap_err();
        assert!(matches!(err, SqliteError::InvalidOperation(_)));
    }

    #[test]
    fn test_like_is_case_sensitive() {
        let pool = SqlitePool::memory().unwrap();
        let rows = pool
            .query("SELECT 'Member' LIKE 'member%'", &[])
            .unwrap();
        assert_eq!(rows, vec![vec![Value::Integer(0)]]);
    }

    #[test]
    fn test_migrations_table_created() {
        let pool = SqlitePool::memory().unwrap();
        let rows = pool
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
                &[],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
