//! Schema management and migrations
//!
//! Entity tables are generated from [`EntityMeta`] descriptors. Each table
//! is one migration, recorded by name in `schema_migrations`.

use crate::error::{SqliteError, SqliteResult};
use quarry_query::EntityMeta;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

/// Create the bookkeeping table if it does not exist.
pub fn ensure_migrations_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            name TEXT PRIMARY KEY NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;
    Ok(())
}

/// Apply the table migration of every entity not applied yet.
pub fn apply_entity_migrations(
    conn: &Connection,
    entities: &[&'static EntityMeta],
) -> SqliteResult<()> {
    ensure_migrations_table(conn)?;

    for meta in entities {
        let name = migration_name(meta);
        if is_applied(conn, &name)? {
            debug!(migration = %name, "Migration already applied");
            continue;
        }

        info!(migration = %name, table = meta.table, "Applying schema migration");
        conn.execute_batch(&create_table_sql(meta)).map_err(|e| {
            SqliteError::Schema(format!("Failed to create table {}: {}", meta.table, e))
        })?;
        record_migration(conn, &name)?;
    }
    Ok(())
}

/// Names of applied migrations, oldest first.
pub fn applied_migrations(conn: &Connection) -> SqliteResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY applied_at, rowid")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

fn migration_name(meta: &EntityMeta) -> String {
    format!("create_{}", meta.table)
}

fn is_applied(conn: &Connection, name: &str) -> SqliteResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM schema_migrations WHERE name = ?",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn record_migration(conn: &Connection, name: &str) -> SqliteResult<()> {
    conn.execute("INSERT INTO schema_migrations (name) VALUES (?)", [name])?;
    Ok(())
}

/// `CREATE TABLE` plus one index per association key.
pub fn create_table_sql(meta: &EntityMeta) -> String {
    let columns: Vec<String> = meta
        .columns
        .iter()
        .map(|column| {
            let mut def = format!("    {} {}", column.name, column.ty.sql_name());
            if column.name == meta.id_column {
                def.push_str(" PRIMARY KEY NOT NULL");
            } else if !column.nullable {
                def.push_str(" NOT NULL");
            }
            if let Some(association) = meta.associations.iter().find(|a| a.column == column.name) {
                def.push_str(&format!(
                    " REFERENCES {}({})",
                    association.target.table, association.target.id_column
                ));
            }
            def
        })
        .collect();

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        meta.table,
        columns.join(",\n")
    );
    for association in meta.associations {
        sql.push_str(&format!(
            "\nCREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column});",
            table = meta.table,
            column = association.column
        ));
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_query::{AssociationMeta, ColumnMeta, SqlType};

    static OWNER: EntityMeta = EntityMeta {
        name: "Owner",
        table: "owner",
        id_column: "id",
        columns: &[ColumnMeta {
            name: "id",
            ty: SqlType::Integer,
            nullable: false,
        }],
        associations: &[],
    };

    static PET: EntityMeta = EntityMeta {
        name: "Pet",
        table: "pet",
        id_column: "id",
        columns: &[
            ColumnMeta {
                name: "id",
                ty: SqlType::Integer,
                nullable: false,
            },
            ColumnMeta {
                name: "name",
                ty: SqlType::Text,
                nullable: false,
            },
            ColumnMeta {
                name: "owner_id",
                ty: SqlType::Integer,
                nullable: true,
            },
        ],
        associations: &[AssociationMeta {
            name: "owner",
            column: "owner_id",
            target: &OWNER,
            inverse: Some("pets"),
        }],
    };

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(&PET);
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS pet ("));
        assert!(sql.contains("    id INTEGER PRIMARY KEY NOT NULL"));
        assert!(sql.contains("    name TEXT NOT NULL"));
        assert!(sql.contains("    owner_id INTEGER REFERENCES owner(id)"));
        assert!(sql.contains("CREATE INDEX IF NOT EXISTS idx_pet_owner_id ON pet(owner_id);"));
    }

    #[test]
    fn test_migrations_apply_once() {
        let conn = Connection::open_in_memory().unwrap();
        apply_entity_migrations(&conn, &[&OWNER, &PET]).unwrap();
        apply_entity_migrations(&conn, &[&OWNER, &PET]).unwrap();

        assert_eq!(
            applied_migrations(&conn).unwrap(),
            vec!["create_owner".to_string(), "create_pet".to_string()]
        );

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('owner', 'pet')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }
}
