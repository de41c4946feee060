//! Integration tests for the SQLite session
//!
//! Runs typed queries through a file-backed session configured from TOML.

use quarry_query::{
    decode_column, select_from, ColumnMeta, Entity, EntityMeta, EntityPath, EntityStore, Expr,
    PersistenceContext, QueryResult, SqlType, Value,
};
use quarry_sqlite::schema::applied_migrations;
use quarry_sqlite::{SqliteConfig, SqliteSession};
use tempfile::TempDir;

static NOTE_META: EntityMeta = EntityMeta {
    name: "Note",
    table: "note",
    id_column: "id",
    columns: &[
        ColumnMeta {
            name: "id",
            ty: SqlType::Integer,
            nullable: false,
        },
        ColumnMeta {
            name: "title",
            ty: SqlType::Text,
            nullable: false,
        },
        ColumnMeta {
            name: "pinned",
            ty: SqlType::Boolean,
            nullable: false,
        },
    ],
    associations: &[],
};

#[derive(Debug, Clone, PartialEq)]
struct Note {
    id: Option<i64>,
    title: String,
    pinned: bool,
}

impl Note {
    fn new(title: &str, pinned: bool) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            pinned,
        }
    }
}

impl Entity for Note {
    fn meta() -> &'static EntityMeta {
        &NOTE_META
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn to_values(&self) -> Vec<Value> {
        vec![self.id.into(), self.title.clone().into(), self.pinned.into()]
    }

    fn from_values(values: &[Value]) -> QueryResult<Self> {
        Ok(Self {
            id: decode_column(&NOTE_META, values, 0)?,
            title: decode_column(&NOTE_META, values, 1)?,
            pinned: decode_column(&NOTE_META, values, 2)?,
        })
    }
}

struct QNote {
    alias: String,
}

impl QNote {
    fn note() -> Self {
        Self {
            alias: "note".to_string(),
        }
    }

    fn title(&self) -> Expr<String> {
        self.column("title")
    }

    fn pinned(&self) -> Expr<bool> {
        self.column("pinned")
    }
}

impl EntityPath for QNote {
    type Entity = Note;

    fn alias(&self) -> &str {
        &self.alias
    }
}

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let db_path = dir.path().join("notes.db");
    let config_path = dir.path().join("quarry.toml");
    std::fs::write(
        &config_path,
        format!("path = {:?}\nshow_sql = true\n", db_path.to_string_lossy()),
    )
    .unwrap();
    config_path
}

#[test]
fn test_rows_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = SqliteConfig::load(write_config(&dir)).unwrap();
    assert!(config.show_sql);

    {
        let session = SqliteSession::open(config.clone(), &[&NOTE_META]).unwrap();
        session.begin_unit_of_work().unwrap();
        session.insert(&mut Note::new("first", false)).unwrap();
        session.insert(&mut Note::new("second", true)).unwrap();
        session.commit().unwrap();
    }

    let session = SqliteSession::open(config, &[&NOTE_META]).unwrap();
    let note = QNote::note();
    let pinned = select_from(&note)
        .filter(note.pinned().eq(true))
        .fetch(&session)
        .unwrap();

    assert_eq!(
        pinned,
        vec![Note {
            id: Some(2),
            title: "second".to_string(),
            pinned: true,
        }]
    );

    let mut third = Note::new("third", false);
    assert_eq!(session.insert(&mut third).unwrap(), 3);

    let migrations = session
        .pool()
        .with_connection(applied_migrations)
        .unwrap();
    assert_eq!(migrations, vec!["create_note".to_string()]);
}

#[test]
fn test_like_patterns_are_literal() {
    let session = SqliteSession::open(SqliteConfig::memory(), &[&NOTE_META]).unwrap();
    for title in ["50% off", "50 percent", "Sale"] {
        session.insert(&mut Note::new(title, false)).unwrap();
    }
    let note = QNote::note();

    let titles: Vec<String> = select_from(&note)
        .filter(note.title().contains("%"))
        .fetch(&session)
        .unwrap()
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(titles, vec!["50% off".to_string()]);

    let case_sensitive = select_from(&note)
        .filter(note.title().starts_with("sale"))
        .fetch_count(&session)
        .unwrap();
    assert_eq!(case_sensitive, 0);
}

#[test]
fn test_rollback_forgets_entities() {
    let session = SqliteSession::open(SqliteConfig::memory(), &[&NOTE_META]).unwrap();
    session.begin_unit_of_work().unwrap();
    let mut note = Note::new("draft", false);
    session.insert(&mut note).unwrap();
    assert!(session.is_loaded(&NOTE_META, 1));

    session.rollback().unwrap();

    assert!(!session.is_loaded(&NOTE_META, 1));
    assert_eq!(session.find::<Note>(1).unwrap(), None);
}
