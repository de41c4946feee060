//! Small entity model and canned persistence context for unit tests.

use crate::context::PersistenceContext;
use crate::entity::{
    decode_column, AssociationMeta, AssociationPath, ColumnMeta, Entity, EntityMeta, EntityPath,
};
use crate::error::{PersistenceError, QueryResult};
use crate::expr::Expr;
use crate::render::{QueryRenderer, RenderedQuery, SqliteRenderer};
use crate::value::{SqlType, Value};
use std::sync::Mutex;

pub static GROUP_META: EntityMeta = EntityMeta {
    name: "Group",
    table: "grp",
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
    ],
    associations: &[],
};

pub static PERSON_META: EntityMeta = EntityMeta {
    name: "Person",
    table: "person",
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
            nullable: true,
        },
        ColumnMeta {
            name: "age",
            ty: SqlType::Integer,
            nullable: false,
        },
        ColumnMeta {
            name: "group_id",
            ty: SqlType::Integer,
            nullable: true,
        },
    ],
    associations: &[AssociationMeta {
        name: "group",
        column: "group_id",
        target: &GROUP_META,
        inverse: Some("people"),
    }],
};

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: Option<i64>,
    pub name: String,
}

impl Entity for Group {
    fn meta() -> &'static EntityMeta {
        &GROUP_META
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn to_values(&self) -> Vec<Value> {
        vec![self.id.into(), self.name.clone().into()]
    }

    fn from_values(values: &[Value]) -> QueryResult<Self> {
        Ok(Self {
            id: decode_column(&GROUP_META, values, 0)?,
            name: decode_column(&GROUP_META, values, 1)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub age: i32,
    pub group_id: Option<i64>,
}

impl Entity for Person {
    fn meta() -> &'static EntityMeta {
        &PERSON_META
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.age.into(),
            self.group_id.into(),
        ]
    }

    fn from_values(values: &[Value]) -> QueryResult<Self> {
        Ok(Self {
            id: decode_column(&PERSON_META, values, 0)?,
            name: decode_column(&PERSON_META, values, 1)?,
            age: decode_column(&PERSON_META, values, 2)?,
            group_id: decode_column(&PERSON_META, values, 3)?,
        })
    }

    fn association_id(&self, association: &str) -> Option<i64> {
        match association {
            "group" => self.group_id,
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QGroup {
    alias: String,
}

impl QGroup {
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
        }
    }

    pub fn name(&self) -> Expr<String> {
        self.column("name")
    }
}

impl EntityPath for QGroup {
    type Entity = Group;

    fn alias(&self) -> &str {
        &self.alias
    }
}

#[derive(Debug, Clone)]
pub struct QPerson {
    alias: String,
}

impl QPerson {
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
        }
    }

    pub fn id(&self) -> Expr<i64> {
        self.column("id")
    }

    pub fn name(&self) -> Expr<String> {
        self.column("name")
    }

    pub fn age(&self) -> Expr<i32> {
        self.column("age")
    }

    pub fn group(&self) -> AssociationPath<Group> {
        AssociationPath::new(&self.alias, &PERSON_META.associations[0])
    }
}

impl EntityPath for QPerson {
    type Entity = Person;

    fn alias(&self) -> &str {
        &self.alias
    }
}

/// Returns canned rows and records what it was asked to run.
#[derive(Default)]
pub struct CannedContext {
    renderer: SqliteRenderer,
    pub rows: Vec<Vec<Value>>,
    pub executed: Mutex<Vec<RenderedQuery>>,
    pub attached: Mutex<Vec<(&'static str, Vec<Value>)>>,
}

impl CannedContext {
    pub fn with_rows(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|q| q.sql.clone())
            .collect()
    }
}

impl PersistenceContext for CannedContext {
    fn renderer(&self) -> &dyn QueryRenderer {
        &self.renderer
    }

    fn execute(&self, query: &RenderedQuery) -> Result<Vec<Vec<Value>>, PersistenceError> {
        self.executed.lock().unwrap().push(query.clone());
        if query.sql.starts_with("SELECT COUNT(*)") {
            return Ok(vec![vec![Value::Integer(self.rows.len() as i64)]]);
        }
        Ok(self.rows.clone())
    }

    fn attach(&self, meta: &'static EntityMeta, values: &[Value]) -> Result<(), PersistenceError> {
        self.attached.lock().unwrap().push((meta.name, values.to_vec()));
        Ok(())
    }

    fn is_loaded(&self, meta: &'static EntityMeta, id: i64) -> bool {
        self.attached
            .lock()
            .unwrap()
            .iter()
            .any(|(name, values)| *name == meta.name && meta.id_of(values) == Some(id))
    }

    fn begin_unit_of_work(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn commit(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn rollback(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}
