//! Team entity

use quarry_query::{
    decode_column, ColumnMeta, Entity, EntityMeta, EntityPath, Expr, QueryResult, SqlType, Value,
};
use quarry_sqlite::SqliteSession;
use serde::Serialize;
use std::fmt;

use super::Member;

pub static TEAM_META: EntityMeta = EntityMeta {
    name: "Team",
    table: "team",
    id_column: "team_id",
    columns: &[
        ColumnMeta {
            name: "team_id",
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

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    pub id: Option<i64>,
    pub name: String,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// Ids of the session's managed members on this team, in the order they
    /// joined.
    pub fn member_ids(&self, session: &SqliteSession) -> Vec<i64> {
        match self.id {
            Some(id) => session.children_of::<Member>("team", id),
            None => Vec::new(),
        }
    }
}

impl Entity for Team {
    fn meta() -> &'static EntityMeta {
        &TEAM_META
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
            id: decode_column(&TEAM_META, values, 0)?,
            name: decode_column(&TEAM_META, values, 1)?,
        })
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Team(id={}, name={})", id, self.name),
            None => write!(f, "Team(id=null, name={})", self.name),
        }
    }
}

/// Query path for [`Team`].
#[derive(Debug, Clone)]
pub struct QTeam {
    alias: String,
}

impl QTeam {
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
        }
    }

    /// The default `team` alias
    pub fn team() -> Self {
        Self::new("team")
    }

    pub fn id(&self) -> Expr<i64> {
        self.id_path()
    }

    pub fn name(&self) -> Expr<String> {
        self.column("name")
    }
}

impl EntityPath for QTeam {
    type Entity = Team;

    fn alias(&self) -> &str {
        &self.alias
    }
}
