//! Member entity

use quarry_query::{
    decode_column, AssociationMeta, AssociationPath, ColumnMeta, Entity, EntityMeta, EntityPath,
    Expr, QueryResult, SqlType, Value,
};
use serde::Serialize;
use std::fmt;

use super::team::{Team, TEAM_META};

pub static MEMBER_META: EntityMeta = EntityMeta {
    name: "Member",
    table: "member",
    id_column: "member_id",
    columns: &[
        ColumnMeta {
            name: "member_id",
            ty: SqlType::Integer,
            nullable: false,
        },
        ColumnMeta {
            name: "username",
            ty: SqlType::Text,
            nullable: true,
        },
        ColumnMeta {
            name: "age",
            ty: SqlType::Integer,
            nullable: false,
        },
        ColumnMeta {
            name: "team_id",
            ty: SqlType::Integer,
            nullable: true,
        },
    ],
    associations: &[AssociationMeta {
        name: "team",
        column: "team_id",
        target: &TEAM_META,
        inverse: Some("members"),
    }],
};

/// A team member. `team_id` is the owning side of the Member/Team
/// association; move a member with `SqliteSession::relate` so the team's
/// member list follows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<i64>,
}

impl Member {
    pub fn new(username: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            username: Some(username.into()),
            age,
            team_id: None,
        }
    }

    /// A member with no name yet
    pub fn anonymous(age: i32) -> Self {
        Self {
            id: None,
            username: None,
            age,
            team_id: None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

impl Entity for Member {
    fn meta() -> &'static EntityMeta {
        &MEMBER_META
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
            self.username.clone().into(),
            self.age.into(),
            self.team_id.into(),
        ]
    }

    fn from_values(values: &[Value]) -> QueryResult<Self> {
        Ok(Self {
            id: decode_column(&MEMBER_META, values, 0)?,
            username: decode_column(&MEMBER_META, values, 1)?,
            age: decode_column(&MEMBER_META, values, 2)?,
            team_id: decode_column(&MEMBER_META, values, 3)?,
        })
    }

    fn association_id(&self, association: &str) -> Option<i64> {
        match association {
            "team" => self.team_id,
            _ => None,
        }
    }

    fn set_association_id(&mut self, association: &str, target: Option<i64>) -> bool {
        match association {
            "team" => {
                self.team_id = target;
                true
            }
            _ => false,
        }
    }
}

// Team is left out, as in the association's lazy side
impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Member(id={}, username={}, age={})",
            self.id.map_or_else(|| "null".to_string(), |id| id.to_string()),
            self.username().unwrap_or("null"),
            self.age
        )
    }
}

/// Query path for [`Member`].
#[derive(Debug, Clone)]
pub struct QMember {
    alias: String,
}

impl QMember {
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
        }
    }

    /// The default `member` alias
    pub fn member() -> Self {
        Self::new("member")
    }

    pub fn id(&self) -> Expr<i64> {
        self.id_path()
    }

    pub fn username(&self) -> Expr<String> {
        self.column("username")
    }

    pub fn age(&self) -> Expr<i32> {
        self.column("age")
    }

    pub fn team(&self) -> AssociationPath<Team> {
        AssociationPath::new(&self.alias, &MEMBER_META.associations[0])
    }
}

impl EntityPath for QMember {
    type Entity = Member;

    fn alias(&self) -> &str {
        &self.alias
    }
}
