use quarry_query::{
    BeanBinding, ConstructorBinding, FieldBinding, FieldSlot, FromValue, QueryResult, Setter, Value,
};
use serde::Serialize;
use std::fmt;

/// Username and age of a member, bindable by constructor, setters or
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemberDto {
    pub username: Option<String>,
    pub age: i32,
}

impl MemberDto {
    pub fn new(username: impl Into<String>, age: i32) -> Self {
        Self {
            username: Some(username.into()),
            age,
        }
    }

    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    pub fn set_age(&mut self, age: i32) {
        self.age = age;
    }
}

fn assign_username(dto: &mut MemberDto, value: Value) -> QueryResult<()> {
    dto.set_username(Option::<String>::from_value(value)?);
    Ok(())
}

fn assign_age(dto: &mut MemberDto, value: Value) -> QueryResult<()> {
    dto.set_age(i32::from_value(value)?);
    Ok(())
}

impl BeanBinding for MemberDto {
    fn setters() -> &'static [Setter<Self>] {
        const SETTERS: &[Setter<MemberDto>] = &[
            Setter {
                name: "setUsername",
                set: assign_username,
            },
            Setter {
                name: "setAge",
                set: assign_age,
            },
        ];
        SETTERS
    }
}

impl FieldBinding for MemberDto {
    fn fields() -> &'static [FieldSlot<Self>] {
        const FIELDS: &[FieldSlot<MemberDto>] = &[
            FieldSlot {
                name: "username",
                assign: assign_username,
            },
            FieldSlot {
                name: "age",
                assign: assign_age,
            },
        ];
        FIELDS
    }
}

impl ConstructorBinding<(String, i32)> for MemberDto {
    fn construct((username, age): (String, i32)) -> Self {
        Self::new(username, age)
    }
}

impl ConstructorBinding<(Option<String>, i32)> for MemberDto {
    fn construct((username, age): (Option<String>, i32)) -> Self {
        Self { username, age }
    }
}

impl fmt::Display for MemberDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MemberDto(username={}, age={})",
            self.username.as_deref().unwrap_or("null"),
            self.age
        )
    }
}
