use quarry_query::{FieldBinding, FieldSlot, FromValue, QueryResult, Value};
use serde::Serialize;
use std::fmt;

/// Field-bound DTO whose `name` does not match any member column; bind it
/// with `member.username().alias("name")`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserDto {
    pub name: Option<String>,
    pub age: i32,
}

fn assign_name(dto: &mut UserDto, value: Value) -> QueryResult<()> {
    dto.name = Option::<String>::from_value(value)?;
    Ok(())
}

fn assign_age(dto: &mut UserDto, value: Value) -> QueryResult<()> {
    dto.age = i32::from_value(value)?;
    Ok(())
}

impl FieldBinding for UserDto {
    fn fields() -> &'static [FieldSlot<Self>] {
        const FIELDS: &[FieldSlot<UserDto>] = &[
            FieldSlot {
                name: "name",
                assign: assign_name,
            },
            FieldSlot {
                name: "age",
                assign: assign_age,
            },
        ];
        FIELDS
    }
}

impl fmt::Display for UserDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UserDto(name={}, age={})",
            self.name.as_deref().unwrap_or("null"),
            self.age
        )
    }
}
