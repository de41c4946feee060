//! Member/Team entities and their query paths.

mod member;
mod team;

pub use member::{Member, QMember, MEMBER_META};
pub use team::{QTeam, Team, TEAM_META};

use quarry_query::EntityMeta;

/// Every entity table, parents first.
pub static ENTITIES: &[&EntityMeta] = &[&TEAM_META, &MEMBER_META];
