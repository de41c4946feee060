//! Member/Team study model for Quarry.
//!
//! Two entities with a bidirectional association, the DTOs they are
//! projected into, and fixtures that seed the classic two-team dataset.
//!
//! ```rust,ignore
//! use quarry_query::select_from;
//! use quarry_study::fixtures::seeded_session;
//! use quarry_study::model::QMember;
//!
//! let (session, _) = seeded_session()?;
//! let member = QMember::member();
//! let found = select_from(&member)
//!     .filter(member.username().eq("member1").and(member.age().eq(10)))
//!     .fetch_one(&session)?;
//! ```

pub mod dto;
pub mod fixtures;
pub mod model;

pub use dto::{MemberDto, UserDto};
pub use model::{Member, QMember, QTeam, Team};
