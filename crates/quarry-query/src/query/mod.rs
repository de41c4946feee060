//! Query construction, validation and execution.

mod builder;
mod fetch;
mod plan;
pub mod validate;

pub use builder::{select, select_from, subquery, Query};
pub use fetch::QueryResults;
pub use plan::{Join, JoinKind, QueryPlan, SelectItem, Source};
