//! Target renderers for query plans.
//!
//! Renderers turn a validated [`QueryPlan`] into backend query text plus
//! bound parameters.

mod sqlite;

pub use sqlite::SqliteRenderer;

use crate::error::RenderError;
use crate::query::QueryPlan;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Output from rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedQuery {
    /// The generated query string
    pub sql: String,
    /// Named parameters in binding order
    pub params: Vec<(String, Value)>,
}

impl RenderedQuery {
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// Trait for rendering a plan to a target query language.
pub trait QueryRenderer: Send + Sync {
    /// Unique name for this renderer
    fn name(&self) -> &str;

    /// Render the plan as a row query
    fn render(&self, plan: &QueryPlan) -> Result<RenderedQuery, RenderError>;

    /// Render a query counting the plan's rows, ignoring order, offset and
    /// limit
    fn render_count(&self, plan: &QueryPlan) -> Result<RenderedQuery, RenderError>;
}
