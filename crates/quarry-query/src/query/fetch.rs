//! Terminal operations: compile the plan, run it, and map rows.

use super::builder::Query;
use super::plan::{QueryPlan, SelectItem};
use super::validate::validate;
use crate::context::PersistenceContext;
use crate::error::{PersistenceError, QueryError, QueryResult};
use crate::projection::Projection;
use crate::render::{QueryRenderer, RenderedQuery};
use crate::row::{Row, RowLayout};
use crate::value::Value;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

/// One page of results plus the total row count ignoring offset and limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResults<T> {
    pub results: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl<T> QueryResults<T> {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<P: Projection> Query<P> {
    /// Validate and render without executing.
    pub fn render_with(&self, renderer: &dyn QueryRenderer) -> QueryResult<RenderedQuery> {
        validate(&self.plan)?;
        Ok(renderer.render(&self.plan)?)
    }

    /// All matching rows, in order.
    pub fn fetch<C: PersistenceContext>(&self, ctx: &C) -> QueryResult<Vec<P::Output>> {
        self.run(ctx, &self.plan)
    }

    /// The only matching row, `None` if there is none, or
    /// [`QueryError::TooManyResults`] if there are several.
    pub fn fetch_one<C: PersistenceContext>(&self, ctx: &C) -> QueryResult<Option<P::Output>> {
        let mut rows = self.run(ctx, &self.plan)?;
        match rows.len() {
            0 | 1 => Ok(rows.pop()),
            count => Err(QueryError::TooManyResults { count }),
        }
    }

    /// The first row after ordering, if any.
    pub fn fetch_first<C: PersistenceContext>(&self, ctx: &C) -> QueryResult<Option<P::Output>> {
        let mut plan = self.plan.clone();
        plan.limit = Some(plan.limit.map_or(1, |limit| limit.min(1)));
        Ok(self.run(ctx, &plan)?.into_iter().next())
    }

    /// Number of rows the query matches, ignoring offset and limit.
    pub fn fetch_count<C: PersistenceContext>(&self, ctx: &C) -> QueryResult<u64> {
        validate(&self.plan)?;
        let rendered = ctx.renderer().render_count(&self.plan)?;
        let rows = ctx.execute(&rendered)?;

        let count = match rows.first().and_then(|row| row.first()) {
            Some(Value::Integer(n)) => *n,
            other => {
                return Err(PersistenceError::backend(format!(
                    "count query returned {:?}",
                    other
                ))
                .into())
            }
        };
        u64::try_from(count)
            .map_err(|_| PersistenceError::backend(format!("negative row count {}", count)).into())
    }

    /// The requested page and the total count.
    pub fn fetch_results<C: PersistenceContext>(
        &self,
        ctx: &C,
    ) -> QueryResult<QueryResults<P::Output>> {
        let total = self.fetch_count(ctx)?;
        let results = if total == 0 { Vec::new() } else { self.fetch(ctx)? };
        Ok(QueryResults {
            results,
            total,
            offset: self.plan.offset.unwrap_or(0),
            limit: self.plan.limit,
        })
    }

    fn run<C: PersistenceContext>(&self, ctx: &C, plan: &QueryPlan) -> QueryResult<Vec<P::Output>> {
        validate(plan)?;
        let rendered = ctx.renderer().render(plan)?;
        trace!(sql = %rendered.sql, params = rendered.params.len(), "Rendered query");

        let raw = ctx.execute(&rendered)?;
        let layout = Arc::new(RowLayout::new(plan.output_items(), plan.select.len()));

        let mut out = Vec::with_capacity(raw.len());
        for values in raw {
            let row = Row::new(Arc::clone(&layout), values)?;
            for (item, values) in row.items() {
                // Outer-join misses come back with a NULL id
                if let SelectItem::Entity(source) = item {
                    if source.meta.id_of(values).is_some() {
                        ctx.attach(source.meta, values)?;
                    }
                }
            }
            out.push(self.projection.project(&row)?);
        }

        debug!(rows = out.len(), "Fetched rows");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{select, select_from};
    use crate::testing::{CannedContext, Group, Person, QGroup, QPerson, GROUP_META};

    fn person_row(id: i64, name: &str, age: i64, group: Option<i64>) -> Vec<Value> {
        vec![
            Value::Integer(id),
            Value::Text(name.to_string()),
            Value::Integer(age),
            group.map(Value::Integer).unwrap_or(Value::Null),
        ]
    }

    #[test]
    fn test_fetch_maps_entities() {
        let ctx = CannedContext::with_rows(vec![person_row(1, "member1", 10, Some(1))]);
        let person = QPerson::new("person");

        let people = select_from(&person).fetch(&ctx).unwrap();
        assert_eq!(
            people,
            vec![Person {
                id: Some(1),
                name: Some("member1".into()),
                age: 10,
                group_id: Some(1),
            }]
        );
        assert_eq!(ctx.attached.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_fetch_one_cardinality() {
        let person = QPerson::new("person");
        let query = select(person.name()).from(&person);

        let empty = CannedContext::default();
        assert_eq!(query.fetch_one(&empty).unwrap(), None);

        let single = CannedContext::with_rows(vec![vec![Value::Text("a".into())]]);
        assert_eq!(query.fetch_one(&single).unwrap(), Some("a".to_string()));

        let many = CannedContext::with_rows(vec![
            vec![Value::Text("a".into())],
            vec![Value::Text("b".into())],
        ]);
        assert!(matches!(
            query.fetch_one(&many),
            Err(QueryError::TooManyResults { count: 2 })
        ));
    }

    #[test]
    fn test_fetch_first_limits_to_one() {
        let ctx = CannedContext::with_rows(vec![vec![Value::Text("a".into())]]);
        let person = QPerson::new("person");

        let first = select(person.name()).from(&person).fetch_first(&ctx).unwrap();
        assert_eq!(first, Some("a".to_string()));
        assert!(ctx.executed_sql()[0].ends_with("LIMIT 1"));
    }

    #[test]
    fn test_fetch_first_keeps_zero_limit() {
        let ctx = CannedContext::default();
        let person = QPerson::new("person");

        let first = select(person.name())
            .from(&person)
            .limit(0)
            .fetch_first(&ctx)
            .unwrap();
        assert_eq!(first, None);
        assert!(ctx.executed_sql()[0].ends_with("LIMIT 0"));
    }

    #[test]
    fn test_invalid_query_never_executes() {
        let ctx = CannedContext::default();
        let person = QPerson::new("person");
        let query = select((person.name(), person.age().count())).from(&person);

        assert!(matches!(
            query.fetch(&ctx),
            Err(QueryError::InvalidQuery(_))
        ));
        assert!(ctx.executed_sql().is_empty());
    }

    #[test]
    fn test_fetch_results_reports_total_and_page() {
        let ctx = CannedContext::with_rows(vec![
            person_row(1, "member1", 10, None),
            person_row(2, "member2", 20, None),
        ]);
        let person = QPerson::new("person");

        let page = select_from(&person).offset(1).limit(2).fetch_results(&ctx).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.offset, 1);
        assert_eq!(page.limit, Some(2));
        assert_eq!(ctx.executed_sql().len(), 2);
    }

    #[test]
    fn test_fetch_join_attaches_hidden_entity() {
        let mut row = person_row(1, "member1", 10, Some(7));
        row.extend([Value::Integer(7), Value::Text("teamA".into())]);
        let ctx = CannedContext::with_rows(vec![row]);
        let person = QPerson::new("person");
        let group = QGroup::new("grp");

        let people = select_from(&person)
            .join(person.group(), &group)
            .fetch_join()
            .fetch(&ctx)
            .unwrap();

        assert_eq!(people.len(), 1);
        assert!(ctx.is_loaded(&GROUP_META, 7));
        assert!(ctx.is_association_loaded(&people[0], "group"));
    }

    #[test]
    fn test_tuple_with_outer_join_miss() {
        let mut row = person_row(1, "member1", 10, None);
        row.extend([Value::Null, Value::Null]);
        let ctx = CannedContext::with_rows(vec![row]);
        let person = QPerson::new("person");
        let group = QGroup::new("grp");

        let tuples = select((&person, &group))
            .from(&person)
            .left_join(person.group(), &group)
            .fetch(&ctx)
            .unwrap();

        let tuple = &tuples[0];
        assert_eq!(tuple.entity(&person).unwrap().map(|p| p.age), Some(10));
        assert_eq!(tuple.entity::<QGroup>(&group).unwrap(), None::<Group>);
    }

    #[test]
    fn test_wrong_row_width_is_persistence_error() {
        let ctx = CannedContext::with_rows(vec![vec![Value::Integer(1)]]);
        let person = QPerson::new("person");

        assert!(matches!(
            select_from(&person).fetch(&ctx),
            Err(QueryError::Persistence(_))
        ));
    }
}
