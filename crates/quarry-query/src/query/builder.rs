//! Fluent query builder.
//!
//! Every clause method consumes the builder and returns it, so one chain
//! owns one plan. Clone a [`Query`] to branch from a shared prefix.

use super::plan::{Join, JoinKind, QueryPlan, SelectItem, Source};
use crate::entity::{AssociationPath, EntityPath};
use crate::expr::{Expr, ExprNode, OrderSpecifier, Operand, Predicate};
use crate::projection::Projection;

/// A query under construction, typed by what each result row becomes.
#[derive(Debug, Clone)]
pub struct Query<P> {
    pub(crate) projection: P,
    pub(crate) plan: QueryPlan,
}

/// Start a query projecting `projection`.
pub fn select<P: Projection>(projection: P) -> Query<P> {
    let plan = QueryPlan {
        select: projection.select_items(),
        ..QueryPlan::default()
    };
    Query { projection, plan }
}

/// `select(path).from(path)`
pub fn select_from<E: EntityPath>(path: &E) -> Query<&E> {
    select(path).from(path)
}

/// Start a subquery selecting one expression, for use inside predicates
/// and select lists of an enclosing query.
pub fn subquery<T>(expr: Expr<T>) -> Query<Expr<T>> {
    let plan = QueryPlan {
        select: vec![SelectItem::Expr(expr.node().clone())],
        ..QueryPlan::default()
    };
    Query {
        projection: expr,
        plan,
    }
}

impl<P> Query<P> {
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    pub fn into_plan(self) -> QueryPlan {
        self.plan
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    /// Add a FROM source. Several sources form a cross product, narrowed by
    /// the filter (theta join).
    pub fn from<E: EntityPath>(mut self, path: &E) -> Self {
        self.plan.sources.push(Source::of(path));
        self
    }

    /// Inner join along a many-to-one association.
    pub fn join<E: EntityPath>(self, association: AssociationPath<E::Entity>, target: &E) -> Self {
        self.push_join(JoinKind::Inner, Some(association), target)
    }

    /// Left outer join along a many-to-one association.
    pub fn left_join<E: EntityPath>(
        self,
        association: AssociationPath<E::Entity>,
        target: &E,
    ) -> Self {
        self.push_join(JoinKind::Left, Some(association), target)
    }

    /// Inner join to an entity with no association; needs `on`.
    pub fn join_entity<E: EntityPath>(self, target: &E) -> Self {
        self.push_join(JoinKind::Inner, None, target)
    }

    /// Left outer join to an entity with no association; needs `on`.
    pub fn left_join_entity<E: EntityPath>(self, target: &E) -> Self {
        self.push_join(JoinKind::Left, None, target)
    }

    fn push_join<E: EntityPath>(
        mut self,
        kind: JoinKind,
        association: Option<AssociationPath<E::Entity>>,
        target: &E,
    ) -> Self {
        self.plan.joins.push(Join {
            kind,
            target: Source::of(target),
            association: association.map(|a| (a.owner().to_string(), a.meta())),
            on: None,
            fetch: false,
        });
        self
    }

    /// Extra condition on the most recent join, applied while joining.
    pub fn on(mut self, condition: impl Into<Predicate>) -> Self {
        let condition = condition.into();
        match self.plan.joins.last_mut() {
            Some(join) => {
                join.on = Some(match join.on.take() {
                    Some(existing) => existing.and(condition),
                    None => condition,
                });
            }
            None => self
                .plan
                .problems
                .push("on() called before any join".to_string()),
        }
        self
    }

    /// Also load the most recent join's entity into the persistence context.
    pub fn fetch_join(mut self) -> Self {
        match self.plan.joins.last_mut() {
            Some(join) => join.fetch = true,
            None => self
                .plan
                .problems
                .push("fetch_join() called before any join".to_string()),
        }
        self
    }

    /// Add a WHERE condition, AND-ed with any earlier ones.
    pub fn filter(mut self, condition: impl Into<Predicate>) -> Self {
        let condition = condition.into();
        self.plan.filter = Some(match self.plan.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// AND every condition into the filter. An empty input changes nothing.
    pub fn filter_all(self, conditions: impl IntoIterator<Item = Predicate>) -> Self {
        match Predicate::all(conditions) {
            Some(condition) => self.filter(condition),
            None => self,
        }
    }

    pub fn group_by(mut self, key: impl Into<ExprNode>) -> Self {
        let key: ExprNode = key.into();
        self.plan.group_by.push(key.unaliased().clone());
        self
    }

    /// Condition on groups, AND-ed with any earlier ones.
    pub fn having(mut self, condition: impl Into<Predicate>) -> Self {
        let condition = condition.into();
        self.plan.having = Some(match self.plan.having.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn order_by(mut self, key: OrderSpecifier) -> Self {
        self.plan.order_by.push(key);
        self
    }

    /// Skip the first `offset` rows of the ordered result.
    pub fn offset(mut self, offset: u64) -> Self {
        self.plan.offset = Some(offset);
        self
    }

    /// Return at most `limit` rows.
    pub fn limit(mut self, limit: u64) -> Self {
        self.plan.limit = Some(limit);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.plan.distinct = true;
        self
    }
}

impl<T> Query<Expr<T>> {
    /// Use this single-column query as a scalar expression.
    pub fn into_expr(self) -> Expr<T> {
        Expr::from_node(ExprNode::Subquery(Box::new(self.plan)))
    }
}

impl<T> Operand<T> for Query<Expr<T>> {
    fn into_operand(self) -> ExprNode {
        ExprNode::Subquery(Box::new(self.plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn age() -> Expr<i32> {
        Expr::column("member", "age")
    }

    #[test]
    fn test_filters_accumulate_as_conjunction() {
        let query = subquery(age()).filter(age().gt(10)).filter(age().lt(40));
        assert_eq!(
            query.plan().filter,
            Some(Predicate::And(vec![age().gt(10), age().lt(40)]))
        );
    }

    #[test]
    fn test_filter_all_of_nothing_is_noop() {
        let query = subquery(age()).filter_all(Vec::new());
        assert!(query.plan().filter.is_none());
    }

    #[test]
    fn test_clone_branches_independently() {
        let base = subquery(age()).filter(age().gt(10));
        let limited = base.clone().limit(1);

        assert_eq!(base.plan().limit, None);
        assert_eq!(limited.plan().limit, Some(1));
        assert_eq!(base.plan().filter, limited.plan().filter);
    }

    #[test]
    fn test_on_without_join_is_recorded() {
        let query = subquery(age()).on(age().eq(1));
        assert_eq!(query.plan().problems.len(), 1);
    }

    #[test]
    fn test_group_by_strips_alias() {
        let query = subquery(age()).group_by(age().alias("years"));
        assert_eq!(query.plan().group_by, vec![age().into_node()]);
    }

    #[test]
    fn test_subquery_operand_is_scalar() {
        let node = subquery(age().max()).into_operand();
        assert!(matches!(node, ExprNode::Subquery(_)));
        assert_eq!(node.sql_type(), Some(crate::value::SqlType::Integer));
    }
}
