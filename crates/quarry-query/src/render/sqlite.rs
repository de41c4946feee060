//! SQLite query renderer.
//!
//! Renders a [`QueryPlan`] to SQLite SQL with:
//! - entity select items expanded to every entity column
//! - FROM sources and JOINs in registration order
//! - every literal bound as a named parameter (`:p1`, `:p2`, ...) in the
//!   order it appears in the text
//!
//! Top-level row queries get implicit trailing sort keys so results are
//! deterministic: the ids of every source for plain queries and the group
//! keys for grouped ones. DISTINCT, ungrouped aggregate queries and
//! subqueries are left as written.

use crate::error::RenderError;
use crate::expr::{
    AggregateFn, CaseCondition, Direction, ExprNode, InList, NullHandling, OrderSpecifier,
    Predicate,
};
use crate::query::{JoinKind, QueryPlan, SelectItem, Source};
use crate::render::{QueryRenderer, RenderedQuery};
use crate::value::Value;

/// Stateless SQLite renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteRenderer;

/// Parameters collected while rendering one statement.
#[derive(Default)]
struct Params {
    list: Vec<(String, Value)>,
}

impl Params {
    fn bind(&mut self, value: Value) -> String {
        let name = format!("p{}", self.list.len() + 1);
        let placeholder = format!(":{}", name);
        self.list.push((name, value));
        placeholder
    }
}

impl SqliteRenderer {
    pub fn new() -> Self {
        Self
    }

    fn render_select(
        &self,
        plan: &QueryPlan,
        params: &mut Params,
        top_level: bool,
    ) -> Result<String, RenderError> {
        if plan.sources.is_empty() {
            return Err(RenderError::MissingSource);
        }
        let items = plan.output_items();
        if items.is_empty() {
            return Err(RenderError::EmptyProjection);
        }

        let select_fields = items
            .iter()
            .map(|item| self.render_select_item(item, params))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");

        let mut sql = if plan.distinct {
            format!("SELECT DISTINCT {}", select_fields)
        } else {
            format!("SELECT {}", select_fields)
        };

        sql.push_str(&format!("\nFROM {}", self.build_from_clause(&plan.sources)));

        for join in &plan.joins {
            sql.push_str(&self.render_join(join, params)?);
        }

        if let Some(filter) = &plan.filter {
            sql.push_str(&format!("\nWHERE {}", self.render_condition(filter, params)?));
        }

        if !plan.group_by.is_empty() {
            let keys = plan
                .group_by
                .iter()
                .map(|k| self.render_expr(k, params))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(&format!("\nGROUP BY {}", keys.join(", ")));
        }

        if let Some(having) = &plan.having {
            sql.push_str(&format!("\nHAVING {}", self.render_condition(having, params)?));
        }

        let mut order = plan.order_by.clone();
        if top_level {
            order.extend(self.implicit_order(plan));
        }
        if !order.is_empty() {
            let keys = order
                .iter()
                .map(|o| self.render_order(o, params))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(&format!("\nORDER BY {}", keys.join(", ")));
        }

        match (plan.limit, plan.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!("\nLIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!("\nLIMIT {}", limit)),
            // SQLite needs a LIMIT clause before OFFSET
            (None, Some(offset)) => sql.push_str(&format!("\nLIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        Ok(sql)
    }

    /// Trailing sort keys not already requested.
    fn implicit_order(&self, plan: &QueryPlan) -> Vec<OrderSpecifier> {
        if plan.distinct {
            return Vec::new();
        }
        let keys: Vec<ExprNode> = if !plan.group_by.is_empty() {
            plan.group_by.clone()
        } else if plan.is_aggregate() {
            Vec::new()
        } else {
            plan.sources
                .iter()
                .chain(plan.joins.iter().map(|j| &j.target))
                .map(id_column)
                .collect()
        };
        keys.into_iter()
            .filter(|k| !plan.order_by.iter().any(|o| o.expr == *k))
            .map(|k| OrderSpecifier::new(k, Direction::Asc))
            .collect()
    }

    fn render_order(
        &self,
        order: &OrderSpecifier,
        params: &mut Params,
    ) -> Result<String, RenderError> {
        let mut key = self.render_expr(&order.expr, params)?;
        key.push_str(match order.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
        key.push_str(match order.nulls {
            NullHandling::Default => "",
            NullHandling::NullsFirst => " NULLS FIRST",
            NullHandling::NullsLast => " NULLS LAST",
        });
        Ok(key)
    }

    fn render_select_item(
        &self,
        item: &SelectItem,
        params: &mut Params,
    ) -> Result<String, RenderError> {
        match item {
            SelectItem::Expr(ExprNode::Alias { expr, name }) => {
                Ok(format!("{} AS \"{}\"", self.render_expr(expr, params)?, name))
            }
            SelectItem::Expr(expr) => self.render_expr(expr, params),
            SelectItem::Entity(source) => Ok(source
                .meta
                .columns
                .iter()
                .map(|c| format!("{}.{}", source.alias, c.name))
                .collect::<Vec<_>>()
                .join(", ")),
        }
    }

    fn build_from_clause(&self, sources: &[Source]) -> String {
        sources
            .iter()
            .map(|s| format!("{} {}", s.meta.table, s.alias))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_join(
        &self,
        join: &crate::query::Join,
        params: &mut Params,
    ) -> Result<String, RenderError> {
        let keyword = match join.kind {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
        };
        let target = &join.target;

        let mut conditions = Vec::new();
        if let Some((owner, association)) = &join.association {
            conditions.push(format!(
                "{}.{} = {}.{}",
                owner, association.column, target.alias, target.meta.id_column
            ));
        }
        if let Some(on) = &join.on {
            conditions.push(self.render_predicate(on, params)?);
        }
        if conditions.is_empty() {
            return Err(RenderError::UnsupportedExpression {
                message: format!("join to '{}' has no condition", target.alias),
            });
        }

        Ok(format!(
            "\n{} {} {} ON {}",
            keyword,
            target.meta.table,
            target.alias,
            conditions.join(" AND ")
        ))
    }

    /// WHERE/HAVING body; a top-level conjunction goes one term per line.
    fn render_condition(
        &self,
        predicate: &Predicate,
        params: &mut Params,
    ) -> Result<String, RenderError> {
        match predicate {
            Predicate::And(parts) if !parts.is_empty() => Ok(parts
                .iter()
                .map(|p| self.render_predicate(p, params))
                .collect::<Result<Vec<_>, _>>()?
                .join("\n  AND ")),
            other => self.render_predicate(other, params),
        }
    }

    fn render_predicate(
        &self,
        predicate: &Predicate,
        params: &mut Params,
    ) -> Result<String, RenderError> {
        match predicate {
            Predicate::Compare { op, lhs, rhs } => Ok(format!(
                "{} {} {}",
                self.render_expr(lhs, params)?,
                op.symbol(),
                self.render_expr(rhs, params)?
            )),
            Predicate::Between { expr, low, high } => Ok(format!(
                "{} BETWEEN {} AND {}",
                self.render_expr(expr, params)?,
                self.render_expr(low, params)?,
                self.render_expr(high, params)?
            )),
            Predicate::In {
                expr,
                list,
                negated,
            } => {
                let keyword = if *negated { "NOT IN" } else { "IN" };
                match list {
                    InList::Values(values) if values.is_empty() => {
                        Ok(if *negated { "1 = 1" } else { "1 = 0" }.to_string())
                    }
                    InList::Values(values) => {
                        let lhs = self.render_expr(expr, params)?;
                        let values = values
                            .iter()
                            .map(|v| self.render_expr(v, params))
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(format!("{} {} ({})", lhs, keyword, values.join(", ")))
                    }
                    InList::Subquery(plan) => {
                        let lhs = self.render_expr(expr, params)?;
                        let sub = self.render_select(plan, params, false)?;
                        Ok(format!("{} {} ({})", lhs, keyword, sub))
                    }
                }
            }
            Predicate::IsNull { expr, negated } => Ok(format!(
                "{} {}",
                self.render_expr(expr, params)?,
                if *negated { "IS NOT NULL" } else { "IS NULL" }
            )),
            Predicate::Like { expr, pattern } => Ok(format!(
                "{} LIKE {} ESCAPE '\\'",
                self.render_expr(expr, params)?,
                self.render_expr(pattern, params)?
            )),
            Predicate::And(parts) => self.render_connective(parts, " AND ", "1 = 1", params),
            Predicate::Or(parts) => self.render_connective(parts, " OR ", "1 = 0", params),
            Predicate::Not(inner) => Ok(format!("NOT ({})", self.render_predicate(inner, params)?)),
        }
    }

    fn render_connective(
        &self,
        parts: &[Predicate],
        separator: &str,
        empty: &str,
        params: &mut Params,
    ) -> Result<String, RenderError> {
        match parts {
            [] => Ok(empty.to_string()),
            [single] => self.render_predicate(single, params),
            many => {
                let rendered = many
                    .iter()
                    .map(|p| self.render_predicate(p, params))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", rendered.join(separator)))
            }
        }
    }

    fn render_expr(&self, expr: &ExprNode, params: &mut Params) -> Result<String, RenderError> {
        match expr {
            ExprNode::Column(col) => Ok(format!("{}.{}", col.alias, col.column)),
            ExprNode::Literal(value) => Ok(params.bind(value.clone())),
            ExprNode::Aggregate {
                func,
                arg,
                distinct,
            } => match arg {
                None if *func == AggregateFn::Count => Ok("COUNT(*)".to_string()),
                None => Err(RenderError::UnsupportedExpression {
                    message: format!("{} without an argument", func.keyword()),
                }),
                Some(arg) => {
                    let arg = self.render_expr(arg, params)?;
                    if *distinct {
                        Ok(format!("{}(DISTINCT {})", func.keyword(), arg))
                    } else {
                        Ok(format!("{}({})", func.keyword(), arg))
                    }
                }
            },
            ExprNode::Case(case) => {
                let mut sql = String::from("CASE");
                if let Some(subject) = &case.subject {
                    sql.push(' ');
                    sql.push_str(&self.render_expr(subject, params)?);
                }
                for (condition, result) in &case.branches {
                    let when = match condition {
                        CaseCondition::Equals(value) => self.render_expr(value, params)?,
                        CaseCondition::Matches(predicate) => {
                            self.render_predicate(predicate, params)?
                        }
                    };
                    let then = self.render_expr(result, params)?;
                    sql.push_str(&format!(" WHEN {} THEN {}", when, then));
                }
                sql.push_str(&format!(
                    " ELSE {} END",
                    self.render_expr(&case.otherwise, params)?
                ));
                Ok(sql)
            }
            ExprNode::Concat(parts) => {
                let parts = parts
                    .iter()
                    .map(|p| self.render_expr(p, params))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(" || ")))
            }
            ExprNode::Cast { expr, ty } => Ok(format!(
                "CAST({} AS {})",
                self.render_expr(expr, params)?,
                ty.sql_name()
            )),
            // Aliases only matter in the select list
            ExprNode::Alias { expr, .. } => self.render_expr(expr, params),
            ExprNode::Subquery(plan) => {
                Ok(format!("({})", self.render_select(plan, params, false)?))
            }
            ExprNode::Predicate(predicate) => {
                Ok(format!("({})", self.render_predicate(predicate, params)?))
            }
        }
    }
}

fn id_column(source: &Source) -> ExprNode {
    ExprNode::Column(crate::expr::ColumnRef::new(
        source.alias.clone(),
        source.meta.id_column,
        crate::value::SqlType::Integer,
    ))
}

impl QueryRenderer for SqliteRenderer {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn render(&self, plan: &QueryPlan) -> Result<RenderedQuery, RenderError> {
        let mut params = Params::default();
        let sql = self.render_select(plan, &mut params, true)?;
        Ok(RenderedQuery {
            sql,
            params: params.list,
        })
    }

    fn render_count(&self, plan: &QueryPlan) -> Result<RenderedQuery, RenderError> {
        let mut inner = plan.clone();
        inner.order_by.clear();
        inner.offset = None;
        inner.limit = None;

        let mut params = Params::default();
        let body = self.render_select(&inner, &mut params, false)?;
        Ok(RenderedQuery {
            sql: format!("SELECT COUNT(*)\nFROM ({}) counted", body),
            params: params.list,
        })
    }
}
