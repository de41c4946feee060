//! Plan validation.
//!
//! Runs before rendering, so an inconsistent plan fails with
//! [`QueryError::InvalidQuery`] or [`QueryError::TypeMismatch`] and never
//! reaches the backend.

use super::plan::{JoinKind, QueryPlan, SelectItem, Source};
use crate::error::{QueryError, QueryResult};
use crate::expr::{AggregateFn, CaseCondition, ExprNode, InList, Predicate};
use crate::value::SqlType;

/// Check a top-level plan.
pub fn validate(plan: &QueryPlan) -> QueryResult<()> {
    validate_scoped(plan, &[])
}

/// True for aliases usable unquoted in generated SQL.
pub fn is_identifier(alias: &str) -> bool {
    let mut chars = alias.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_scoped(plan: &QueryPlan, outer: &[&Source]) -> QueryResult<()> {
    if let Some(problem) = plan.problems.first() {
        return Err(QueryError::invalid(problem.clone()));
    }
    if plan.sources.is_empty() {
        return Err(QueryError::invalid(
            "query has no source; add one with from() or select_from()",
        ));
    }
    if plan.select.is_empty() {
        return Err(QueryError::invalid("query selects nothing"));
    }

    let mut local: Vec<&Source> = Vec::new();
    for source in plan.sources.iter().chain(plan.joins.iter().map(|j| &j.target)) {
        let alias = source.alias.as_str();
        if !is_identifier(alias) {
            return Err(QueryError::invalid(format!(
                "'{}' is not a valid alias",
                alias
            )));
        }
        if local.iter().any(|s| s.alias == alias) {
            return Err(QueryError::invalid(format!(
                "alias '{}' is declared twice",
                alias
            )));
        }
        local.push(source);
    }

    check_joins(plan, outer)?;

    let scope: Vec<&Source> = local.iter().chain(outer.iter()).copied().collect();

    for item in &plan.select {
        match item {
            SelectItem::Expr(expr) => {
                check_scope(expr, &scope, "select")?;
                check_expr(expr)?;
            }
            SelectItem::Entity(source) => {
                if !local.iter().any(|s| s.alias == source.alias) {
                    return Err(QueryError::invalid(format!(
                        "selected entity '{}' is not a source of this query",
                        source.alias
                    )));
                }
            }
        }
    }
    if let Some(filter) = &plan.filter {
        check_predicate_scope(filter, &scope, "where")?;
        check_predicate(filter)?;
        if filter.expressions().iter().any(|e| e.contains_aggregate()) {
            return Err(QueryError::invalid(
                "aggregate functions are not allowed in where; use having",
            ));
        }
    }
    for key in &plan.group_by {
        check_scope(key, &scope, "group by")?;
        check_expr(key)?;
    }
    if let Some(having) = &plan.having {
        check_predicate_scope(having, &scope, "having")?;
        check_predicate(having)?;
    }
    for order in &plan.order_by {
        check_scope(&order.expr, &scope, "order by")?;
        check_expr(&order.expr)?;
    }

    check_aggregation(plan)?;

    for sub in subqueries(plan) {
        if !matches!(sub.select.as_slice(), [SelectItem::Expr(_)]) {
            return Err(QueryError::invalid(
                "a subquery must select exactly one expression",
            ));
        }
        validate_scoped(sub, &scope)?;
    }

    Ok(())
}

fn check_joins(plan: &QueryPlan, outer: &[&Source]) -> QueryResult<()> {
    let mut visible: Vec<&Source> = plan.sources.iter().collect();

    for join in &plan.joins {
        let target = join.target.alias.as_str();
        match &join.association {
            Some((owner, association)) => {
                if !visible.iter().any(|s| &s.alias == owner) {
                    return Err(QueryError::invalid(format!(
                        "join on {}.{} before '{}' is a source",
                        owner, association.name, owner
                    )));
                }
                if association.target.table != join.target.meta.table {
                    return Err(QueryError::invalid(format!(
                        "{}.{} points at {}, not {}",
                        owner, association.name, association.target.name, join.target.meta.name
                    )));
                }
            }
            None => {
                if join.on.is_none() {
                    let kind = match join.kind {
                        JoinKind::Inner => "join",
                        JoinKind::Left => "left join",
                    };
                    return Err(QueryError::invalid(format!(
                        "{} to unrelated entity '{}' needs an on() condition",
                        kind, target
                    )));
                }
            }
        }

        if join.fetch {
            let Some((owner, _)) = &join.association else {
                return Err(QueryError::invalid(format!(
                    "fetch join to '{}' needs an association",
                    target
                )));
            };
            let owner_selected = plan.select.iter().any(|item| {
                matches!(item, SelectItem::Entity(source) if &source.alias == owner)
            });
            if !owner_selected {
                return Err(QueryError::invalid(format!(
                    "fetch join to '{}' requires '{}' to be selected as an entity",
                    target, owner
                )));
            }
        }

        visible.push(&join.target);
        if let Some(on) = &join.on {
            let scope: Vec<&Source> = visible.iter().chain(outer.iter()).copied().collect();
            check_predicate_scope(on, &scope, "join on")?;
            check_predicate(on)?;
        }
    }
    Ok(())
}

/// Every column must name a visible source and one of its declared columns,
/// with the declared type.
fn check_scope(expr: &ExprNode, scope: &[&Source], clause: &str) -> QueryResult<()> {
    let mut columns = Vec::new();
    expr.columns(&mut columns);
    for col in columns {
        let Some(source) = scope.iter().find(|s| s.alias == col.alias) else {
            return Err(QueryError::invalid(format!(
                "{} references unknown alias '{}' ({}.{})",
                clause, col.alias, col.alias, col.column
            )));
        };
        let Some(declared) = source.meta.columns.iter().find(|c| c.name == col.column) else {
            return Err(QueryError::invalid(format!(
                "{} references unknown column {}.{}; {} has no such column",
                clause, col.alias, col.column, source.meta.name
            )));
        };
        if declared.ty != col.ty {
            return Err(QueryError::type_mismatch(
                declared.ty,
                col.ty,
                format!("{}.{}", col.alias, col.column),
            ));
        }
    }
    Ok(())
}

fn check_predicate_scope(
    predicate: &Predicate,
    scope: &[&Source],
    clause: &str,
) -> QueryResult<()> {
    predicate
        .expressions()
        .into_iter()
        .try_for_each(|e| check_scope(e, scope, clause))
}

/// Grouping rules: with group keys, every non-aggregate select, having and
/// order expression must be a key; without them, aggregates and bare
/// columns cannot be mixed in the select list.
fn check_aggregation(plan: &QueryPlan) -> QueryResult<()> {
    if !plan.group_by.is_empty() {
        for item in &plan.select {
            match item {
                SelectItem::Entity(source) => {
                    return Err(QueryError::invalid(format!(
                        "cannot select entity '{}' in a grouped query",
                        source.alias
                    )));
                }
                SelectItem::Expr(expr) if !is_grouped(expr, &plan.group_by) => {
                    return Err(QueryError::invalid(format!(
                        "select expression {} is neither aggregated nor in group by",
                        expr
                    )));
                }
                SelectItem::Expr(_) => {}
            }
        }
        if let Some(having) = &plan.having {
            if let Some(expr) = having
                .expressions()
                .into_iter()
                .find(|e| !is_grouped(e, &plan.group_by))
            {
                return Err(QueryError::invalid(format!(
                    "having expression {} is neither aggregated nor in group by",
                    expr
                )));
            }
        }
        if let Some(order) = plan
            .order_by
            .iter()
            .find(|o| !is_grouped(&o.expr, &plan.group_by))
        {
            return Err(QueryError::invalid(format!(
                "order by {} is neither aggregated nor in group by",
                order.expr
            )));
        }
        return Ok(());
    }

    if plan.having.is_some() {
        return Err(QueryError::invalid("having requires group by"));
    }

    if plan.is_aggregate() {
        for item in &plan.select {
            let mixed = match item {
                SelectItem::Entity(_) => true,
                SelectItem::Expr(expr) => {
                    let mut bare = Vec::new();
                    expr.bare_columns(&mut bare);
                    !bare.is_empty()
                }
            };
            if mixed {
                return Err(QueryError::invalid(
                    "select mixes aggregate and non-aggregate expressions without group by",
                ));
            }
        }
        for order in &plan.order_by {
            let mut bare = Vec::new();
            order.expr.bare_columns(&mut bare);
            if !bare.is_empty() {
                return Err(QueryError::invalid(format!(
                    "order by {} is not aggregated in an aggregate query",
                    order.expr
                )));
            }
        }
    }
    Ok(())
}

/// True if `expr` is constant per group.
fn is_grouped(expr: &ExprNode, keys: &[ExprNode]) -> bool {
    let expr = expr.unaliased();
    if keys.iter().any(|k| k == expr) {
        return true;
    }
    match expr {
        ExprNode::Column(_) => false,
        ExprNode::Literal(_) | ExprNode::Aggregate { .. } | ExprNode::Subquery(_) => true,
        ExprNode::Case(case) => case.children().all(|c| is_grouped(c, keys)),
        ExprNode::Concat(parts) => parts.iter().all(|p| is_grouped(p, keys)),
        ExprNode::Cast { expr, .. } | ExprNode::Alias { expr, .. } => is_grouped(expr, keys),
        ExprNode::Predicate(pred) => pred.expressions().iter().all(|e| is_grouped(e, keys)),
    }
}

fn subqueries(plan: &QueryPlan) -> Vec<&QueryPlan> {
    let mut out = Vec::new();
    for item in &plan.select {
        if let SelectItem::Expr(expr) = item {
            expr.subqueries(&mut out);
        }
    }
    for join in &plan.joins {
        if let Some(on) = &join.on {
            on.subqueries(&mut out);
        }
    }
    if let Some(filter) = &plan.filter {
        filter.subqueries(&mut out);
    }
    for key in &plan.group_by {
        key.subqueries(&mut out);
    }
    if let Some(having) = &plan.having {
        having.subqueries(&mut out);
    }
    for order in &plan.order_by {
        order.expr.subqueries(&mut out);
    }
    out
}

// ============================================================================
// Type checks
// ============================================================================

fn compatible(lhs: &ExprNode, rhs: &ExprNode, context: &str) -> QueryResult<()> {
    match (lhs.sql_type(), rhs.sql_type()) {
        (Some(l), Some(r)) if !l.is_comparable_with(r) => {
            Err(QueryError::type_mismatch(l, r, context))
        }
        _ => Ok(()),
    }
}

fn require(
    expr: &ExprNode,
    check: fn(SqlType) -> bool,
    expected: &str,
    context: &str,
) -> QueryResult<()> {
    match expr.sql_type() {
        Some(ty) if !check(ty) => Err(QueryError::type_mismatch(expected, ty, context)),
        _ => Ok(()),
    }
}

/// Check operand types of an expression tree (subqueries excluded).
pub fn check_expr(expr: &ExprNode) -> QueryResult<()> {
    match expr {
        ExprNode::Column(_) | ExprNode::Literal(_) | ExprNode::Subquery(_) => Ok(()),
        ExprNode::Aggregate { func, arg, .. } => match arg {
            Some(arg) => {
                check_expr(arg)?;
                if func.requires_numeric() {
                    require(arg, SqlType::is_numeric, "numeric", func.keyword())?;
                }
                Ok(())
            }
            None if *func == AggregateFn::Count => Ok(()),
            None => Err(QueryError::invalid(format!(
                "{} needs an argument",
                func.keyword()
            ))),
        },
        ExprNode::Case(case) => {
            if let Some(subject) = &case.subject {
                check_expr(subject)?;
            }
            for (condition, result) in &case.branches {
                match condition {
                    CaseCondition::Equals(value) => {
                        check_expr(value)?;
                        if let Some(subject) = &case.subject {
                            compatible(subject, value, "case when")?;
                        }
                    }
                    CaseCondition::Matches(predicate) => check_predicate(predicate)?,
                }
                check_expr(result)?;
            }
            check_expr(&case.otherwise)?;
            if let Some(expected) = case.result_type() {
                for result in case
                    .branches
                    .iter()
                    .map(|(_, r)| r)
                    .chain(std::iter::once(case.otherwise.as_ref()))
                {
                    match result.sql_type() {
                        Some(found) if !found.is_comparable_with(expected) => {
                            return Err(QueryError::type_mismatch(expected, found, "case result"));
                        }
                        _ => {}
                    }
                }
            }
            Ok(())
        }
        ExprNode::Concat(parts) => parts.iter().try_for_each(|part| {
            check_expr(part)?;
            require(part, |t| t == SqlType::Text, "Text", "concat")
        }),
        ExprNode::Alias { expr, name } => {
            if !is_identifier(name) {
                return Err(QueryError::invalid(format!(
                    "'{}' is not a valid select alias",
                    name
                )));
            }
            check_expr(expr)
        }
        ExprNode::Cast { expr, .. } => check_expr(expr),
        ExprNode::Predicate(predicate) => check_predicate(predicate),
    }
}

/// Check operand compatibility of a predicate tree.
pub fn check_predicate(predicate: &Predicate) -> QueryResult<()> {
    match predicate {
        Predicate::Compare { op, lhs, rhs } => {
            check_expr(lhs)?;
            check_expr(rhs)?;
            compatible(lhs, rhs, op.name())
        }
        Predicate::Between { expr, low, high } => {
            check_expr(expr)?;
            check_expr(low)?;
            check_expr(high)?;
            compatible(expr, low, "between")?;
            compatible(expr, high, "between")
        }
        Predicate::In { expr, list, .. } => {
            check_expr(expr)?;
            match list {
                InList::Values(values) => values.iter().try_for_each(|value| {
                    check_expr(value)?;
                    compatible(expr, value, "in")
                }),
                InList::Subquery(plan) => match (expr.sql_type(), plan.scalar_type()) {
                    (Some(l), Some(r)) if !l.is_comparable_with(r) => {
                        Err(QueryError::type_mismatch(l, r, "in subquery"))
                    }
                    _ => Ok(()),
                },
            }
        }
        Predicate::IsNull { expr, .. } => check_expr(expr),
        Predicate::Like { expr, pattern } => {
            check_expr(expr)?;
            require(expr, |t| t == SqlType::Text, "Text", "like")?;
            require(pattern, |t| t == SqlType::Text, "Text", "like pattern")
        }
        Predicate::And(parts) | Predicate::Or(parts) => parts.iter().try_for_each(check_predicate),
        Predicate::Not(inner) => check_predicate(inner),
    }
}
