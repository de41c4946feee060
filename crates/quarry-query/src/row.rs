//! Result rows and tuples.

use crate::entity::{Entity, EntityPath};
use crate::error::{PersistenceError, QueryError, QueryResult};
use crate::expr::{Expr, ExprNode};
use crate::query::SelectItem;
use crate::value::{FromValue, Value};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Column layout shared by all rows of one result.
#[derive(Debug)]
pub struct RowLayout {
    items: Vec<SelectItem>,
    spans: Vec<Range<usize>>,
    visible: usize,
    width: usize,
}

impl RowLayout {
    /// `visible` is the number of leading items the caller asked for; the
    /// rest are fetch-joined entities.
    pub fn new(items: Vec<SelectItem>, visible: usize) -> Self {
        let mut spans = Vec::with_capacity(items.len());
        let mut start = 0;
        for item in &items {
            let end = start + item.width();
            spans.push(start..end);
            start = end;
        }
        Self {
            visible: visible.min(items.len()),
            items,
            spans,
            width: start,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn items(&self) -> &[SelectItem] {
        &self.items
    }
}

/// One result row, split into select items.
#[derive(Debug, Clone)]
pub struct Row {
    layout: Arc<RowLayout>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(layout: Arc<RowLayout>, values: Vec<Value>) -> QueryResult<Self> {
        if values.len() != layout.width {
            return Err(PersistenceError::backend(format!(
                "row has {} columns, expected {}",
                values.len(),
                layout.width
            ))
            .into());
        }
        Ok(Self { layout, values })
    }

    /// Number of visible select items.
    pub fn len(&self) -> usize {
        self.layout.visible
    }

    pub fn is_empty(&self) -> bool {
        self.layout.visible == 0
    }

    /// Visible item `index` and its column values.
    pub fn item(&self, index: usize) -> Option<(&SelectItem, &[Value])> {
        if index >= self.layout.visible {
            return None;
        }
        self.item_at(index)
    }

    fn item_at(&self, index: usize) -> Option<(&SelectItem, &[Value])> {
        let item = self.layout.items.get(index)?;
        let span = self.layout.spans.get(index)?.clone();
        Some((item, &self.values[span]))
    }

    /// Every item, fetch-joined entities included.
    pub fn items(&self) -> impl Iterator<Item = (&SelectItem, &[Value])> + '_ {
        (0..self.layout.items.len()).filter_map(move |i| self.item_at(i))
    }

    /// Decode the single-column item at `index`.
    pub fn decode<T: FromValue>(&self, index: usize) -> QueryResult<T> {
        match self.item(index) {
            Some((SelectItem::Expr(expr), [value])) => T::from_value(value.clone()).map_err(|err| {
                match err {
                    QueryError::TypeMismatch {
                        expected, found, ..
                    } => QueryError::TypeMismatch {
                        expected,
                        found,
                        context: format!("select item {}", expr),
                    },
                    other => other,
                }
            }),
            Some((SelectItem::Entity(source), _)) => Err(QueryError::invalid(format!(
                "select item {} is entity '{}', not a value",
                index, source.alias
            ))),
            _ => Err(QueryError::invalid(format!(
                "row has no select item {}",
                index
            ))),
        }
    }

    /// Hydrate the entity item at `index`; `None` for an outer-join miss.
    pub fn entity<E: Entity>(&self, index: usize) -> QueryResult<Option<E>> {
        match self.item(index) {
            Some((SelectItem::Entity(source), values)) => {
                if source.meta.id_of(values).is_none() {
                    return Ok(None);
                }
                E::from_values(values).map(Some)
            }
            _ => Err(QueryError::invalid(format!(
                "select item {} is not an entity",
                index
            ))),
        }
    }

    /// Position of the visible item selecting `node`, ignoring aliases.
    pub fn position_of(&self, node: &ExprNode) -> Option<usize> {
        let wanted = node.unaliased();
        self.layout.items[..self.layout.visible]
            .iter()
            .position(|item| matches!(item, SelectItem::Expr(e) if e.unaliased() == wanted))
    }

    /// Position of the visible entity item with this alias.
    pub fn position_of_entity(&self, alias: &str) -> Option<usize> {
        self.layout.items[..self.layout.visible]
            .iter()
            .position(|item| matches!(item, SelectItem::Entity(s) if s.alias == alias))
    }
}

/// Multi-item result row, addressed by the expressions that were selected.
#[derive(Debug, Clone)]
pub struct Tuple {
    row: Row,
}

impl Tuple {
    pub fn new(row: Row) -> Self {
        Self { row }
    }

    /// Value of `expr`; `None` if `expr` was not selected.
    pub fn get<T: FromValue>(&self, expr: &Expr<T>) -> QueryResult<Option<T>> {
        match self.row.position_of(expr.node()) {
            Some(index) => self.row.decode(index).map(Some),
            None => Ok(None),
        }
    }

    /// Value at select position `index`.
    pub fn get_at<T: FromValue>(&self, index: usize) -> QueryResult<T> {
        self.row.decode(index)
    }

    /// Entity selected as `path`; `None` if not selected or not matched by
    /// an outer join.
    pub fn entity<P: EntityPath>(&self, path: &P) -> QueryResult<Option<P::Entity>> {
        match self.row.position_of_entity(path.alias()) {
            Some(index) => self.row.entity(index),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for index in 0..self.row.len() {
            if index > 0 {
                f.write_str(", ")?;
            }
            match self.row.item(index) {
                Some((SelectItem::Expr(_), [value])) => write!(f, "{}", value)?,
                Some((SelectItem::Entity(source), values))
                    if source.meta.id_of(values).is_none() =>
                {
                    f.write_str("null")?
                }
                Some((SelectItem::Entity(source), values)) => {
                    write!(f, "{}(", source.meta.name)?;
                    for (i, (column, value)) in source.meta.columns.iter().zip(values).enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}={}", column.name, value)?;
                    }
                    f.write_str(")")?;
                }
                _ => f.write_str("?")?,
            }
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn layout() -> Arc<RowLayout> {
        Arc::new(RowLayout::new(
            vec![
                SelectItem::Expr(Expr::<String>::column("member", "username").into_node()),
                SelectItem::Expr(Expr::<i32>::column("member", "age").into_node()),
            ],
            2,
        ))
    }

    #[test]
    fn test_row_width_checked() {
        let err = Row::new(layout(), vec![Value::Text("a".into())]).unwrap_err();
        assert!(matches!(err, QueryError::Persistence(_)));
    }

    #[test]
    fn test_tuple_lookup_by_expression() {
        let row = Row::new(layout(), vec![Value::Text("member1".into()), Value::Integer(10)])
            .unwrap();
        let tuple = Tuple::new(row);

        let age = Expr::<i32>::column("member", "age");
        let username = Expr::<String>::column("member", "username");
        assert_eq!(tuple.get(&age).unwrap(), Some(10));
        assert_eq!(tuple.get(&username.alias("name")).unwrap(), Some("member1".to_string()));
        assert_eq!(tuple.get(&Expr::<i32>::column("team", "id")).unwrap(), None);
        assert_eq!(tuple.to_string(), "[member1, 10]");
    }

    #[test]
    fn test_null_needs_nullable_expression() {
        let row = Row::new(layout(), vec![Value::Text("x".into()), Value::Null]).unwrap();
        let tuple = Tuple::new(row);
        let age = Expr::<i32>::column("member", "age");

        assert!(matches!(
            tuple.get(&age),
            Err(QueryError::TypeMismatch { .. })
        ));
        assert_eq!(tuple.get(&age.nullable()).unwrap(), Some(None));
    }
}
