//! DTO projections.
//!
//! A DTO declares how it is filled through one of three static binding
//! descriptors:
//!
//! - [`ConstructorBinding`]: select items are passed positionally as a typed
//!   argument tuple
//! - [`BeanBinding`]: each select item is routed to the setter named
//!   `set<Name>` after its binding name
//! - [`FieldBinding`]: each select item is routed to the field named after
//!   its binding name
//!
//! The binding name of an item is its alias, or the column name of a plain
//! path. Named bindings are lenient: a target with no matching item keeps
//! its `Default` value and an item with no matching target is dropped.

use crate::error::QueryResult;
use crate::expr::{Expr, ExprNode};
use crate::projection::Projection;
use crate::query::SelectItem;
use crate::row::Row;
use crate::value::{FromValue, Value};
use std::fmt;
use std::marker::PhantomData;
use tracing::trace;

/// Writes one decoded value into a DTO.
pub type Assign<D> = fn(&mut D, Value) -> QueryResult<()>;

/// A setter in a bean binding table. `name` is the full setter name
/// (`setUsername`).
pub struct Setter<D> {
    pub name: &'static str,
    pub set: Assign<D>,
}

/// A field in a field binding table.
pub struct FieldSlot<D> {
    pub name: &'static str,
    pub assign: Assign<D>,
}

impl<D> fmt::Debug for Setter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Setter({})", self.name)
    }
}

impl<D> fmt::Debug for FieldSlot<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldSlot({})", self.name)
    }
}

/// DTO filled through a default value and named setters.
pub trait BeanBinding: Default + 'static {
    fn setters() -> &'static [Setter<Self>];
}

/// DTO filled through a default value and named fields.
pub trait FieldBinding: Default + 'static {
    fn fields() -> &'static [FieldSlot<Self>];
}

/// DTO built from its constructor arguments in order.
pub trait ConstructorBinding<Args>: Sized {
    fn construct(args: Args) -> Self;
}

/// `username` -> `setUsername`
pub fn setter_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("set{}{}", first.to_uppercase(), chars.as_str()),
        None => "set".to_string(),
    }
}

/// A typed list of expressions, given as a tuple of one to six `Expr`s.
pub trait ExprList {
    /// Decoded row values, one per expression.
    type Values;

    fn nodes(&self) -> Vec<ExprNode>;

    fn decode(row: &Row) -> QueryResult<Self::Values>;
}

macro_rules! expr_list {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: FromValue),+> ExprList for ($(Expr<$name>,)+) {
            type Values = ($($name,)+);

            fn nodes(&self) -> Vec<ExprNode> {
                vec![$(self.$idx.node().clone()),+]
            }

            fn decode(row: &Row) -> QueryResult<Self::Values> {
                Ok(($(row.decode::<$name>($idx)?,)+))
            }
        }
    };
}

expr_list!(A: 0);
expr_list!(A: 0, B: 1);
expr_list!(A: 0, B: 1, C: 2);
expr_list!(A: 0, B: 1, C: 2, D: 3);
expr_list!(A: 0, B: 1, C: 2, D: 3, E: 4);
expr_list!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

fn expr_items(nodes: &[ExprNode]) -> Vec<SelectItem> {
    nodes.iter().cloned().map(SelectItem::Expr).collect()
}

/// Route each item to the assigner whose name matches.
fn bind_named<D: Default>(
    nodes: &[ExprNode],
    row: &Row,
    target: &str,
    lookup: impl Fn(&str) -> Option<Assign<D>>,
) -> QueryResult<D> {
    let mut dto = D::default();
    for (index, node) in nodes.iter().enumerate() {
        let assign = node.binding_name().and_then(|name| lookup(name));
        match assign {
            Some(assign) => assign(&mut dto, row.decode::<Value>(index)?)?,
            None => trace!(item = %node, dto = target, "No binding target, item dropped"),
        }
    }
    Ok(dto)
}

/// Projection into a [`BeanBinding`] DTO.
pub struct Bean<D> {
    nodes: Vec<ExprNode>,
    _dto: PhantomData<fn() -> D>,
}

impl<D: BeanBinding> Projection for Bean<D> {
    type Output = D;

    fn select_items(&self) -> Vec<SelectItem> {
        expr_items(&self.nodes)
    }

    fn project(&self, row: &Row) -> QueryResult<D> {
        bind_named(&self.nodes, row, std::any::type_name::<D>(), |name| {
            let wanted = setter_name(name);
            D::setters()
                .iter()
                .find(|s| s.name == wanted)
                .map(|s| s.set)
        })
    }
}

/// Projection into a [`FieldBinding`] DTO.
pub struct Fields<D> {
    nodes: Vec<ExprNode>,
    _dto: PhantomData<fn() -> D>,
}

impl<D: FieldBinding> Projection for Fields<D> {
    type Output = D;

    fn select_items(&self) -> Vec<SelectItem> {
        expr_items(&self.nodes)
    }

    fn project(&self, row: &Row) -> QueryResult<D> {
        bind_named(&self.nodes, row, std::any::type_name::<D>(), |name| {
            D::fields()
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.assign)
        })
    }
}

/// Projection into a [`ConstructorBinding`] DTO.
pub struct Constructor<D, L> {
    list: L,
    _dto: PhantomData<fn() -> D>,
}

impl<D, L> Projection for Constructor<D, L>
where
    L: ExprList,
    D: ConstructorBinding<L::Values>,
{
    type Output = D;

    fn select_items(&self) -> Vec<SelectItem> {
        expr_items(&self.list.nodes())
    }

    fn project(&self, row: &Row) -> QueryResult<D> {
        Ok(D::construct(L::decode(row)?))
    }
}

/// Factory for DTO projections.
///
/// ```ignore
/// select(Projections::bean::<MemberDto>((member.username(), member.age())))
/// ```
pub struct Projections;

impl Projections {
    pub fn bean<D: BeanBinding>(items: impl ExprList) -> Bean<D> {
        Bean {
            nodes: items.nodes(),
            _dto: PhantomData,
        }
    }

    pub fn fields<D: FieldBinding>(items: impl ExprList) -> Fields<D> {
        Fields {
            nodes: items.nodes(),
            _dto: PhantomData,
        }
    }

    pub fn constructor<D, L>(items: L) -> Constructor<D, L>
    where
        L: ExprList,
        D: ConstructorBinding<L::Values>,
    {
        Constructor {
            list: items,
            _dto: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::RowLayout;
    use std::sync::Arc;

    #[derive(Debug, Default, PartialEq)]
    struct Named {
        name: String,
        age: i32,
    }

    fn set_name(dto: &mut Named, value: Value) -> QueryResult<()> {
        dto.name = String::from_value(value)?;
        Ok(())
    }

    fn set_age(dto: &mut Named, value: Value) -> QueryResult<()> {
        dto.age = i32::from_value(value)?;
        Ok(())
    }

    impl BeanBinding for Named {
        fn setters() -> &'static [Setter<Self>] {
            const SETTERS: &[Setter<Named>] = &[
                Setter {
                    name: "setName",
                    set: set_name,
                },
                Setter {
                    name: "setAge",
                    set: set_age,
                },
            ];
            SETTERS
        }
    }

    fn row_for(nodes: &[ExprNode], values: Vec<Value>) -> Row {
        let layout = RowLayout::new(expr_items(nodes), nodes.len());
        Row::new(Arc::new(layout), values).unwrap()
    }

    #[test]
    fn test_setter_name() {
        assert_eq!(setter_name("username"), "setUsername");
        assert_eq!(setter_name("a"), "setA");
    }

    #[test]
    fn test_bean_binds_by_alias_and_drops_unknown() {
        let username = Expr::<String>::column("member", "username");
        let projection = Projections::bean::<Named>((
            username.alias("name"),
            Expr::<String>::column("member", "nickname"),
        ));
        let row = row_for(
            &projection.nodes,
            vec![Value::Text("member1".into()), Value::Text("ignored".into())],
        );

        let dto = projection.project(&row).unwrap();
        assert_eq!(
            dto,
            Named {
                name: "member1".into(),
                age: 0
            }
        );
    }
}
