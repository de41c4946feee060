//! Property-based tests for predicate composition and rendering
//!
//! Checks structural invariants that must hold for any input: conjunction
//! flattening, parameter binding, and LIKE escaping.

use proptest::prelude::*;
use quarry_query::expr::InList;
use quarry_query::query::{SelectItem, Source};
use quarry_query::{
    ColumnMeta, EntityMeta, Expr, Predicate, QueryPlan, QueryRenderer, SqlType, SqliteRenderer,
    Value,
};

static ITEM: EntityMeta = EntityMeta {
    name: "Item",
    table: "item",
    id_column: "id",
    columns: &[
        ColumnMeta {
            name: "id",
            ty: SqlType::Integer,
            nullable: false,
        },
        ColumnMeta {
            name: "label",
            ty: SqlType::Text,
            nullable: true,
        },
    ],
    associations: &[],
};

fn id() -> Expr<i64> {
    Expr::column("item", "id")
}

fn label() -> Expr<String> {
    Expr::column("item", "label")
}

fn plan_with(filter: Predicate) -> QueryPlan {
    QueryPlan {
        select: vec![SelectItem::Expr(id().into_node())],
        sources: vec![Source {
            alias: "item".to_string(),
            meta: &ITEM,
        }],
        filter: Some(filter),
        ..QueryPlan::default()
    }
}

proptest! {
    /// Property: chained and() yields one flat conjunction in call order
    #[test]
    fn and_chain_is_flat(bounds in prop::collection::vec(0i64..1000, 2..12)) {
        let parts: Vec<Predicate> = bounds.iter().map(|b| id().gt(*b)).collect();
        let chained = parts[1..]
            .iter()
            .fold(parts[0].clone(), |acc, p| acc.and(p));

        prop_assert_eq!(chained, Predicate::And(parts));
    }

    /// Property: grouping does not change the flattened conjunction
    #[test]
    fn and_is_associative(a in 0i64..100, b in 0i64..100, c in 0i64..100) {
        let (pa, pb, pc) = (id().gt(a), id().lt(b), id().ne(c));
        prop_assert_eq!(pa.and(&pb).and(&pc), pa.and(pb.and(&pc)));
    }

    /// Property: every IN list value is bound as its own parameter
    #[test]
    fn in_list_binds_each_value(values in prop::collection::vec(any::<i64>(), 0..20)) {
        let predicate = id().is_in(values.clone());
        let rendered = SqliteRenderer.render(&plan_with(predicate)).unwrap();

        prop_assert_eq!(rendered.params.len(), values.len());
        for (i, (name, value)) in rendered.params.iter().enumerate() {
            prop_assert_eq!(name, &format!("p{}", i + 1));
            prop_assert_eq!(value, &Value::Integer(values[i]));
        }
        if values.is_empty() {
            prop_assert!(rendered.sql.contains("1 = 0"));
        }
    }

    /// Property: literal text never leaks into the SQL string
    #[test]
    fn literals_are_never_inlined(text in "[a-zA-Z0-9' ;]{1,20}") {
        let rendered = SqliteRenderer
            .render(&plan_with(label().eq(text.as_str())))
            .unwrap();

        prop_assert!(rendered.sql.contains("item.label = :p1"));
        prop_assert_eq!(&rendered.params[0].1, &Value::Text(text));
    }

    /// Property: contains() matches the needle literally, wildcards escaped
    #[test]
    fn contains_escapes_wildcards(needle in "[a-z%_\\\\]{0,12}") {
        let Predicate::Like { pattern, .. } = label().contains(&needle) else {
            panic!("contains must build a LIKE");
        };
        let quarry_query::ExprNode::Literal(Value::Text(pattern)) = pattern else {
            panic!("pattern must be a text literal");
        };

        let inner = &pattern[1..pattern.len() - 1];
        let mut unescaped = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                let next = chars.next();
                prop_assert!(matches!(next, Some('%' | '_' | '\\')));
                unescaped.extend(next);
            } else {
                prop_assert!(c != '%' && c != '_');
                unescaped.push(c);
            }
        }
        prop_assert_eq!(unescaped, needle);
    }

    /// Property: NOT IN of an empty list matches everything
    #[test]
    fn empty_not_in_is_tautology(_seed in 0u8..4) {
        let predicate = id().not_in(Vec::<i64>::new());
        let is_empty_values = matches!(
            &predicate,
            Predicate::In { list: InList::Values(v), negated: true, .. } if v.is_empty()
        );
        prop_assert!(is_empty_values);

        let rendered = SqliteRenderer.render(&plan_with(predicate)).unwrap();
        prop_assert!(rendered.sql.contains("WHERE 1 = 1"));
    }
}
