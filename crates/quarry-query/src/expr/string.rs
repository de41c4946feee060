//! String operators.

use super::{Expr, ExprNode, Operand, Predicate};
use crate::value::Value;

/// Escape `%`, `_` and `\` so the text matches literally inside `LIKE`.
pub(crate) fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl Expr<String> {
    /// `expr || other`; chained calls produce one flat concatenation.
    pub fn concat(&self, other: impl Operand<String>) -> Expr<String> {
        let mut parts = match self.node().unaliased() {
            ExprNode::Concat(parts) => parts.clone(),
            single => vec![single.clone()],
        };
        parts.push(other.into_operand());
        Expr::from_node(ExprNode::Concat(parts))
    }

    /// Raw `LIKE` pattern; `%` and `_` are wildcards, `\` escapes.
    pub fn like(&self, pattern: impl Into<String>) -> Predicate {
        Predicate::Like {
            expr: self.node().unaliased().clone(),
            pattern: ExprNode::Literal(Value::Text(pattern.into())),
        }
    }

    pub fn starts_with(&self, prefix: &str) -> Predicate {
        self.like(format!("{}%", escape_like(prefix)))
    }

    pub fn ends_with(&self, suffix: &str) -> Predicate {
        self.like(format!("%{}", escape_like(suffix)))
    }

    pub fn contains(&self, needle: &str) -> Predicate {
        self.like(format!("%{}%", escape_like(needle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn username() -> Expr<String> {
        Expr::column("member", "username")
    }

    #[test]
    fn test_concat_flattens() {
        let age = Expr::<i32>::column("member", "age");
        let expr = username().concat("_").concat(age.string_value());
        let ExprNode::Concat(parts) = expr.node() else {
            panic!("expected concat");
        };
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_starts_with_escapes_wildcards() {
        let Predicate::Like { pattern, .. } = username().starts_with("a_b") else {
            panic!("expected like");
        };
        assert_eq!(pattern, ExprNode::Literal(Value::Text("a\\_b%".into())));
    }
}
