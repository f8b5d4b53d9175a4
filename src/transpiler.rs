//! SQL rendering for predicate trees.
//!
//! Produces the `WHERE` fragment a database provider would send for a
//! predicate, so a rewritten tree can be compared against the SQL it stands in
//! for.

use crate::ast::*;

/// Trait for converting AST nodes to SQL.
pub trait ToSql {
    /// Convert this node to a SQL string.
    fn to_sql(&self) -> String;
}

impl ToSql for Value {
    fn to_sql(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

impl ToSql for Expr {
    fn to_sql(&self) -> String {
        match self {
            // The marker has no SQL form; calls drop it from their argument lists.
            Expr::Functions => String::new(),
            Expr::Constant(v) => v.to_sql(),
            Expr::Parameter(name) => name.clone(),
            Expr::Member { object, name } => match object.as_ref() {
                Expr::Parameter(_) => name.clone(),
                other => format!("{}.{}", other.to_sql(), name),
            },
            Expr::Call(call) => call.to_sql(),
            Expr::Binary { left, op, right } => binary_sql(left, *op, right),
            Expr::Not(inner) => format!("NOT ({})", inner.to_sql()),
            Expr::Lambda { body, .. } => body.to_sql(),
            Expr::NotTranslated => "/* not translated */".to_string(),
        }
    }
}

impl ToSql for MethodCall {
    fn to_sql(&self) -> String {
        match self.kind() {
            CallKind::Like | CallKind::LikeWithEscape => like_sql(self.args().get(1..).unwrap_or(&[])),
            CallKind::InMemoryLike => like_sql(self.args()),
            CallKind::Other => {
                let args: Vec<String> = self
                    .object()
                    .into_iter()
                    .chain(self.args())
                    .filter(|a| !matches!(a, Expr::Functions))
                    .map(|a| a.to_sql())
                    .collect();
                format!("{}({})", self.method().name, args.join(", "))
            }
        }
    }
}

/// Render `subject LIKE pattern [ESCAPE escape]` from `[subject, pattern, escape?]`.
fn like_sql(args: &[Expr]) -> String {
    let operand = |i: usize| args.get(i).map(|a| a.to_sql()).unwrap_or_else(|| "NULL".to_string());

    let mut sql = format!("{} LIKE {}", operand(0), operand(1));
    match args.get(2) {
        None | Some(Expr::Constant(Value::Null)) => {}
        Some(escape) => {
            sql.push_str(" ESCAPE ");
            sql.push_str(&escape.to_sql());
        }
    }
    sql
}

fn binary_sql(left: &Expr, op: BinaryOp, right: &Expr) -> String {
    let is_null = |e: &Expr| matches!(e, Expr::Constant(Value::Null));

    match op {
        BinaryOp::And => format!("{} AND {}", left.to_sql(), right.to_sql()),
        // Wrap OR groups in parentheses for correct precedence
        BinaryOp::Or => format!("({} OR {})", left.to_sql(), right.to_sql()),
        BinaryOp::Eq if is_null(right) => format!("{} IS NULL", left.to_sql()),
        BinaryOp::Ne if is_null(right) => format!("{} IS NOT NULL", left.to_sql()),
        BinaryOp::Eq => format!("{} = {}", left.to_sql(), right.to_sql()),
        BinaryOp::Ne => format!("{} <> {}", left.to_sql(), right.to_sql()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;
    use crate::rewriter::translate_call;

    fn sql(source: &str) -> String {
        parse_expr(source).unwrap().to_sql()
    }

    #[test]
    fn test_like_with_escape() {
        assert_eq!(
            sql(r"|p| like(functions, p.name, 'a\_%', '\') && p.active == true"),
            r"name LIKE 'a\_%' ESCAPE '\' AND active = TRUE"
        );
    }

    #[test]
    fn test_like_without_escape() {
        assert_eq!(sql("like(functions, p.name, 'x%')"), "name LIKE 'x%'");
    }

    #[test]
    fn test_rewritten_tree_renders_same_sql() {
        let tree = parse_expr(r"|p| like(functions, p.name, '100\%', '\') || p.name == null").unwrap();
        assert_eq!(translate_call(&tree).to_sql(), tree.to_sql());
        assert_eq!(
            tree.to_sql(),
            r"(name LIKE '100\%' ESCAPE '\' OR name IS NULL)"
        );
    }

    #[test]
    fn test_not_and_comparisons() {
        assert_eq!(
            sql("!like(functions, p.name, 'x%') && p.code != 7"),
            "NOT (name LIKE 'x%') AND code <> 7"
        );
        assert_eq!(sql("p.tag != null"), "tag IS NOT NULL");
    }

    #[test]
    fn test_string_quoting() {
        assert_eq!(sql("p.name == 'O''Brien'"), "name = 'O''Brien'");
    }

    #[test]
    fn test_other_calls() {
        assert_eq!(sql("p.name.upper()"), "upper(name)");
        assert_eq!(sql("date_diff(functions, p.a, p.b)"), "date_diff(a, b)");
    }
}
