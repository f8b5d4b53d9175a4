//! In-memory execution for predicate trees.
//!
//! This module stands in for the sequence evaluator of a mocked query
//! provider: predicates are rewritten with [`translate_call`] and then
//! evaluated row by row, so `like` calls end up in [`like_match_with`].

use std::collections::BTreeMap;

use tracing::warn;

use crate::ast::{BinaryOp, CallKind, Expr, MethodCall, Value};
use crate::config::{Config, OnTimeout};
use crate::error::{LikeError, LikeResult};
use crate::parser;
use crate::pattern::{MatchOptions, like_match_with};
use crate::rewriter::translate_call;

/// A single record, keyed by field name.
pub type Row = BTreeMap<String, Value>;

/// Build a [`Row`] from `(field, value)` pairs.
pub fn row<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Evaluates expression trees against a row.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    options: MatchOptions,
}

impl Evaluator {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    /// Evaluate `expr` with a single-parameter lambda bound to `row`.
    pub fn eval(&self, expr: &Expr, row: &Row) -> LikeResult<Value> {
        self.eval_in(expr, row, None)
    }

    /// Evaluate a predicate to a boolean.
    pub fn test(&self, expr: &Expr, row: &Row) -> LikeResult<bool> {
        as_bool(self.eval(expr, row)?)
    }

    fn eval_in(&self, expr: &Expr, row: &Row, bound: Option<&str>) -> LikeResult<Value> {
        match expr {
            Expr::Lambda { params, body } => match params.as_slice() {
                [param] => self.eval_in(body, row, Some(param.as_str())),
                _ => Err(LikeError::eval(format!(
                    "predicate lambdas take exactly one parameter, got {}",
                    params.len()
                ))),
            },
            Expr::Constant(v) => Ok(v.clone()),
            Expr::Member { object, name } => match object.as_ref() {
                Expr::Parameter(p) if Some(p.as_str()) == bound => {
                    Ok(row.get(name).cloned().unwrap_or(Value::Null))
                }
                Expr::Parameter(p) => Err(LikeError::eval(format!("unbound parameter '{}'", p))),
                other => Err(LikeError::eval(format!(
                    "member access is only supported on the row parameter, not '{}'",
                    other
                ))),
            },
            Expr::Parameter(p) => Err(LikeError::eval(format!(
                "parameter '{}' cannot be used as a value",
                p
            ))),
            Expr::Call(call) => self.eval_call(call, row, bound),
            Expr::Binary { left, op, right } => {
                let result = match op {
                    BinaryOp::And => {
                        as_bool(self.eval_in(left, row, bound)?)?
                            && as_bool(self.eval_in(right, row, bound)?)?
                    }
                    BinaryOp::Or => {
                        as_bool(self.eval_in(left, row, bound)?)?
                            || as_bool(self.eval_in(right, row, bound)?)?
                    }
                    BinaryOp::Eq => self.eval_in(left, row, bound)? == self.eval_in(right, row, bound)?,
                    BinaryOp::Ne => self.eval_in(left, row, bound)? != self.eval_in(right, row, bound)?,
                };
                Ok(Value::Bool(result))
            }
            Expr::Not(inner) => Ok(Value::Bool(!as_bool(self.eval_in(inner, row, bound)?)?)),
            Expr::Functions => Err(LikeError::eval("the functions marker has no value")),
            Expr::NotTranslated => Err(LikeError::eval("expression was not translated")),
        }
    }

    fn eval_call(&self, call: &MethodCall, row: &Row, bound: Option<&str>) -> LikeResult<Value> {
        match call.kind() {
            CallKind::InMemoryLike => {
                let args = call
                    .args()
                    .iter()
                    .map(|a| self.eval_in(a, row, bound))
                    .collect::<LikeResult<Vec<_>>>()?;
                let [subject, pattern, escape] = args.as_slice() else {
                    return Err(LikeError::eval(format!(
                        "like_match takes 3 arguments, got {}",
                        args.len()
                    )));
                };
                let matched = like_match_with(
                    &self.options,
                    as_opt_str(subject)?,
                    as_opt_str(pattern)?,
                    as_opt_str(escape)?,
                )?;
                Ok(Value::Bool(matched))
            }
            CallKind::Like | CallKind::LikeWithEscape => {
                Err(LikeError::ClientEvaluation(call.method().to_string()))
            }
            CallKind::Other => Err(LikeError::eval(format!(
                "no in-memory implementation for '{}'",
                call.method()
            ))),
        }
    }
}

fn as_bool(value: Value) -> LikeResult<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(LikeError::eval(format!(
            "expected a bool, got {}",
            other.type_name()
        ))),
    }
}

fn as_opt_str(value: &Value) -> LikeResult<Option<&str>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(LikeError::eval(format!(
            "like_match expects string arguments, got {}",
            other.type_name()
        ))),
    }
}

/// An in-memory row set that can be filtered with predicate trees.
#[derive(Debug, Clone, Default)]
pub struct MemorySet {
    rows: Vec<Row>,
    evaluator: Evaluator,
    on_timeout: OnTimeout,
}

impl MemorySet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn with_config(rows: Vec<Row>, config: &Config) -> Self {
        Self::new(rows)
            .with_options(config.match_options())
            .on_timeout(config.engine.on_timeout)
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.evaluator = Evaluator::new(options);
        self
    }

    pub fn on_timeout(mut self, policy: OnTimeout) -> Self {
        self.on_timeout = policy;
        self
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rewrite `predicate` and return the rows it accepts.
    pub fn filter(&self, predicate: &Expr) -> LikeResult<Vec<&Row>> {
        let predicate = translate_call(predicate);
        let mut matched = Vec::new();

        for (index, row) in self.rows.iter().enumerate() {
            match self.evaluator.test(&predicate, row) {
                Ok(true) => matched.push(row),
                Ok(false) => {}
                Err(e) if e.is_timeout() && self.on_timeout == OnTimeout::SkipRow => {
                    warn!(row = index, error = %e, "skipping row after LIKE timeout");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(matched)
    }

    /// Parse a predicate in expression notation and filter with it.
    pub fn query(&self, predicate: &str) -> LikeResult<Vec<&Row>> {
        self.filter(&parser::parse_expr(predicate)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::LIKE;
    use std::time::Duration;

    fn people() -> MemorySet {
        MemorySet::new(vec![
            row([("name", Value::from("Alice")), ("tag", Value::from("a_1"))]),
            row([("name", Value::from("alfred")), ("tag", Value::from("ax1"))]),
            row([("name", Value::from("Bob")), ("tag", Value::Null)]),
        ])
    }

    fn names(rows: &[&Row]) -> Vec<String> {
        rows.iter()
            .map(|r| match &r["name"] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_filter_rewrites_like() {
        let set = people();
        let rows = set.query("|p| like(functions, p.name, 'AL%')").unwrap();
        assert_eq!(names(&rows), vec!["Alice", "alfred"]);
    }

    #[test]
    fn test_filter_with_escape() {
        let set = people();
        let rows = set.query(r"|p| like(functions, p.tag, 'a\_1', '\')").unwrap();
        assert_eq!(names(&rows), vec!["Alice"]);
    }

    #[test]
    fn test_null_field_does_not_match() {
        let set = people();
        let rows = set.query("|p| like(functions, p.tag, '%')").unwrap();
        assert_eq!(rows.len(), 2);
        let rows = set.query("|p| !like(functions, p.tag, '%')").unwrap();
        assert_eq!(names(&rows), vec!["Bob"]);
    }

    #[test]
    fn test_combined_predicate() {
        let set = people();
        let rows = set
            .query("|p| like(functions, p.name, 'a%') && p.tag != 'ax1' || p.name == 'Bob'")
            .unwrap();
        assert_eq!(names(&rows), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_provider_call_needs_rewrite() {
        let predicate = Expr::lambda(
            vec!["p".to_string()],
            Expr::call(
                LIKE,
                None,
                vec![
                    Expr::Functions,
                    Expr::member(Expr::param("p"), "name"),
                    Expr::constant("a%"),
                ],
            ),
        );
        let err = Evaluator::default()
            .test(&predicate, &row([("name", "abc")]))
            .unwrap_err();
        assert!(matches!(err, LikeError::ClientEvaluation(_)));
    }

    #[test]
    fn test_non_string_argument_rejected() {
        let set = MemorySet::new(vec![row([("age", 42)])]);
        let err = set.query("|p| like(functions, p.age, '4%')").unwrap_err();
        assert!(matches!(err, LikeError::Evaluation(_)));
    }

    #[test]
    fn test_not_translated_rejected() {
        let set = people();
        assert!(set.filter(&Expr::NotTranslated).is_err());
    }

    fn impatient(rows: Vec<Row>, policy: OnTimeout) -> MemorySet {
        MemorySet::new(rows)
            .with_options(MatchOptions::default().with_timeout(Duration::from_nanos(1)))
            .on_timeout(policy)
    }

    #[test]
    fn test_with_config() {
        let config = Config::from_toml("[matcher]\ntimeout_ms = 5\n[engine]\non_timeout = \"skip_row\"")
            .unwrap();
        let set = MemorySet::with_config(vec![], &config);
        assert_eq!(set.on_timeout, OnTimeout::SkipRow);
        assert_eq!(set.evaluator.options.timeout, Duration::from_millis(5));
    }

    #[test]
    fn test_timeout_aborts_by_default() {
        let big = "xy".repeat(200_000);
        let set = impatient(vec![row([("name", big.as_str())])], OnTimeout::default());

        let err = set.query("|p| like(functions, p.name, '%x_%y_%z')").unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_timeout_skips_row_when_configured() {
        let big = "xy".repeat(200_000);
        let set = impatient(
            vec![row([("name", big.as_str())]), row([("name", "abc")])],
            OnTimeout::SkipRow,
        );

        // Every regex evaluation times out; exact matches still short-circuit.
        let rows = set
            .query("|p| like(functions, p.name, 'ABC') || like(functions, p.name, '%z')")
            .unwrap();
        assert_eq!(names(&rows), vec!["abc"]);
    }
}
