//! Expression tree for query predicates.
//!
//! The tree mirrors what a query provider hands to an in-memory evaluator:
//! parameters, member accesses, method calls and a handful of operators.
//! Nodes are immutable; rewriting builds new trees.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A constant value carried by the tree or stored in a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Declared parameter type in a method signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    /// The provider's functions marker (receiver with no runtime data).
    Functions,
    String,
    Bool,
    Int,
    Float,
    Object,
}

/// A call target, identified by declaring type, name and parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Method {
    pub declaring_type: Cow<'static, str>,
    pub name: Cow<'static, str>,
    pub params: Cow<'static, [ParamType]>,
}

/// Provider pattern match: `like(functions, subject, pattern)`.
pub const LIKE: Method = Method {
    declaring_type: Cow::Borrowed("DbFunctionsExtensions"),
    name: Cow::Borrowed("like"),
    params: Cow::Borrowed(&[ParamType::Functions, ParamType::String, ParamType::String]),
};

/// Provider pattern match with escape: `like(functions, subject, pattern, escape)`.
pub const LIKE_WITH_ESCAPE: Method = Method {
    declaring_type: Cow::Borrowed("DbFunctionsExtensions"),
    name: Cow::Borrowed("like"),
    params: Cow::Borrowed(&[
        ParamType::Functions,
        ParamType::String,
        ParamType::String,
        ParamType::String,
    ]),
};

/// In-memory replacement target: `like_match(subject, pattern, escape)`.
pub const IN_MEMORY_LIKE: Method = Method {
    declaring_type: Cow::Borrowed("LikeEvaluator"),
    name: Cow::Borrowed("like_match"),
    params: Cow::Borrowed(&[ParamType::String, ParamType::String, ParamType::String]),
};

impl Method {
    /// A method with no declaring type and `Object` parameters.
    pub fn untyped(name: impl Into<String>, arity: usize) -> Self {
        Self {
            declaring_type: Cow::Borrowed(""),
            name: Cow::Owned(name.into()),
            params: Cow::Owned(vec![ParamType::Object; arity]),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.declaring_type.is_empty() {
            write!(f, "{}::", self.declaring_type)?;
        }
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", p)?;
        }
        write!(f, ")")
    }
}

/// Closed set of call shapes the rewriter and evaluator care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CallKind {
    /// Provider `like`, three arguments.
    Like,
    /// Provider `like`, four arguments.
    LikeWithEscape,
    /// The in-memory `like_match` target.
    InMemoryLike,
    Other,
}

impl CallKind {
    /// Classify a method by exact signature comparison.
    pub fn of(method: &Method) -> Self {
        if *method == LIKE {
            CallKind::Like
        } else if *method == LIKE_WITH_ESCAPE {
            CallKind::LikeWithEscape
        } else if *method == IN_MEMORY_LIKE {
            CallKind::InMemoryLike
        } else {
            CallKind::Other
        }
    }

    pub fn is_provider_like(self) -> bool {
        matches!(self, CallKind::Like | CallKind::LikeWithEscape)
    }
}

/// A method call node. The [`CallKind`] is fixed when the node is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodCall {
    method: Method,
    kind: CallKind,
    object: Option<Box<Expr>>,
    args: Vec<Expr>,
}

impl MethodCall {
    pub fn new(method: Method, object: Option<Expr>, args: Vec<Expr>) -> Self {
        let kind = CallKind::of(&method);
        Self {
            method,
            kind,
            object: object.map(Box::new),
            args,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    /// Receiver for instance calls; `None` for static calls.
    pub fn object(&self) -> Option<&Expr> {
        self.object.as_deref()
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }
}

/// Binary operators for predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::And => write!(f, "&&"),
            BinaryOp::Or => write!(f, "||"),
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::Ne => write!(f, "!="),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// The provider's functions marker (`EF.Functions` style receiver).
    Functions,
    Constant(Value),
    /// Reference to a lambda parameter.
    Parameter(String),
    /// Field access (`p.name`)
    Member { object: Box<Expr>, name: String },
    Call(MethodCall),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    Lambda { params: Vec<String>, body: Box<Expr> },
    /// Marker for a sub-expression a translation stage could not handle.
    NotTranslated,
}

impl Expr {
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    /// A null constant standing in for an absent string argument.
    pub fn null_string() -> Self {
        Expr::Constant(Value::Null)
    }

    pub fn param(name: impl Into<String>) -> Self {
        Expr::Parameter(name.into())
    }

    pub fn member(object: Expr, name: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            name: name.into(),
        }
    }

    pub fn call(method: Method, object: Option<Expr>, args: Vec<Expr>) -> Self {
        Expr::Call(MethodCall::new(method, object, args))
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn and(self, right: Expr) -> Self {
        Expr::binary(self, BinaryOp::And, right)
    }

    pub fn or(self, right: Expr) -> Self {
        Expr::binary(self, BinaryOp::Or, right)
    }

    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn lambda(params: Vec<String>, body: Expr) -> Self {
        Expr::Lambda {
            params,
            body: Box::new(body),
        }
    }

    pub fn is_not_translated(&self) -> bool {
        matches!(self, Expr::NotTranslated)
    }

    /// Whether any node in this tree calls `method`.
    pub fn references(&self, method: &Method) -> bool {
        match self {
            Expr::Functions | Expr::Constant(_) | Expr::Parameter(_) | Expr::NotTranslated => {
                false
            }
            Expr::Member { object, .. } => object.references(method),
            Expr::Call(call) => {
                call.method() == method
                    || call.object().is_some_and(|o| o.references(method))
                    || call.args().iter().any(|a| a.references(method))
            }
            Expr::Binary { left, right, .. } => left.references(method) || right.references(method),
            Expr::Not(inner) => inner.references(method),
            Expr::Lambda { body, .. } => body.references(method),
        }
    }
}

/// Renders the textual notation accepted by [`crate::parser::parse_expr`].
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Functions => write!(f, "functions"),
            Expr::Constant(v) => write!(f, "{}", v),
            Expr::Parameter(name) => write!(f, "{}", name),
            Expr::Member { object, name } => write!(f, "{}.{}", object, name),
            Expr::Call(call) => {
                if let Some(object) = call.object() {
                    write!(f, "{}.", object)?;
                }
                write!(f, "{}(", call.method().name)?;
                for (i, arg) in call.args().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Binary { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Not(inner) => write!(f, "!{}", inner),
            Expr::Lambda { params, body } => write!(f, "|{}| {}", params.join(", "), body),
            Expr::NotTranslated => write!(f, "not_translated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_kind_by_signature() {
        assert_eq!(CallKind::of(&LIKE), CallKind::Like);
        assert_eq!(CallKind::of(&LIKE_WITH_ESCAPE), CallKind::LikeWithEscape);
        assert_eq!(CallKind::of(&IN_MEMORY_LIKE), CallKind::InMemoryLike);
        // Same name, different arity.
        assert_eq!(CallKind::of(&Method::untyped("like", 2)), CallKind::Other);
    }

    #[test]
    fn test_kind_fixed_at_construction() {
        let call = MethodCall::new(LIKE, None, vec![Expr::Functions]);
        assert_eq!(call.kind(), CallKind::Like);
        assert!(call.kind().is_provider_like());
    }

    #[test]
    fn test_display_notation() {
        let expr = Expr::lambda(
            vec!["p".to_string()],
            Expr::call(
                LIKE,
                None,
                vec![
                    Expr::Functions,
                    Expr::member(Expr::param("p"), "name"),
                    Expr::constant("it's%"),
                ],
            )
            .and(Expr::constant(true).negate()),
        );
        assert_eq!(
            expr.to_string(),
            "|p| (like(functions, p.name, 'it''s%') && !true)"
        );
    }

    #[test]
    fn test_references() {
        let expr = Expr::call(
            Method::untyped("upper", 1),
            None,
            vec![Expr::call(LIKE, None, vec![Expr::Functions])],
        );
        assert!(expr.references(&LIKE));
        assert!(!expr.references(&IN_MEMORY_LIKE));
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<&str>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
    }
}
