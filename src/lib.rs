//! # querylike — SQL `LIKE` for in-memory query trees
//!
//! Query providers usually hand `LIKE` predicates to the database. When the
//! same query runs against an in-memory mock, the provider's `like` call has
//! no implementation. querylike rewrites those calls onto a regex-backed
//! emulation with the same wildcard and escape rules.
//!
//! ## Quick Example
//!
//! ```
//! use querylike::prelude::*;
//!
//! let predicate = parse_expr(r"|p| like(functions, p.name, 'a\_%', '\')").unwrap();
//! let rewritten = translate_call(&predicate);
//! assert_eq!(rewritten.to_string(), r"|p| like_match(p.name, 'a\_%', '\')");
//!
//! assert!(like_match(Some("a_b"), Some(r"a\_%"), Some(r"\")).unwrap());
//! ```
//!
//! ## Pattern Syntax
//!
//! | Symbol  | Meaning                          |
//! |---------|----------------------------------|
//! | `_`     | Any single character             |
//! | `%`     | Any run of characters, or none   |
//! | escape  | Next `_` or `%` is literal       |

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod pattern;
pub mod rewriter;
pub mod transpiler;

pub use pattern::like_match;
pub use rewriter::{NOT_TRANSLATED, is_translation_failure, translate_call};

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::{Config, OnTimeout};
    pub use crate::engine::{Evaluator, MemorySet, Row, row};
    pub use crate::error::*;
    pub use crate::parser::parse_expr;
    pub use crate::pattern::{MatchOptions, like_match, like_match_with, like_to_regex};
    pub use crate::rewriter::{
        ExprVisitor, LikeRewriter, NOT_TRANSLATED, is_translation_failure, translate_call,
    };
    pub use crate::transpiler::ToSql;
}

/// Parse an expression in the textual notation.
///
/// # Example
///
/// ```
/// use querylike::parse;
///
/// let expr = parse("|p| like(functions, p.name, 'A%')").unwrap();
/// assert_eq!(expr.to_string(), "|p| like(functions, p.name, 'A%')");
/// ```
pub fn parse(input: &str) -> Result<ast::Expr, error::LikeError> {
    parser::parse_expr(input)
}
