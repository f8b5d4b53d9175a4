//! Expression notation parser using nom.
//!
//! Builds [`Expr`] trees from a compact, Rust-flavoured notation.
//!
//! # Syntax Overview
//!
//! ```text
//! |p| like(functions, p.name, 'a\_%', '\') && !(p.active == false)
//! ─┬─ ────────────────────┬──────────────── ─┬ ─────────┬─────────
//!  │                      │                  │          │
//!  │                      │                  │          └── Comparison (== / !=)
//!  │                      │                  └── Logical ops (! / && / ||)
//!  │                      └── Static call; `like` with 3 or 4 args is the provider LIKE
//!  └── Lambda parameters
//! ```
//!
//! Literals: `'text'` (embed a quote as `''`), `42`, `1.5`, `true`, `false`,
//! `null`. The identifiers `functions` and `not_translated` produce the
//! functions marker and the not-translated sentinel.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, opt, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::ast::*;
use crate::error::{LikeError, LikeResult};

/// Parse a complete expression.
pub fn parse_expr(input: &str) -> LikeResult<Expr> {
    let input = input.trim();

    match expression(input) {
        Ok((remaining, expr)) if remaining.trim().is_empty() => Ok(expr),
        Ok((remaining, _)) => Err(LikeError::parse(
            input.len() - remaining.len(),
            format!("Unexpected trailing content: '{}'", remaining.trim()),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(LikeError::parse(
            input.len() - e.input.len(),
            format!("Parse failed: {:?}", e.code),
        )),
        Err(nom::Err::Incomplete(_)) => Err(LikeError::parse(input.len(), "Incomplete input")),
    }
}

/// Map a call name and arity onto a known signature.
fn resolve_method(name: &str, arity: usize) -> Method {
    match (name, arity) {
        ("like", 3) => LIKE,
        ("like", 4) => LIKE_WITH_ESCAPE,
        ("like_match", 3) => IN_MEMORY_LIKE,
        _ => Method::untyped(name, arity),
    }
}

/// Wrap a parser with optional surrounding whitespace.
fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

fn expression(input: &str) -> IResult<&str, Expr> {
    alt((lambda, or_expr))(input)
}

/// Parse a lambda `|a, b| body`.
fn lambda(input: &str) -> IResult<&str, Expr> {
    let (input, _) = ws(char('|'))(input)?;
    let (input, params) = separated_list0(ws(char(',')), identifier)(input)?;
    let (input, _) = ws(char('|'))(input)?;
    let (input, body) = expression(input)?;

    Ok((
        input,
        Expr::lambda(params.into_iter().map(String::from).collect(), body),
    ))
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(ws(tag("||")), and_expr))(input)?;
    Ok((input, rest.into_iter().fold(first, Expr::or)))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = comparison(input)?;
    let (input, rest) = many0(preceded(ws(tag("&&")), comparison))(input)?;
    Ok((input, rest.into_iter().fold(first, Expr::and)))
}

fn comparison(input: &str) -> IResult<&str, Expr> {
    let (input, left) = unary(input)?;
    let (input, rhs) = opt(pair(
        ws(alt((
            value(BinaryOp::Eq, tag("==")),
            value(BinaryOp::Ne, tag("!=")),
        ))),
        unary,
    ))(input)?;

    let expr = match rhs {
        Some((op, right)) => Expr::binary(left, op, right),
        None => left,
    };
    Ok((input, expr))
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((map(preceded(ws(char('!')), unary), Expr::negate), postfix))(input)
}

/// Parse member accesses and instance calls chained onto a primary.
fn postfix(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut expr) = primary(input)?;

    loop {
        let (rest, dot) = opt(preceded(multispace0, char('.')))(input)?;
        if dot.is_none() {
            return Ok((input, expr));
        }
        let (rest, name) = preceded(multispace0, identifier)(rest)?;
        let (rest, args) = opt(call_args)(rest)?;

        expr = match args {
            Some(args) => Expr::call(Method::untyped(name, args.len()), Some(expr), args),
            None => Expr::member(expr, name),
        };
        input = rest;
    }
}

fn primary(input: &str) -> IResult<&str, Expr> {
    preceded(
        multispace0,
        alt((
            delimited(char('('), expression, ws(char(')'))),
            string_literal,
            number,
            name_or_call,
        )),
    )(input)
}

fn call_args(input: &str) -> IResult<&str, Vec<Expr>> {
    delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), expression),
        ws(char(')')),
    )(input)
}

/// Parse a keyword, a parameter reference or a static call.
fn name_or_call(input: &str) -> IResult<&str, Expr> {
    let (input, name) = identifier(input)?;
    let (input, args) = opt(call_args)(input)?;

    let expr = match (name, args) {
        (name, Some(args)) => Expr::call(resolve_method(name, args.len()), None, args),
        ("functions", None) => Expr::Functions,
        ("not_translated", None) => Expr::NotTranslated,
        ("null", None) => Expr::Constant(Value::Null),
        ("true", None) => Expr::constant(true),
        ("false", None) => Expr::constant(false),
        (name, None) => Expr::param(name),
    };
    Ok((input, expr))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

/// Parse a number (integer or float).
fn number(input: &str) -> IResult<&str, Expr> {
    alt((
        map_res(
            recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
            |s: &str| s.parse::<f64>().map(Expr::constant),
        ),
        map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
            s.parse::<i64>().map(Expr::constant)
        }),
    ))(input)
}

/// Parse a quoted string; `''` embeds a single quote.
fn string_literal(input: &str) -> IResult<&str, Expr> {
    let (input, _) = char('\'')(input)?;
    let (input, parts) = many0(alt((
        take_while1(|c: char| c != '\''),
        value("'", tag("''")),
    )))(input)?;
    let (input, _) = char('\'')(input)?;

    Ok((input, Expr::constant(parts.concat())))
}
