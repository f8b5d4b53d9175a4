//! Rewrites provider `like` calls into calls to the in-memory matcher.
//!
//! ```text
//! like(functions, subject, pattern)          -> like_match(subject, pattern, null)
//! like(functions, subject, pattern, escape)  -> like_match(subject, pattern, escape)
//! ```
//!
//! Everything else is rebuilt node by node with its children rewritten, so
//! nested `like` calls are found wherever they sit in the tree.

use crate::ast::{Expr, IN_MEMORY_LIKE, MethodCall};

use tracing::{debug, trace};

/// Sentinel for a sub-expression a translation stage could not handle.
pub const NOT_TRANSLATED: Expr = Expr::NotTranslated;

/// Whether `translated` reports a failure to translate a present `original`.
pub fn is_translation_failure(original: Option<&Expr>, translated: Option<&Expr>) -> bool {
    original.is_some() && translated.is_some_and(Expr::is_not_translated)
}

/// Tree walker that rebuilds every node it visits.
///
/// The defaults copy the tree; implementors override the hooks they care
/// about and call [`walk_expr`] / [`walk_call`] for the rest.
pub trait ExprVisitor {
    fn visit(&mut self, expr: &Expr) -> Expr {
        walk_expr(self, expr)
    }

    fn visit_call(&mut self, call: &MethodCall) -> Expr {
        walk_call(self, call)
    }
}

pub fn walk_expr<V: ExprVisitor + ?Sized>(visitor: &mut V, expr: &Expr) -> Expr {
    match expr {
        Expr::Functions | Expr::Constant(_) | Expr::Parameter(_) | Expr::NotTranslated => {
            expr.clone()
        }
        Expr::Member { object, name } => Expr::member(visitor.visit(object), name.clone()),
        Expr::Call(call) => visitor.visit_call(call),
        Expr::Binary { left, op, right } => {
            Expr::binary(visitor.visit(left), *op, visitor.visit(right))
        }
        Expr::Not(inner) => visitor.visit(inner).negate(),
        Expr::Lambda { params, body } => Expr::lambda(params.clone(), visitor.visit(body)),
    }
}

/// Rebuild a call with the same target and rewritten receiver/arguments.
pub fn walk_call<V: ExprVisitor + ?Sized>(visitor: &mut V, call: &MethodCall) -> Expr {
    let object = call.object().map(|o| visitor.visit(o));
    let args = call.args().iter().map(|a| visitor.visit(a)).collect();
    Expr::call(call.method().clone(), object, args)
}

/// Redirects provider `like` calls to [`IN_MEMORY_LIKE`].
#[derive(Debug, Default)]
pub struct LikeRewriter {
    rewritten: usize,
}

impl LikeRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of provider calls replaced so far.
    pub fn rewritten(&self) -> usize {
        self.rewritten
    }
}

impl ExprVisitor for LikeRewriter {
    fn visit_call(&mut self, call: &MethodCall) -> Expr {
        if !call.kind().is_provider_like() {
            return walk_call(self, call);
        }

        // Slots: subject, pattern, escape. The functions marker is skipped.
        let mut args = [Expr::null_string(), Expr::null_string(), Expr::null_string()];
        for (slot, arg) in args.iter_mut().zip(call.args().iter().skip(1)) {
            *slot = self.visit(arg);
        }

        self.rewritten += 1;
        trace!(kind = ?call.kind(), "rewriting provider LIKE call");

        Expr::call(IN_MEMORY_LIKE, None, args.into())
    }
}

/// Rewrite every provider `like` call in `node`.
pub fn translate_call(node: &Expr) -> Expr {
    let mut rewriter = LikeRewriter::new();
    let rewritten = rewriter.visit(node);
    if rewriter.rewritten() > 0 {
        debug!(count = rewriter.rewritten(), "rewrote provider LIKE calls");
    }
    rewritten
}
