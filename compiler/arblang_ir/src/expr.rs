//! Resolved IR expression nodes (§3.2).
//!
//! Expression trees are shared immutable values with reference-counted
//! sharing (§3.4): every transformation pass builds new `RExpr`s rather than
//! mutating in place, and a node uniquely owns its children except where a
//! pass has deliberately introduced sharing (e.g. CSE redirecting a `let` to
//! an earlier definition's variable).

use std::rc::Rc;

use crate::name::Name;
use crate::span::Span;
use crate::types::Type;

pub type RExpr = Rc<Expr>;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Exp,
    Log,
    Cos,
    Sin,
    Abs,
    /// `v / (log(v) - 1)`, the rate-correction function used by channel
    /// kinetics to avoid a removable singularity at `v == 0`.
    Exprelr,
    Not,
    Neg,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Min,
    Max,
    /// Carried over from the parsed-tree binary op set for completeness;
    /// the resolver always rewrites `lhs . field` into `ExprKind::FieldAccess`
    /// rather than constructing this variant (§4.1).
    Dot,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    /// A function parameter or a global (constant, parameter, state,
    /// binding) reference.
    Argument(Name),
    /// A named binding: used as the payload inside a `let`'s identifier and
    /// inside each slot of an `object`.
    Variable(Name, RExpr),
    Object(Vec<RExpr>),
    FieldAccess(RExpr, Name),
    /// `identifier` must be an `ExprKind::Variable`.
    Let(RExpr, RExpr),
    Conditional(RExpr, RExpr, RExpr),
    Unary(UnaryOp, RExpr),
    Binary(BinaryOp, RExpr, RExpr),
    Call(Name, Vec<RExpr>),
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type, span: Span) -> RExpr {
        Rc::new(Expr { kind, ty, span })
    }

    pub fn int(value: i64, ty: Type, span: Span) -> RExpr {
        Expr::new(ExprKind::IntLit(value), ty, span)
    }

    pub fn float(value: f64, ty: Type, span: Span) -> RExpr {
        Expr::new(ExprKind::FloatLit(value), ty, span)
    }

    pub fn argument(name: Name, ty: Type, span: Span) -> RExpr {
        Expr::new(ExprKind::Argument(name), ty, span)
    }

    pub fn variable(name: Name, value: RExpr, span: Span) -> RExpr {
        let ty = value.ty.clone();
        Expr::new(ExprKind::Variable(name, value), ty, span)
    }

    pub fn object(fields: Vec<RExpr>, ty: Type, span: Span) -> RExpr {
        Expr::new(ExprKind::Object(fields), ty, span)
    }

    pub fn field_access(object: RExpr, field: Name, ty: Type, span: Span) -> RExpr {
        Expr::new(ExprKind::FieldAccess(object, field), ty, span)
    }

    /// `identifier` must itself be an `ExprKind::Variable`; the let's type is
    /// the body's type.
    pub fn let_(identifier: RExpr, body: RExpr, span: Span) -> RExpr {
        let ty = body.ty.clone();
        Expr::new(ExprKind::Let(identifier, body), ty, span)
    }

    pub fn conditional(cond: RExpr, if_true: RExpr, if_false: RExpr, span: Span) -> RExpr {
        let ty = if_true.ty.clone();
        Expr::new(ExprKind::Conditional(cond, if_true, if_false), ty, span)
    }

    pub fn unary(op: UnaryOp, arg: RExpr, ty: Type, span: Span) -> RExpr {
        Expr::new(ExprKind::Unary(op, arg), ty, span)
    }

    pub fn binary(op: BinaryOp, lhs: RExpr, rhs: RExpr, ty: Type, span: Span) -> RExpr {
        Expr::new(ExprKind::Binary(op, lhs, rhs), ty, span)
    }

    pub fn call(name: Name, args: Vec<RExpr>, ty: Type, span: Span) -> RExpr {
        Expr::new(ExprKind::Call(name, args), ty, span)
    }

    /// If this expression is (or opens with) a `let`-chain, returns the
    /// identifier/value pairs outermost-first along with the innermost body.
    /// Used by canonicalization splicing and by the ODE solver/effect
    /// rewriter to peel a `let`-chain off an expression's result (§4.2, §4.11).
    pub fn let_chain(self: RExpr) -> (Vec<(Name, RExpr)>, RExpr) {
        let mut bindings = Vec::new();
        let mut cur = self.clone();
        loop {
            match &cur.kind {
                ExprKind::Let(identifier, body) => {
                    if let ExprKind::Variable(name, value) = &identifier.kind {
                        bindings.push((name.clone(), value.clone()));
                        cur = body.clone();
                        continue;
                    }
                    break;
                }
                _ => break,
            }
        }
        (bindings, cur)
    }

    /// Rebuilds a `let`-chain from `(name, value)` pairs (outermost first)
    /// wrapped around `body`, re-using the original spans is not possible
    /// once flattened, so callers pass the span to use for each new `let`.
    pub fn rebuild_let_chain(bindings: Vec<(Name, RExpr)>, body: RExpr, span: Span) -> RExpr {
        let mut result = body;
        for (name, value) in bindings.into_iter().rev() {
            let ty = value.ty.clone();
            let identifier = Expr::new(ExprKind::Variable(name, value), ty, span);
            result = Expr::let_(identifier, result, span);
        }
        result
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::IntLit(_) | ExprKind::FloatLit(_) | ExprKind::Argument(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Quantity;

    fn real() -> Type {
        Type::real()
    }

    #[test]
    fn let_chain_round_trips() {
        let a = Expr::argument(Name::new("a"), real(), Span::DUMMY);
        let x = Expr::variable(Name::new("x"), a.clone(), Span::DUMMY);
        let y_val = Expr::binary(BinaryOp::Add, Expr::argument(Name::new("x"), real(), Span::DUMMY), Expr::int(1, Type::Quantity(Quantity::REAL), Span::DUMMY), real(), Span::DUMMY);
        let y = Expr::variable(Name::new("y"), y_val, Span::DUMMY);
        let body = Expr::argument(Name::new("y"), real(), Span::DUMMY);
        let inner = Expr::let_(y, body, Span::DUMMY);
        let outer = Expr::let_(x, inner, Span::DUMMY);

        let (bindings, innermost) = outer.let_chain();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].0, Name::new("x"));
        assert_eq!(bindings[1].0, Name::new("y"));
        assert!(matches!(innermost.kind, ExprKind::Argument(_)));
    }
}
