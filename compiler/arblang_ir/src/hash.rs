//! Structural equality and hashing for expression subtrees.
//!
//! Two `RExpr`s with different addresses can still denote the same
//! computation; the optimizer's CSE pass (§4.4) needs to detect that. `Expr`
//! doesn't derive `PartialEq`/`Hash` directly because doing so would compare
//! spans (which should never affect identity) and because `Type` already has
//! its own hand-rolled, order-independent equality for records. `StructuralKey`
//! wraps an `RExpr` so it can be used as a `HashMap` key that sees through
//! both of those.

use std::hash::{Hash, Hasher};

use crate::expr::{Expr, ExprKind};
use crate::expr::RExpr;

#[derive(Clone)]
pub struct StructuralKey(pub RExpr);

impl PartialEq for StructuralKey {
    fn eq(&self, other: &Self) -> bool {
        structural_eq(&self.0, &other.0)
    }
}

impl Eq for StructuralKey {}

impl Hash for StructuralKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        structural_hash(&self.0, state);
    }
}

/// Structural equality, ignoring span: same shape, same operators, same
/// names, same types, same leaf values. Two CSE candidates with identical
/// structure but different subexpression identity (`Rc::ptr_eq` false) are
/// still equal here.
pub fn structural_eq(a: &RExpr, b: &RExpr) -> bool {
    if std::rc::Rc::ptr_eq(a, b) {
        return true;
    }
    if a.ty != b.ty {
        return false;
    }
    match (&a.kind, &b.kind) {
        (ExprKind::IntLit(x), ExprKind::IntLit(y)) => x == y,
        (ExprKind::FloatLit(x), ExprKind::FloatLit(y)) => x.to_bits() == y.to_bits(),
        (ExprKind::Argument(x), ExprKind::Argument(y)) => x == y,
        (ExprKind::Variable(nx, vx), ExprKind::Variable(ny, vy)) => nx == ny && structural_eq(vx, vy),
        (ExprKind::Object(xs), ExprKind::Object(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| structural_eq(x, y))
        }
        (ExprKind::FieldAccess(xo, xf), ExprKind::FieldAccess(yo, yf)) => xf == yf && structural_eq(xo, yo),
        (ExprKind::Let(xi, xb), ExprKind::Let(yi, yb)) => structural_eq(xi, yi) && structural_eq(xb, yb),
        (ExprKind::Conditional(xc, xt, xf), ExprKind::Conditional(yc, yt, yf)) => {
            structural_eq(xc, yc) && structural_eq(xt, yt) && structural_eq(xf, yf)
        }
        (ExprKind::Unary(xo, xa), ExprKind::Unary(yo, ya)) => xo == yo && structural_eq(xa, ya),
        (ExprKind::Binary(xo, xl, xr), ExprKind::Binary(yo, yl, yr)) => {
            xo == yo && structural_eq(xl, yl) && structural_eq(xr, yr)
        }
        (ExprKind::Call(xn, xa), ExprKind::Call(yn, ya)) => {
            xn == yn && xa.len() == ya.len() && xa.iter().zip(ya.iter()).all(|(x, y)| structural_eq(x, y))
        }
        _ => false,
    }
}

pub fn structural_hash<H: Hasher>(expr: &RExpr, state: &mut H) {
    std::mem::discriminant(&expr.kind).hash(state);
    match &expr.kind {
        ExprKind::IntLit(v) => v.hash(state),
        ExprKind::FloatLit(v) => v.to_bits().hash(state),
        ExprKind::Argument(n) => n.hash(state),
        ExprKind::Variable(n, v) => {
            n.hash(state);
            structural_hash(v, state);
        }
        ExprKind::Object(fields) => {
            fields.len().hash(state);
            for f in fields {
                structural_hash(f, state);
            }
        }
        ExprKind::FieldAccess(obj, field) => {
            field.hash(state);
            structural_hash(obj, state);
        }
        ExprKind::Let(identifier, body) => {
            structural_hash(identifier, state);
            structural_hash(body, state);
        }
        ExprKind::Conditional(c, t, f) => {
            structural_hash(c, state);
            structural_hash(t, state);
            structural_hash(f, state);
        }
        ExprKind::Unary(op, arg) => {
            op.hash(state);
            structural_hash(arg, state);
        }
        ExprKind::Binary(op, l, r) => {
            op.hash(state);
            structural_hash(l, state);
            structural_hash(r, state);
        }
        ExprKind::Call(name, args) => {
            name.hash(state);
            args.len().hash(state);
            for a in args {
                structural_hash(a, state);
            }
        }
    }
}

/// Whether `expr` is pure enough to be a CSE/copy-propagation candidate.
/// Every node in this IR is pure (no I/O, no mutation); the only thing CSE
/// must not merge across is an argument reference that could, in a future
/// extension, alias mutable simulator state. For now this always returns
/// true, but exists as a single seam for that invariant (§4.4's
/// "CSE never reorders side effects" note, which today is vacuously true).
pub fn is_cse_eligible(_expr: &Expr) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;
    use crate::span::Span;
    use crate::types::Type;

    #[test]
    fn structurally_equal_subtrees_from_different_allocations_are_equal() {
        let a = Expr::binary(
            crate::expr::BinaryOp::Add,
            Expr::int(1, Type::real(), Span::DUMMY),
            Expr::argument(Name::new("x"), Type::real(), Span::DUMMY),
            Type::real(),
            Span::new(0, 1),
        );
        let b = Expr::binary(
            crate::expr::BinaryOp::Add,
            Expr::int(1, Type::real(), Span::DUMMY),
            Expr::argument(Name::new("x"), Type::real(), Span::DUMMY),
            Type::real(),
            Span::new(5, 9),
        );
        assert!(structural_eq(&a, &b));
        let ka = StructuralKey(a);
        let kb = StructuralKey(b);
        assert_eq!(ka, kb);

        let mut set = std::collections::HashSet::new();
        set.insert(ka);
        assert!(set.contains(&kb));
    }

    #[test]
    fn different_operators_are_not_structurally_equal() {
        let a = Expr::binary(
            crate::expr::BinaryOp::Add,
            Expr::int(1, Type::real(), Span::DUMMY),
            Expr::int(2, Type::real(), Span::DUMMY),
            Type::real(),
            Span::DUMMY,
        );
        let b = Expr::binary(
            crate::expr::BinaryOp::Sub,
            Expr::int(1, Type::real(), Span::DUMMY),
            Expr::int(2, Type::real(), Span::DUMMY),
            Type::real(),
            Span::DUMMY,
        );
        assert!(!structural_eq(&a, &b));
    }
}
