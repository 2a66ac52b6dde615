//! Symbolic differentiation of resolved expressions (§4.10).
//!
//! Operates on post-optimization, post-inlining IR: by this stage every
//! `let`, `call`, `object`, and `conditional` node should already have been
//! flattened, inlined, or folded away, so none of those shapes are expected
//! to reach a differentiated subexpression. Their appearance here is treated
//! as an internal invariant violation rather than a user-facing
//! `NonDifferentiable`/`UnsupportedODE` error — grounded precisely on
//! `original_source/arblang/solver/symbolic_diff.cpp`, which throws the same
//! distinction (a dedicated "internal compiler error" per unexpected node
//! kind, versus the operator-unsupported cases below).

use arblang_diagnostic::{Error, Result};
use arblang_ir::{BinaryOp, Expr, ExprKind, Name, RExpr, Span, UnaryOp};

const PASS: &str = "arblang_solve::diff";

fn internal(message: impl Into<String>, span: Span) -> Error {
    Error::InternalInvariant {
        pass: PASS,
        message: message.into(),
        span,
    }
}

/// The symbolic partial derivative of `expr` with respect to `state`, or
/// (when `field` is given) with respect to `state.field`.
///
/// Rules (§4.10): the derivative of a literal is 0; of the argument `state`
/// itself (when no field is requested) is 1; of any other argument is 0.
pub fn sym_diff(expr: &RExpr, state: &Name, field: Option<&Name>) -> Result<RExpr> {
    let span = expr.span;
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) => Ok(Expr::int(0, expr.ty.clone(), span)),

        ExprKind::Argument(name) => {
            let one = field.is_none() && name == state;
            Ok(Expr::int(i64::from(one), expr.ty.clone(), span))
        }

        ExprKind::Variable(_, value) => sym_diff(value, state, field),

        ExprKind::FieldAccess(object, accessed) => {
            let Some(field) = field else {
                return Ok(Expr::int(0, expr.ty.clone(), span));
            };
            match &object.kind {
                ExprKind::Argument(name) => {
                    let one = name == state && accessed == field;
                    Ok(Expr::int(i64::from(one), expr.ty.clone(), span))
                }
                _ => Err(internal(
                    "expected a state argument before the field access",
                    span,
                )),
            }
        }

        ExprKind::Unary(op, arg) => sym_diff_unary(*op, arg, expr, state, field),
        ExprKind::Binary(op, lhs, rhs) => sym_diff_binary(*op, lhs, rhs, expr, state, field),

        ExprKind::Object(_) => Err(internal("unexpected record literal while differentiating", span)),
        ExprKind::Let(..) => Err(internal("unexpected let while differentiating", span)),
        ExprKind::Conditional(..) => Err(internal("unexpected conditional while differentiating", span)),
        ExprKind::Call(..) => Err(internal("unexpected call while differentiating", span)),
    }
}

fn sym_diff_unary(op: UnaryOp, arg: &RExpr, node: &RExpr, state: &Name, field: Option<&Name>) -> Result<RExpr> {
    let span = node.span;
    let ty = node.ty.clone();
    match op {
        UnaryOp::Exp => {
            let u_prime = sym_diff(arg, state, field)?;
            Ok(Expr::binary(BinaryOp::Mul, u_prime, node.clone(), ty, span))
        }
        UnaryOp::Log => {
            let u_prime = sym_diff(arg, state, field)?;
            Ok(Expr::binary(BinaryOp::Div, u_prime, arg.clone(), ty, span))
        }
        UnaryOp::Cos => {
            let u_prime = sym_diff(arg, state, field)?;
            let minus_u_prime = Expr::unary(UnaryOp::Neg, u_prime, ty.clone(), span);
            let sin_u = Expr::unary(UnaryOp::Sin, arg.clone(), ty.clone(), span);
            Ok(Expr::binary(BinaryOp::Mul, minus_u_prime, sin_u, ty, span))
        }
        UnaryOp::Sin => {
            let u_prime = sym_diff(arg, state, field)?;
            let cos_u = Expr::unary(UnaryOp::Cos, arg.clone(), ty.clone(), span);
            Ok(Expr::binary(BinaryOp::Mul, u_prime, cos_u, ty, span))
        }
        UnaryOp::Neg => {
            let u_prime = sym_diff(arg, state, field)?;
            Ok(Expr::unary(UnaryOp::Neg, u_prime, ty, span))
        }
        UnaryOp::Abs | UnaryOp::Exprelr | UnaryOp::Not => Err(Error::NonDifferentiable { span }),
    }
}

fn sym_diff_binary(
    op: BinaryOp,
    lhs: &RExpr,
    rhs: &RExpr,
    node: &RExpr,
    state: &Name,
    field: Option<&Name>,
) -> Result<RExpr> {
    let span = node.span;
    let ty = node.ty.clone();
    match op {
        BinaryOp::Add | BinaryOp::Sub => {
            let l = sym_diff(lhs, state, field)?;
            let r = sym_diff(rhs, state, field)?;
            Ok(Expr::binary(op, l, r, ty, span))
        }
        BinaryOp::Mul => {
            let u_prime_v = Expr::binary(BinaryOp::Mul, sym_diff(lhs, state, field)?, rhs.clone(), ty.clone(), span);
            let v_prime_u = Expr::binary(BinaryOp::Mul, lhs.clone(), sym_diff(rhs, state, field)?, ty.clone(), span);
            Ok(Expr::binary(BinaryOp::Add, u_prime_v, v_prime_u, ty, span))
        }
        BinaryOp::Div => {
            let u_prime_v = Expr::binary(BinaryOp::Mul, sym_diff(lhs, state, field)?, rhs.clone(), ty.clone(), span);
            let v_prime_u = Expr::binary(BinaryOp::Mul, lhs.clone(), sym_diff(rhs, state, field)?, ty.clone(), span);
            let numerator = Expr::binary(BinaryOp::Sub, u_prime_v, v_prime_u, ty.clone(), span);
            let denominator = Expr::binary(BinaryOp::Mul, rhs.clone(), rhs.clone(), ty.clone(), span);
            Ok(Expr::binary(BinaryOp::Div, numerator, denominator, ty, span))
        }
        _ => Err(Error::NonDifferentiable { span }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_ir::Type;

    fn real() -> Type {
        Type::real()
    }

    #[test]
    fn derivative_of_the_state_itself_is_one() {
        let s = Name::new("s");
        let arg = Expr::argument(s.clone(), real(), Span::DUMMY);
        let d = sym_diff(&arg, &s, None).unwrap();
        assert!(matches!(d.kind, ExprKind::IntLit(1)));
    }

    #[test]
    fn derivative_of_an_unrelated_argument_is_zero() {
        let s = Name::new("s");
        let other = Expr::argument(Name::new("x"), real(), Span::DUMMY);
        let d = sym_diff(&other, &s, None).unwrap();
        assert!(matches!(d.kind, ExprKind::IntLit(0)));
    }

    #[test]
    fn product_rule_builds_the_expected_shape() {
        let s = Name::new("s");
        let arg = Expr::argument(s.clone(), real(), Span::DUMMY);
        let two = Expr::float(2.0, real(), Span::DUMMY);
        let product = Expr::binary(BinaryOp::Mul, arg, two, real(), Span::DUMMY);
        let d = sym_diff(&product, &s, None).unwrap();
        match &d.kind {
            ExprKind::Binary(BinaryOp::Add, u_prime_v, v_prime_u) => {
                assert!(matches!(u_prime_v.kind, ExprKind::Binary(BinaryOp::Mul, ..)));
                assert!(matches!(v_prime_u.kind, ExprKind::Binary(BinaryOp::Mul, ..)));
            }
            other => panic!("expected a sum of two products, got {other:?}"),
        }
    }

    #[test]
    fn differentiating_a_call_is_an_internal_invariant() {
        let s = Name::new("s");
        let call = Expr::call(Name::new("f"), vec![], real(), Span::DUMMY);
        let err = sym_diff(&call, &s, None).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn abs_is_not_differentiable() {
        let s = Name::new("s");
        let arg = Expr::argument(s.clone(), real(), Span::DUMMY);
        let abs = Expr::unary(UnaryOp::Abs, arg, real(), Span::DUMMY);
        let err = sym_diff(&abs, &s, None).unwrap_err();
        assert!(matches!(err, Error::NonDifferentiable { .. }));
    }
}
