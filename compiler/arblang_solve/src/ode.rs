//! Exponential-Euler ODE linearization (§4.11, evolve-rewriting half).
//!
//! For each `evolve s' = f(s, …)`, the simulator integrates `s` forward one
//! time step using the linearized closed form
//! `s_{t+dt} = s·exp(a·dt) + (b/a)·(exp(a·dt) − 1)`, where `a = ∂f/∂s` and
//! `b = f(0, …)`. This module builds `a` and `b` (re-simplifying each with
//! the optimizer's passes, since substituting a literal zero or
//! differentiating typically exposes fresh constant-folding opportunities)
//! and assembles the closed form.
//!
//! `original_source/arblang/solver/solve_ode.cpp` computes exactly `a` and
//! `b` this way but then only prints them and returns the evolve unchanged —
//! the closed-form assembly below is not a translation of that stub but a
//! real implementation of the formula §4.11 states (see DESIGN.md's
//! Resolved Open Question 2).

use arblang_diagnostic::{Error, Result};
use arblang_ir::visitor::transform;
use arblang_ir::{BinaryOp, Evolve, Expr, ExprKind, Name, Quantity, RExpr, Span, Type, UnaryOp};

use crate::diff::sym_diff;

/// Re-runs the optimizer's four passes to a fixpoint over a single
/// expression. Duplicated from `arblang_opt::driver::converge_expr` (which is
/// private to that crate) rather than exposed across the crate boundary: the
/// solver only ever needs to re-simplify one freshly-built expression at a
/// time, not thread a mechanism-wide constant map, so the loop is a few lines
/// built directly from `arblang_opt`'s public per-pass functions.
pub(crate) fn simplify(expr: &RExpr) -> Result<RExpr> {
    let constants = arblang_opt::const_fold::ConstMap::default();
    let mut current = expr.clone();
    loop {
        let (folded, c1) = arblang_opt::const_fold::fold(&current, &constants)?;
        let (copied, c2) = arblang_opt::copy_prop::propagate(&folded);
        let (deduped, c3) = arblang_opt::cse::eliminate(&copied);
        let (sparse, c4) = arblang_opt::dce::eliminate(&deduped);
        current = sparse;
        if !(c1 || c2 || c3 || c4) {
            return Ok(current);
        }
    }
}

fn zero_value(ty: &Type, span: Span) -> RExpr {
    match ty {
        Type::Quantity(_) | Type::Boolean => Expr::int(0, ty.clone(), span),
        Type::Record(fields) => {
            let zeroed = fields
                .iter()
                .map(|(name, field_ty)| Expr::variable(name.clone(), zero_value(field_ty, span), span))
                .collect();
            Expr::object(zeroed, ty.clone(), span)
        }
    }
}

fn substitute_zero(expr: &RExpr, state: &Name, zero: &RExpr) -> RExpr {
    transform(expr, &mut |e| match &e.kind {
        ExprKind::Argument(name) if name == state => zero.clone(),
        _ => e,
    })
}

/// Combines two operand types the way the corresponding `BinaryOp` combines
/// their dimensions; falls back to the left operand's type for operators
/// that preserve it (`+`, `-`) or when either side isn't a quantity (the
/// solver never builds a non-quantity arithmetic node).
fn combine(op: BinaryOp, lhs: &Type, rhs: &Type) -> Type {
    match (op, lhs, rhs) {
        (BinaryOp::Mul, Type::Quantity(a), Type::Quantity(b)) => Type::Quantity((*a).mul(*b)),
        (BinaryOp::Div, Type::Quantity(a), Type::Quantity(b)) => Type::Quantity((*a).div(*b)),
        _ => lhs.clone(),
    }
}

fn depends_on(expr: &RExpr, state: &Name, field: Option<&Name>) -> bool {
    match &expr.kind {
        ExprKind::Argument(name) => field.is_none() && name == state,
        ExprKind::FieldAccess(object, accessed) => match (&object.kind, field) {
            (ExprKind::Argument(name), Some(f)) => name == state && accessed == f,
            _ => false,
        },
        _ => expr.children().iter().any(|c| depends_on(c, state, field)),
    }
}

/// Assembles `s·exp(a·dt) + (b/a)·(exp(a·dt) − 1)` for one scalar state (or
/// one field of a record state). `state_arg` is the expression standing for
/// `s` in the formula (an `Argument` for a scalar state, a `FieldAccess` for
/// a record field).
fn exponential_euler(
    state_arg: RExpr,
    a: &RExpr,
    b: &RExpr,
    dt: &Name,
    check_name: &Name,
    check_field: Option<&Name>,
    span: Span,
) -> Result<RExpr> {
    if depends_on(a, check_name, check_field) {
        return Err(Error::UnsupportedODE {
            state: check_name.as_str().to_string(),
            span,
        });
    }

    let dt_expr = Expr::argument(dt.clone(), Type::Quantity(Quantity::TIME), span);
    let a_dt_ty = combine(BinaryOp::Mul, &a.ty, &dt_expr.ty);
    let a_dt = Expr::binary(BinaryOp::Mul, a.clone(), dt_expr, a_dt_ty, span);
    let exp_a_dt = Expr::unary(UnaryOp::Exp, a_dt, Type::real(), span);

    let state_ty = state_arg.ty.clone();
    let term1 = Expr::binary(BinaryOp::Mul, state_arg, exp_a_dt.clone(), state_ty.clone(), span);

    let one = Expr::int(1, Type::real(), span);
    let exp_minus_1 = Expr::binary(BinaryOp::Sub, exp_a_dt, one, Type::real(), span);
    let b_over_a_ty = combine(BinaryOp::Div, &b.ty, &a.ty);
    let b_over_a = Expr::binary(BinaryOp::Div, b.clone(), a.clone(), b_over_a_ty, span);
    let term2 = Expr::binary(BinaryOp::Mul, b_over_a, exp_minus_1, state_ty.clone(), span);

    let sum = Expr::binary(BinaryOp::Add, term1, term2, state_ty, span);
    simplify(&sum)
}

/// Rewrites one `evolve` declaration into its exponential-Euler update,
/// using `state_ty` (the declared type of the state being evolved, found by
/// the caller via `Mechanism::states`) and `dt` (the name the solver bound
/// the simulator's time step under).
pub fn linearize_evolve(evolve: &Evolve, state_ty: &Type, dt: &Name) -> Result<Evolve> {
    let span = evolve.span;
    let state_name = match &evolve.identifier.kind {
        ExprKind::Argument(name) if name.is_primed() => name.without_prime(),
        _ => {
            return Err(Error::InternalInvariant {
                pass: "arblang_solve::ode",
                message: "evolve identifier is not a primed argument".into(),
                span,
            })
        }
    };

    let (_, body) = evolve.value.clone().let_chain();
    let zero = zero_value(state_ty, span);
    let zeroed = substitute_zero(&body, &state_name, &zero);
    let b = simplify(&zeroed)?;

    match state_ty {
        Type::Record(fields) => {
            let obj_fields = match &body.kind {
                ExprKind::Object(fs) => fs,
                _ => {
                    return Err(Error::InternalInvariant {
                        pass: "arblang_solve::ode",
                        message: "evolve result is not a record for a record-typed state".into(),
                        span,
                    })
                }
            };
            let b_fields = match &b.kind {
                ExprKind::Object(fs) => fs.clone(),
                _ => {
                    return Err(Error::InternalInvariant {
                        pass: "arblang_solve::ode",
                        message: "zero-substituted evolve result is not a record".into(),
                        span,
                    })
                }
            };

            let mut updated = Vec::with_capacity(obj_fields.len());
            for (field_expr, b_field) in obj_fields.iter().zip(b_fields.iter()) {
                let (field_name, field_value) = match &field_expr.kind {
                    ExprKind::Variable(name, value) if name.is_primed() => (name.clone(), value.clone()),
                    _ => {
                        return Err(Error::InternalInvariant {
                            pass: "arblang_solve::ode",
                            message: "expected a primed variable field in the evolve result".into(),
                            span,
                        })
                    }
                };
                let field = field_name.without_prime();
                let field_ty = fields
                    .iter()
                    .find(|(n, _)| *n == field)
                    .map_or_else(|| field_value.ty.clone(), |(_, t)| t.clone());

                let a_raw = sym_diff(&field_value, &state_name, Some(&field))?;
                let a = simplify(&a_raw)?;
                let b_value = match &b_field.kind {
                    ExprKind::Variable(_, value) => value.clone(),
                    _ => {
                        return Err(Error::InternalInvariant {
                            pass: "arblang_solve::ode",
                            message: "expected a variable field in the zero-substituted evolve result".into(),
                            span,
                        })
                    }
                };

                let state_arg = Expr::field_access(
                    Expr::argument(state_name.clone(), state_ty.clone(), span),
                    field.clone(),
                    field_ty,
                    span,
                );
                let updated_value =
                    exponential_euler(state_arg, &a, &b_value, dt, &state_name, Some(&field), span)?;
                updated.push(Expr::variable(field_name, updated_value, span));
            }

            Ok(Evolve {
                identifier: evolve.identifier.clone(),
                value: Expr::object(updated, state_ty.clone(), span),
                span,
            })
        }
        Type::Quantity(_) => {
            let a_raw = sym_diff(&body, &state_name, None)?;
            let a = simplify(&a_raw)?;
            let state_arg = Expr::argument(state_name.clone(), state_ty.clone(), span);
            let updated_value = exponential_euler(state_arg, &a, &b, dt, &state_name, None, span)?;
            Ok(Evolve {
                identifier: evolve.identifier.clone(),
                value: updated_value,
                span,
            })
        }
        Type::Boolean => Err(Error::InternalInvariant {
            pass: "arblang_solve::ode",
            message: "a boolean-typed state has no time derivative".into(),
            span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_ir::BinaryOp;

    fn volt() -> Type {
        Type::Quantity(Quantity::voltage())
    }

    #[test]
    fn a_scalar_exponential_decay_linearizes_without_error() {
        // evolve m' = -m / tau;
        let span = Span::DUMMY;
        let state_ty = volt();
        let m = Expr::argument(Name::new("m"), state_ty.clone(), span);
        let tau = Expr::argument(Name::new("tau"), Type::Quantity(Quantity::TIME), span);
        let neg_m = Expr::unary(UnaryOp::Neg, m, state_ty.clone(), span);
        let rhs = Expr::binary(BinaryOp::Div, neg_m, tau, state_ty.clone(), span);
        let evolve = Evolve {
            identifier: Expr::argument(Name::new("m'"), state_ty.clone(), span),
            value: rhs,
            span,
        };
        let dt = Name::new("dt");
        let result = linearize_evolve(&evolve, &state_ty, &dt).unwrap();
        assert!(matches!(result.value.kind, ExprKind::Binary(BinaryOp::Add, ..)));
    }

    #[test]
    fn a_nonlinear_dependency_on_the_state_is_rejected() {
        // evolve m' = m * m;
        let span = Span::DUMMY;
        let state_ty = volt();
        let m = Expr::argument(Name::new("m"), state_ty.clone(), span);
        let rhs = Expr::binary(BinaryOp::Mul, m.clone(), m, state_ty.clone(), span);
        let evolve = Evolve {
            identifier: Expr::argument(Name::new("m'"), state_ty.clone(), span),
            value: rhs,
            span,
        };
        let dt = Name::new("dt");
        let err = linearize_evolve(&evolve, &state_ty, &dt).unwrap_err();
        assert!(matches!(err, Error::UnsupportedODE { .. }));
    }
}
