//! A-normal form conversion (§4.2).
//!
//! Grounded on the teacher's `ori_canon` desugaring-pass structure: a pass is
//! a function walking the IR bottom-up, rebuilding only the nodes that
//! change. Here "change" means "this subexpression needed a name."
//!
//! The spec's algorithm ("recursively canonicalize children, splice
//! let-chains outward, wrap the reconstructed node in a fresh let") is
//! implemented as two mutually recursive halves:
//!
//! - [`normalize`] reduces `expr` to a `(bindings, value)` pair where `value`
//!   is already a *simple* shape (§3.3) built from leaf/field-access
//!   operands, but is not itself wrapped in a fresh `let` — the caller
//!   decides whether `value` needs a name.
//! - A compound subexpression gets a fresh name only when it appears as a
//!   bare operand of another node ([`normalize_to_leaf`]/[`ensure_leaf`]).
//!   When it is already the value of a source `let` or an object field, that
//!   existing name is reused directly instead of introducing a redundant
//!   copy — this is what makes canonicalization idempotent (§8): re-running
//!   it on already-canonical input finds every compound node already named
//!   and leaves the tree untouched.

use arblang_ir::{Expr, ExprKind, FreshNames, Name, RExpr};

/// Canonicalizes one top-level declaration's expression into A-normal form.
pub fn canonicalize(expr: &RExpr, fresh: &mut FreshNames) -> RExpr {
    let (bindings, result) = normalize(expr, fresh);
    Expr::rebuild_let_chain(bindings, result, expr.span)
}

/// Reduces `expr` to a flat list of bindings plus a final simple value,
/// without wrapping that value in a fresh `let` of its own.
fn normalize(expr: &RExpr, fresh: &mut FreshNames) -> (Vec<(Name, RExpr)>, RExpr) {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) | ExprKind::Argument(_) => (Vec::new(), expr.clone()),

        ExprKind::Variable(name, value) => {
            let (bindings, value_norm) = normalize(value, fresh);
            (bindings, Expr::variable(name.clone(), value_norm, expr.span))
        }

        ExprKind::Let(identifier, body) => {
            let ExprKind::Variable(name, value) = &identifier.kind else {
                unreachable!("a let's identifier is always a Variable")
            };
            let (mut bindings, value_norm) = normalize(value, fresh);
            bindings.push((name.clone(), value_norm));
            let (body_bindings, body_result) = normalize(body, fresh);
            bindings.extend(body_bindings);
            (bindings, body_result)
        }

        ExprKind::FieldAccess(object, field) => {
            let (mut bindings, object_norm) = normalize(object, fresh);
            let object_leaf = ensure_leaf(object_norm, fresh, &mut bindings);
            (bindings, Expr::field_access(object_leaf, field.clone(), expr.ty.clone(), expr.span))
        }

        ExprKind::Object(fields) => {
            let mut bindings = Vec::new();
            let mut new_fields = Vec::with_capacity(fields.len());
            for field in fields {
                let ExprKind::Variable(field_name, field_value) = &field.kind else {
                    unreachable!("an object's field is always a Variable")
                };
                let (field_bindings, field_norm) = normalize(field_value, fresh);
                bindings.extend(field_bindings);
                let field_leaf = ensure_leaf(field_norm, fresh, &mut bindings);
                new_fields.push(Expr::variable(field_name.clone(), field_leaf, field.span));
            }
            (bindings, Expr::object(new_fields, expr.ty.clone(), expr.span))
        }

        ExprKind::Conditional(cond, if_true, if_false) => {
            let mut bindings = Vec::new();
            let cond_leaf = normalize_to_leaf(cond, fresh, &mut bindings);
            let true_leaf = normalize_to_leaf(if_true, fresh, &mut bindings);
            let false_leaf = normalize_to_leaf(if_false, fresh, &mut bindings);
            (bindings, Expr::conditional(cond_leaf, true_leaf, false_leaf, expr.span))
        }

        ExprKind::Unary(op, arg) => {
            let mut bindings = Vec::new();
            let arg_leaf = normalize_to_leaf(arg, fresh, &mut bindings);
            (bindings, Expr::unary(*op, arg_leaf, expr.ty.clone(), expr.span))
        }

        ExprKind::Binary(op, lhs, rhs) => {
            let mut bindings = Vec::new();
            let lhs_leaf = normalize_to_leaf(lhs, fresh, &mut bindings);
            let rhs_leaf = normalize_to_leaf(rhs, fresh, &mut bindings);
            (bindings, Expr::binary(*op, lhs_leaf, rhs_leaf, expr.ty.clone(), expr.span))
        }

        ExprKind::Call(name, args) => {
            let mut bindings = Vec::new();
            let mut new_args = Vec::with_capacity(args.len());
            for arg in args {
                new_args.push(normalize_to_leaf(arg, fresh, &mut bindings));
            }
            (bindings, Expr::call(name.clone(), new_args, expr.ty.clone(), expr.span))
        }
    }
}

fn normalize_to_leaf(expr: &RExpr, fresh: &mut FreshNames, bindings: &mut Vec<(Name, RExpr)>) -> RExpr {
    let (child_bindings, norm) = normalize(expr, fresh);
    bindings.extend(child_bindings);
    ensure_leaf(norm, fresh, bindings)
}

/// Binds `norm` to a fresh name and returns an `Argument` reference, unless
/// `norm` is already a shape allowed as a non-`let` operand (a leaf, or a
/// field access over one — §3.3's "simple" shapes minus the ones that need a
/// name to be referenced at all).
fn ensure_leaf(norm: RExpr, fresh: &mut FreshNames, bindings: &mut Vec<(Name, RExpr)>) -> RExpr {
    match &norm.kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) | ExprKind::Argument(_) | ExprKind::FieldAccess(_, _) => norm,
        _ => {
            let name = fresh.fresh("t");
            let ty = norm.ty.clone();
            let span = norm.span;
            bindings.push((name.clone(), norm));
            Expr::argument(name, ty, span)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_ir::{BinaryOp, Span, Type};

    fn real() -> Type {
        Type::real()
    }

    #[test]
    fn flat_binary_gets_no_extra_wrap_when_already_named() {
        // let x = a + b; x
        let a = Expr::argument(Name::new("a"), real(), Span::DUMMY);
        let b = Expr::argument(Name::new("b"), real(), Span::DUMMY);
        let sum = Expr::binary(BinaryOp::Add, a, b, real(), Span::DUMMY);
        let x = Expr::variable(Name::new("x"), sum, Span::DUMMY);
        let body = Expr::argument(Name::new("x"), real(), Span::DUMMY);
        let expr = Expr::let_(x, body, Span::DUMMY);

        let mut fresh = FreshNames::new();
        let canon = canonicalize(&expr, &mut fresh);
        let (bindings, result) = canon.let_chain();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].0, Name::new("x"));
        assert!(matches!(result.kind, ExprKind::Argument(_)));
    }

    #[test]
    fn nested_unnamed_binary_gets_hoisted_into_a_fresh_let() {
        // (a + b) * c
        let a = Expr::argument(Name::new("a"), real(), Span::DUMMY);
        let b = Expr::argument(Name::new("b"), real(), Span::DUMMY);
        let c = Expr::argument(Name::new("c"), real(), Span::DUMMY);
        let sum = Expr::binary(BinaryOp::Add, a, b, real(), Span::DUMMY);
        let product = Expr::binary(BinaryOp::Mul, sum, c, real(), Span::DUMMY);

        let mut fresh = FreshNames::new();
        let canon = canonicalize(&product, &mut fresh);
        let (bindings, result) = canon.let_chain();
        assert_eq!(bindings.len(), 1);
        assert!(matches!(&bindings[0].1.kind, ExprKind::Binary(BinaryOp::Add, _, _)));
        assert!(matches!(&result.kind, ExprKind::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let a = Expr::argument(Name::new("a"), real(), Span::DUMMY);
        let b = Expr::argument(Name::new("b"), real(), Span::DUMMY);
        let c = Expr::argument(Name::new("c"), real(), Span::DUMMY);
        let sum = Expr::binary(BinaryOp::Add, a, b, real(), Span::DUMMY);
        let product = Expr::binary(BinaryOp::Mul, sum, c, real(), Span::DUMMY);

        let mut fresh = FreshNames::new();
        let once = canonicalize(&product, &mut fresh);

        let mut fresh2 = FreshNames::new();
        fresh2.reserve(Name::new("t_0"));
        let twice = canonicalize(&once, &mut fresh2);

        assert_eq!(format!("{once:?}"), format!("{twice:?}"));
    }

    #[test]
    fn object_fields_are_each_reduced_to_leaves() {
        let a = Expr::argument(Name::new("a"), real(), Span::DUMMY);
        let b = Expr::argument(Name::new("b"), real(), Span::DUMMY);
        let sum = Expr::binary(BinaryOp::Add, a, b, real(), Span::DUMMY);
        let field = Expr::variable(Name::new("f"), sum, Span::DUMMY);
        let ty = Type::record(vec![(Name::new("f"), real())]);
        let obj = Expr::object(vec![field], ty, Span::DUMMY);

        let mut fresh = FreshNames::new();
        let canon = canonicalize(&obj, &mut fresh);
        let (bindings, result) = canon.let_chain();
        assert_eq!(bindings.len(), 1);
        match &result.kind {
            ExprKind::Object(fields) => {
                assert!(matches!(fields[0].kind, ExprKind::Variable(_, _)));
                if let ExprKind::Variable(_, v) = &fields[0].kind {
                    assert!(matches!(v.kind, ExprKind::Argument(_)));
                }
            }
            _ => panic!("expected object"),
        }
    }
}
