//! Single-assignment renaming (§4.3).
//!
//! A pre-pass for the optimizer: walks a canonicalized declaration with a
//! reserved-name set (seeded with every global name) and a stack of
//! old-name → new-`Argument` overlays. When a `let` introduces a name
//! already reserved, a fresh name is generated and the old name is mapped
//! to the new `variable` for the remainder of that `let`'s body; since every
//! global is reserved up front, a local can never collide with one.

use arblang_ir::{Expr, ExprKind, FreshNames, Name, RExpr};

/// Renames one declaration's expression, threading `reserved` (shared across
/// every expression in the same group per §4.3 — parameters+initializations,
/// evolutions, effects, and on_events each share one reserved set).
pub fn rename(expr: &RExpr, reserved: &mut FreshNames) -> RExpr {
    let mut overlay: Vec<(Name, RExpr)> = Vec::new();
    rename_with(expr, reserved, &mut overlay)
}

fn lookup(overlay: &[(Name, RExpr)], name: &Name) -> Option<RExpr> {
    overlay.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v.clone())
}

fn rename_with(expr: &RExpr, reserved: &mut FreshNames, overlay: &mut Vec<(Name, RExpr)>) -> RExpr {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) => expr.clone(),

        ExprKind::Argument(name) => lookup(overlay, name).unwrap_or_else(|| expr.clone()),

        ExprKind::Variable(name, value) => {
            let new_value = rename_with(value, reserved, overlay);
            Expr::variable(name.clone(), new_value, expr.span)
        }

        ExprKind::Object(fields) => {
            let new_fields = fields
                .iter()
                .map(|f| {
                    let ExprKind::Variable(name, value) = &f.kind else {
                        unreachable!("object field is always a Variable")
                    };
                    let new_value = rename_with(value, reserved, overlay);
                    Expr::variable(name.clone(), new_value, f.span)
                })
                .collect();
            Expr::object(new_fields, expr.ty.clone(), expr.span)
        }

        ExprKind::FieldAccess(object, field) => {
            let new_object = rename_with(object, reserved, overlay);
            Expr::field_access(new_object, field.clone(), expr.ty.clone(), expr.span)
        }

        ExprKind::Let(identifier, body) => {
            let ExprKind::Variable(name, value) = &identifier.kind else {
                unreachable!("a let's identifier is always a Variable")
            };
            let new_value = rename_with(value, reserved, overlay);

            let (bound_name, pushed) = if reserved.is_reserved(name) {
                let fresh_name = reserved.fresh(name.as_str());
                let replacement = Expr::argument(fresh_name.clone(), new_value.ty.clone(), expr.span);
                overlay.push((name.clone(), replacement));
                (fresh_name, true)
            } else {
                reserved.reserve(name.clone());
                (name.clone(), false)
            };

            let new_identifier = Expr::variable(bound_name, new_value, identifier.span);
            let new_body = rename_with(body, reserved, overlay);
            if pushed {
                overlay.pop();
            }
            Expr::let_(new_identifier, new_body, expr.span)
        }

        ExprKind::Conditional(cond, if_true, if_false) => {
            let c = rename_with(cond, reserved, overlay);
            let t = rename_with(if_true, reserved, overlay);
            let f = rename_with(if_false, reserved, overlay);
            Expr::conditional(c, t, f, expr.span)
        }

        ExprKind::Unary(op, arg) => {
            let a = rename_with(arg, reserved, overlay);
            Expr::unary(*op, a, expr.ty.clone(), expr.span)
        }

        ExprKind::Binary(op, lhs, rhs) => {
            let l = rename_with(lhs, reserved, overlay);
            let r = rename_with(rhs, reserved, overlay);
            Expr::binary(*op, l, r, expr.ty.clone(), expr.span)
        }

        ExprKind::Call(name, args) => {
            let new_args = args.iter().map(|a| rename_with(a, reserved, overlay)).collect();
            Expr::call(name.clone(), new_args, expr.ty.clone(), expr.span)
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
    fn a_let_shadowing_a_reserved_global_gets_a_fresh_name() {
        let mut reserved = FreshNames::new();
        reserved.reserve(Name::new("v")); // a global `bind v = ...`

        let value = Expr::int(1, real(), Span::DUMMY);
        let shadow = Expr::variable(Name::new("v"), value, Span::DUMMY);
        let body = Expr::argument(Name::new("v"), real(), Span::DUMMY);
        let expr = Expr::let_(shadow, body, Span::DUMMY);

        let renamed = rename(&expr, &mut reserved);
        match &renamed.kind {
            ExprKind::Let(identifier, body) => {
                let ExprKind::Variable(name, _) = &identifier.kind else { panic!() };
                assert_ne!(name.as_str(), "v");
                match &body.kind {
                    ExprKind::Argument(n) => assert_eq!(n, name),
                    _ => panic!("expected argument reference to the renamed local"),
                }
            }
            _ => panic!("expected let"),
        }
    }

    #[test]
    fn a_fresh_local_name_is_left_untouched() {
        let mut reserved = FreshNames::new();
        let a = Expr::argument(Name::new("a"), real(), Span::DUMMY);
        let b = Expr::argument(Name::new("b"), real(), Span::DUMMY);
        let sum = Expr::binary(BinaryOp::Add, a, b, real(), Span::DUMMY);
        let x = Expr::variable(Name::new("x"), sum, Span::DUMMY);
        let body = Expr::argument(Name::new("x"), real(), Span::DUMMY);
        let expr = Expr::let_(x, body, Span::DUMMY);

        let renamed = rename(&expr, &mut reserved);
        match &renamed.kind {
            ExprKind::Let(identifier, _) => {
                let ExprKind::Variable(name, _) = &identifier.kind else { panic!() };
                assert_eq!(name.as_str(), "x");
            }
            _ => panic!("expected let"),
        }
    }

    #[test]
    fn shared_reserved_set_keeps_two_declarations_from_colliding() {
        let mut reserved = FreshNames::new();

        let a = Expr::let_(
            Expr::variable(Name::new("x"), Expr::int(1, real(), Span::DUMMY), Span::DUMMY),
            Expr::argument(Name::new("x"), real(), Span::DUMMY),
            Span::DUMMY,
        );
        let b = Expr::let_(
            Expr::variable(Name::new("x"), Expr::int(2, real(), Span::DUMMY), Span::DUMMY),
            Expr::argument(Name::new("x"), real(), Span::DUMMY),
            Span::DUMMY,
        );

        let renamed_a = rename(&a, &mut reserved);
        let renamed_b = rename(&b, &mut reserved);

        let name_of = |e: &RExpr| -> Name {
            match &e.kind {
                ExprKind::Let(identifier, _) => match &identifier.kind {
                    ExprKind::Variable(n, _) => n.clone(),
                    _ => panic!(),
                },
                _ => panic!(),
            }
        };
        assert_ne!(name_of(&renamed_a), name_of(&renamed_b));
    }
}
