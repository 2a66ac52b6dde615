//! Common-subexpression elimination (§4.7).
//!
//! Walks a declaration keyed by structural value, not identity: on `let x =
//! e; body`, if `e` has already been bound to some earlier `y`, every
//! reference inside `body` that would otherwise repeat `e` reads `y` instead
//! and `x`'s own binding collapses to `y` directly. Structural hashing and
//! equality are shared with the copy propagator and dead-code eliminator's
//! need to compare subtrees (`arblang_ir::hash`), not duplicated here.

use std::collections::HashMap;

use arblang_ir::hash::StructuralKey;
use arblang_ir::{Expr, ExprKind, Name, RExpr};

pub fn eliminate(expr: &RExpr) -> (RExpr, bool) {
    let mut changed = false;
    let mut seen: HashMap<StructuralKey, Name> = HashMap::new();
    let mut aliases: HashMap<Name, Name> = HashMap::new();
    let result = walk(expr, &mut seen, &mut aliases, &mut changed);
    (result, changed)
}

fn resolve(name: &Name, aliases: &HashMap<Name, Name>) -> Name {
    match aliases.get(name) {
        Some(target) => resolve(target, aliases),
        None => name.clone(),
    }
}

fn walk(
    expr: &RExpr,
    seen: &mut HashMap<StructuralKey, Name>,
    aliases: &mut HashMap<Name, Name>,
    changed: &mut bool,
) -> RExpr {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) => expr.clone(),

        ExprKind::Argument(name) => {
            let canonical = resolve(name, aliases);
            if &canonical != name {
                *changed = true;
                Expr::argument(canonical, expr.ty.clone(), expr.span)
            } else {
                expr.clone()
            }
        }

        ExprKind::Variable(name, value) => {
            let v = walk(value, seen, aliases, changed);
            Expr::variable(name.clone(), v, expr.span)
        }

        ExprKind::Object(fields) => {
            let new_fields = fields.iter().map(|f| walk(f, seen, aliases, changed)).collect();
            Expr::object(new_fields, expr.ty.clone(), expr.span)
        }

        ExprKind::FieldAccess(object, field) => {
            let obj = walk(object, seen, aliases, changed);
            Expr::field_access(obj, field.clone(), expr.ty.clone(), expr.span)
        }

        ExprKind::Let(identifier, body) => {
            let ExprKind::Variable(name, value) = &identifier.kind else {
                unreachable!("a let's identifier is always a Variable")
            };
            let new_value = walk(value, seen, aliases, changed);
            let key = StructuralKey(new_value.clone());

            if let Some(earlier) = seen.get(&key).cloned() {
                *changed = true;
                aliases.insert(name.clone(), earlier);
                return walk(body, seen, aliases, changed);
            }

            seen.insert(key, name.clone());
            let new_identifier = Expr::variable(name.clone(), new_value, identifier.span);
            let new_body = walk(body, seen, aliases, changed);
            Expr::let_(new_identifier, new_body, expr.span)
        }

        ExprKind::Conditional(cond, if_true, if_false) => {
            let c = walk(cond, seen, aliases, changed);
            let t = walk(if_true, seen, aliases, changed);
            let f = walk(if_false, seen, aliases, changed);
            Expr::conditional(c, t, f, expr.span)
        }

        ExprKind::Unary(op, arg) => {
            let a = walk(arg, seen, aliases, changed);
            Expr::unary(*op, a, expr.ty.clone(), expr.span)
        }

        ExprKind::Binary(op, lhs, rhs) => {
            let l = walk(lhs, seen, aliases, changed);
            let r = walk(rhs, seen, aliases, changed);
            Expr::binary(*op, l, r, expr.ty.clone(), expr.span)
        }

        ExprKind::Call(name, args) => {
            let new_args = args.iter().map(|a| walk(a, seen, aliases, changed)).collect();
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
    fn a_repeated_computation_is_redirected_to_the_first_binding() {
        // let x = a + b; let y = a + b; x + y
        let a = || Expr::argument(Name::new("a"), real(), Span::DUMMY);
        let b = || Expr::argument(Name::new("b"), real(), Span::DUMMY);
        let sum1 = Expr::binary(BinaryOp::Add, a(), b(), real(), Span::DUMMY);
        let sum2 = Expr::binary(BinaryOp::Add, a(), b(), real(), Span::DUMMY);
        let x = Expr::variable(Name::new("x"), sum1, Span::DUMMY);
        let y = Expr::variable(Name::new("y"), sum2, Span::DUMMY);
        let use_x = Expr::argument(Name::new("x"), real(), Span::DUMMY);
        let use_y = Expr::argument(Name::new("y"), real(), Span::DUMMY);
        let body = Expr::binary(BinaryOp::Add, use_x, use_y, real(), Span::DUMMY);
        let inner = Expr::let_(y, body, Span::DUMMY);
        let outer = Expr::let_(x, inner, Span::DUMMY);

        let (result, changed) = eliminate(&outer);
        assert!(changed);
        // The inner let collapses, so `y`'s uses resolve straight to `x`.
        let (bindings, final_body) = result.let_chain();
        assert_eq!(bindings.len(), 1);
        match &final_body.kind {
            ExprKind::Binary(_, l, r) => {
                assert!(matches!(&l.kind, ExprKind::Argument(n) if n == &bindings[0].0));
                assert!(matches!(&r.kind, ExprKind::Argument(n) if n == &bindings[0].0));
            }
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn distinct_subexpressions_are_left_alone() {
        let a = Expr::argument(Name::new("a"), real(), Span::DUMMY);
        let b = Expr::argument(Name::new("b"), real(), Span::DUMMY);
        let sum = Expr::binary(BinaryOp::Add, a, b, real(), Span::DUMMY);
        let (_result, changed) = eliminate(&sum);
        assert!(!changed);
    }
}
