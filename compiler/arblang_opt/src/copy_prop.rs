//! Copy propagation (§4.6).
//!
//! Walks a declaration's expression with a map from `let`-bound names to the
//! expression they're bound to, populated only when that expression is a
//! bare argument reference or an object literal (the two shapes cheap enough
//! to duplicate at every use site). Every reference to the name is replaced
//! with the mapped expression; the originating `let` is left in place for
//! dead-code elimination to remove if it becomes unreferenced.

use rustc_hash::FxHashMap;

use arblang_ir::{Expr, ExprKind, Name, RExpr};

pub fn propagate(expr: &RExpr) -> (RExpr, bool) {
    let mut changed = false;
    let mut map: FxHashMap<Name, RExpr> = FxHashMap::default();
    let result = walk(expr, &mut map, &mut changed);
    (result, changed)
}

fn walk(expr: &RExpr, map: &mut FxHashMap<Name, RExpr>, changed: &mut bool) -> RExpr {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) => expr.clone(),

        ExprKind::Argument(name) => match map.get(name) {
            Some(replacement) => {
                *changed = true;
                replacement.clone()
            }
            None => expr.clone(),
        },

        ExprKind::Variable(name, value) => {
            let v = walk(value, map, changed);
            Expr::variable(name.clone(), v, expr.span)
        }

        ExprKind::Object(fields) => {
            let new_fields = fields.iter().map(|f| walk(f, map, changed)).collect();
            Expr::object(new_fields, expr.ty.clone(), expr.span)
        }

        ExprKind::FieldAccess(object, field) => {
            let obj = walk(object, map, changed);
            Expr::field_access(obj, field.clone(), expr.ty.clone(), expr.span)
        }

        ExprKind::Let(identifier, body) => {
            let ExprKind::Variable(name, value) = &identifier.kind else {
                unreachable!("a let's identifier is always a Variable")
            };
            let new_value = walk(value, map, changed);
            let is_copy = matches!(new_value.kind, ExprKind::Argument(_) | ExprKind::Object(_));
            if is_copy {
                map.insert(name.clone(), new_value.clone());
            }
            let new_identifier = Expr::variable(name.clone(), new_value, identifier.span);
            let new_body = walk(body, map, changed);
            if is_copy {
                map.remove(name);
            }
            Expr::let_(new_identifier, new_body, expr.span)
        }

        ExprKind::Conditional(cond, if_true, if_false) => {
            let c = walk(cond, map, changed);
            let t = walk(if_true, map, changed);
            let f = walk(if_false, map, changed);
            Expr::conditional(c, t, f, expr.span)
        }

        ExprKind::Unary(op, arg) => {
            let a = walk(arg, map, changed);
            Expr::unary(*op, a, expr.ty.clone(), expr.span)
        }

        ExprKind::Binary(op, lhs, rhs) => {
            let l = walk(lhs, map, changed);
            let r = walk(rhs, map, changed);
            Expr::binary(*op, l, r, expr.ty.clone(), expr.span)
        }

        ExprKind::Call(name, args) => {
            let new_args = args.iter().map(|a| walk(a, map, changed)).collect();
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
    fn a_copy_of_an_argument_is_substituted_at_its_use() {
        // let y = x; y + 1
        let x = Expr::argument(Name::new("x"), real(), Span::DUMMY);
        let y = Expr::variable(Name::new("y"), x, Span::DUMMY);
        let use_y = Expr::argument(Name::new("y"), real(), Span::DUMMY);
        let one = Expr::int(1, real(), Span::DUMMY);
        let body = Expr::binary(BinaryOp::Add, use_y, one, real(), Span::DUMMY);
        let expr = Expr::let_(y, body, Span::DUMMY);

        let (result, changed) = propagate(&expr);
        assert!(changed);
        match &result.kind {
            ExprKind::Let(_, body) => match &body.kind {
                ExprKind::Binary(_, l, _) => assert!(matches!(&l.kind, ExprKind::Argument(n) if n.as_str() == "x")),
                _ => panic!("expected binary body"),
            },
            _ => panic!("expected let"),
        }
    }

    #[test]
    fn a_let_bound_to_a_compound_expression_is_not_propagated() {
        let a = Expr::argument(Name::new("a"), real(), Span::DUMMY);
        let b = Expr::argument(Name::new("b"), real(), Span::DUMMY);
        let sum = Expr::binary(BinaryOp::Add, a, b, real(), Span::DUMMY);
        let x = Expr::variable(Name::new("x"), sum, Span::DUMMY);
        let body = Expr::argument(Name::new("x"), real(), Span::DUMMY);
        let expr = Expr::let_(x, body, Span::DUMMY);

        let (_result, changed) = propagate(&expr);
        assert!(!changed);
    }
}
