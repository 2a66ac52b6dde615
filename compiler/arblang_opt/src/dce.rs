//! Dead-code elimination (§4.8).
//!
//! Per declaration: a first sweep collects every name actually referenced,
//! then subtracts that from the set of `let`-bound names to get the
//! candidates no longer read by anything; a second sweep drops each such
//! `let`, replacing it with its own body. At the mechanism level,
//! [`prune_globals`] extends the same idea to whole declarations: a
//! parameter, constant, state, or binding that nothing reads is removed,
//! except an exported parameter, which always survives.

use std::collections::HashSet;

use arblang_ir::{Expr, ExprKind, Export, Mechanism, Name, RExpr};

pub fn eliminate(expr: &RExpr) -> (RExpr, bool) {
    let mut referenced = HashSet::new();
    collect_referenced(expr, &mut referenced);
    let mut bound = HashSet::new();
    collect_let_names(expr, &mut bound);
    let dead: HashSet<Name> = bound.difference(&referenced).cloned().collect();

    if dead.is_empty() {
        return (expr.clone(), false);
    }
    let mut changed = false;
    let result = sweep(expr, &dead, &mut changed);
    (result, changed)
}

fn collect_referenced(expr: &RExpr, out: &mut HashSet<Name>) {
    if let ExprKind::Argument(name) = &expr.kind {
        out.insert(name.clone());
    }
    for child in expr.children() {
        collect_referenced(&child, out);
    }
}

pub(crate) fn collect_let_names(expr: &RExpr, out: &mut HashSet<Name>) {
    if let ExprKind::Let(identifier, _) = &expr.kind {
        if let ExprKind::Variable(name, _) = &identifier.kind {
            out.insert(name.clone());
        }
    }
    for child in expr.children() {
        collect_let_names(&child, out);
    }
}

fn sweep(expr: &RExpr, dead: &HashSet<Name>, changed: &mut bool) -> RExpr {
    match &expr.kind {
        ExprKind::Let(identifier, body) => {
            let ExprKind::Variable(name, value) = &identifier.kind else {
                unreachable!("a let's identifier is always a Variable")
            };
            if dead.contains(name) {
                *changed = true;
                return sweep(body, dead, changed);
            }
            let new_value = sweep(value, dead, changed);
            let new_identifier = Expr::variable(name.clone(), new_value, identifier.span);
            let new_body = sweep(body, dead, changed);
            Expr::let_(new_identifier, new_body, expr.span)
        }

        ExprKind::IntLit(_) | ExprKind::FloatLit(_) | ExprKind::Argument(_) => expr.clone(),

        ExprKind::Variable(name, value) => {
            let v = sweep(value, dead, changed);
            Expr::variable(name.clone(), v, expr.span)
        }

        ExprKind::Object(fields) => {
            let new_fields = fields.iter().map(|f| sweep(f, dead, changed)).collect();
            Expr::object(new_fields, expr.ty.clone(), expr.span)
        }

        ExprKind::FieldAccess(object, field) => {
            let obj = sweep(object, dead, changed);
            Expr::field_access(obj, field.clone(), expr.ty.clone(), expr.span)
        }

        ExprKind::Conditional(cond, if_true, if_false) => {
            let c = sweep(cond, dead, changed);
            let t = sweep(if_true, dead, changed);
            let f = sweep(if_false, dead, changed);
            Expr::conditional(c, t, f, expr.span)
        }

        ExprKind::Unary(op, arg) => {
            let a = sweep(arg, dead, changed);
            Expr::unary(*op, a, expr.ty.clone(), expr.span)
        }

        ExprKind::Binary(op, lhs, rhs) => {
            let l = sweep(lhs, dead, changed);
            let r = sweep(rhs, dead, changed);
            Expr::binary(*op, l, r, expr.ty.clone(), expr.span)
        }

        ExprKind::Call(name, args) => {
            let new_args = args.iter().map(|a| sweep(a, dead, changed)).collect();
            Expr::call(name.clone(), new_args, expr.ty.clone(), expr.span)
        }
    }
}

/// Removes mechanism-level globals nothing reads. Exported parameters are
/// always kept even when no expression references them directly, since the
/// export itself is the API hook that uses them.
pub fn prune_globals(mut mechanism: Mechanism) -> (Mechanism, bool) {
    let mut referenced: HashSet<Name> = HashSet::new();
    let mut note = |e: &RExpr| collect_referenced(e, &mut referenced);

    for c in &mechanism.constants {
        note(&c.value);
    }
    for p in &mechanism.parameters {
        note(&p.value);
    }
    for f in &mechanism.functions {
        note(&f.body);
    }
    for i in &mechanism.initializations {
        note(&i.value);
    }
    for e in &mechanism.evolutions {
        note(&e.value);
        note(&e.identifier);
    }
    for e in &mechanism.effects {
        note(&e.value);
    }
    for o in &mechanism.on_events {
        note(&o.value);
    }

    let exported: HashSet<Name> = mechanism
        .exports
        .iter()
        .filter_map(export_name)
        .collect();

    let mut changed = false;

    let before = mechanism.constants.len();
    mechanism.constants.retain(|c| referenced.contains(&c.name));
    changed |= mechanism.constants.len() != before;

    let before = mechanism.parameters.len();
    mechanism
        .parameters
        .retain(|p| referenced.contains(&p.name) || exported.contains(&p.name));
    changed |= mechanism.parameters.len() != before;

    let before = mechanism.states.len();
    mechanism
        .states
        .retain(|s| referenced.contains(&s.name) || referenced.contains(&s.name.with_prime()));
    changed |= mechanism.states.len() != before;

    let before = mechanism.bindings.len();
    mechanism.bindings.retain(|b| referenced.contains(&b.name));
    changed |= mechanism.bindings.len() != before;

    (mechanism, changed)
}

fn export_name(export: &Export) -> Option<Name> {
    match &export.identifier.kind {
        ExprKind::Argument(name) => Some(name.clone()),
        _ => None,
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
    fn an_unreferenced_let_is_removed() {
        // let dead = 1; x
        let one = Expr::int(1, real(), Span::DUMMY);
        let dead = Expr::variable(Name::new("dead"), one, Span::DUMMY);
        let body = Expr::argument(Name::new("x"), real(), Span::DUMMY);
        let expr = Expr::let_(dead, body, Span::DUMMY);

        let (result, changed) = eliminate(&expr);
        assert!(changed);
        assert!(matches!(result.kind, ExprKind::Argument(_)));
    }

    #[test]
    fn a_referenced_let_survives() {
        let one = Expr::int(1, real(), Span::DUMMY);
        let x = Expr::variable(Name::new("x"), one, Span::DUMMY);
        let use_x = Expr::argument(Name::new("x"), real(), Span::DUMMY);
        let body = Expr::binary(BinaryOp::Add, use_x, Expr::int(1, real(), Span::DUMMY), real(), Span::DUMMY);
        let expr = Expr::let_(x, body, Span::DUMMY);

        let (_result, changed) = eliminate(&expr);
        assert!(!changed);
    }
}
