//! Function inlining (§4.9).
//!
//! A single pass over the mechanism after which no `call` node remains.
//! Each call site's body is substituted in with its arguments bound to the
//! formals, alpha-renamed against a shared per-declaration reserved set so
//! inlining two calls to the same function (or a call nested inside another
//! inlined body) never lets one copy's locals capture another's. A function
//! is removed from the lookup table for the duration of its own expansion;
//! a call that resurfaces it — direct or mutual recursion — is reported as
//! `UndefinedFunction` rather than looping forever.

use std::collections::HashSet;

use rustc_hash::FxHashMap;

use arblang_diagnostic::{Error, Result};
use arblang_ir::{Expr, ExprKind, FreshNames, Function, Mechanism, Name, RExpr};

use crate::dce::collect_let_names;

type FunctionTable = FxHashMap<Name, Function>;

/// Inlines every call in `mechanism`, returning the rewritten mechanism and
/// whether any call site was expanded.
pub fn inline_mechanism(mut mechanism: Mechanism) -> Result<(Mechanism, bool)> {
    let table: FunctionTable = mechanism.functions.iter().map(|f| (f.name.clone(), f.clone())).collect();
    let mut any_changed = false;

    let globals = global_names(&mechanism);

    for c in &mut mechanism.constants {
        let (v, changed) = inline_decl(&c.value, &table, &globals)?;
        c.value = v;
        any_changed |= changed;
    }
    for p in &mut mechanism.parameters {
        let (v, changed) = inline_decl(&p.value, &table, &globals)?;
        p.value = v;
        any_changed |= changed;
    }
    for i in &mut mechanism.initializations {
        let (v, changed) = inline_decl(&i.value, &table, &globals)?;
        i.value = v;
        any_changed |= changed;
    }
    for e in &mut mechanism.evolutions {
        let (v, changed) = inline_decl(&e.value, &table, &globals)?;
        e.value = v;
        any_changed |= changed;
    }
    for e in &mut mechanism.effects {
        let (v, changed) = inline_decl(&e.value, &table, &globals)?;
        e.value = v;
        any_changed |= changed;
    }
    for o in &mut mechanism.on_events {
        let (v, changed) = inline_decl(&o.value, &table, &globals)?;
        o.value = v;
        any_changed |= changed;
    }

    Ok((mechanism, any_changed))
}

fn global_names(mechanism: &Mechanism) -> Vec<Name> {
    let mut names = Vec::new();
    for c in &mechanism.constants {
        names.push(c.name.clone());
    }
    for p in &mechanism.parameters {
        names.push(p.name.clone());
    }
    for s in &mechanism.states {
        names.push(s.name.clone());
        names.push(s.name.with_prime());
    }
    for b in &mechanism.bindings {
        names.push(b.name.clone());
    }
    names
}

fn inline_decl(expr: &RExpr, table: &FunctionTable, globals: &[Name]) -> Result<(RExpr, bool)> {
    let mut fresh = FreshNames::new();
    for name in globals {
        fresh.reserve(name.clone());
    }
    let mut local_names = HashSet::new();
    collect_let_names(expr, &mut local_names);
    for name in local_names {
        fresh.reserve(name);
    }

    let mut in_progress: HashSet<Name> = HashSet::new();
    let mut changed = false;
    let result = walk(expr, table, &mut in_progress, &mut fresh, &mut changed)?;
    Ok((result, changed))
}

fn walk(
    expr: &RExpr,
    table: &FunctionTable,
    in_progress: &mut HashSet<Name>,
    fresh: &mut FreshNames,
    changed: &mut bool,
) -> Result<RExpr> {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) | ExprKind::Argument(_) => Ok(expr.clone()),

        ExprKind::Variable(name, value) => {
            let v = walk(value, table, in_progress, fresh, changed)?;
            Ok(Expr::variable(name.clone(), v, expr.span))
        }

        ExprKind::Object(fields) => {
            let mut new_fields = Vec::with_capacity(fields.len());
            for f in fields {
                new_fields.push(walk(f, table, in_progress, fresh, changed)?);
            }
            Ok(Expr::object(new_fields, expr.ty.clone(), expr.span))
        }

        ExprKind::FieldAccess(object, field) => {
            let obj = walk(object, table, in_progress, fresh, changed)?;
            Ok(Expr::field_access(obj, field.clone(), expr.ty.clone(), expr.span))
        }

        ExprKind::Let(identifier, body) => {
            let ExprKind::Variable(name, value) = &identifier.kind else {
                unreachable!("a let's identifier is always a Variable")
            };
            let new_value = walk(value, table, in_progress, fresh, changed)?;
            let new_identifier = Expr::variable(name.clone(), new_value, identifier.span);
            let new_body = walk(body, table, in_progress, fresh, changed)?;
            Ok(Expr::let_(new_identifier, new_body, expr.span))
        }

        ExprKind::Conditional(cond, if_true, if_false) => {
            let c = walk(cond, table, in_progress, fresh, changed)?;
            let t = walk(if_true, table, in_progress, fresh, changed)?;
            let f = walk(if_false, table, in_progress, fresh, changed)?;
            Ok(Expr::conditional(c, t, f, expr.span))
        }

        ExprKind::Unary(op, arg) => {
            let a = walk(arg, table, in_progress, fresh, changed)?;
            Ok(Expr::unary(*op, a, expr.ty.clone(), expr.span))
        }

        ExprKind::Binary(op, lhs, rhs) => {
            let l = walk(lhs, table, in_progress, fresh, changed)?;
            let r = walk(rhs, table, in_progress, fresh, changed)?;
            Ok(Expr::binary(*op, l, r, expr.ty.clone(), expr.span))
        }

        ExprKind::Call(name, args) => {
            let mut new_args = Vec::with_capacity(args.len());
            for a in args {
                new_args.push(walk(a, table, in_progress, fresh, changed)?);
            }

            if in_progress.contains(name) || !table.contains_key(name) {
                return Err(Error::UndefinedFunction { name: name.as_str().to_owned(), span: expr.span });
            }
            let function = &table[name];

            let renamed_body = alpha_rename(&function.body, fresh);
            let substitution: FxHashMap<Name, RExpr> =
                function.args.iter().map(|a| a.name.clone()).zip(new_args).collect();
            let substituted = substitute(&renamed_body, &substitution);

            in_progress.insert(name.clone());
            let inlined = walk(&substituted, table, in_progress, fresh, changed)?;
            in_progress.remove(name);

            *changed = true;
            Ok(inlined)
        }
    }
}

/// Renames every `let`-bound name in `body` that collides with `reserved`
/// (or that it has already handed out) to a fresh one, so this copy of the
/// function body can never capture a caller-side binding of the same name.
fn alpha_rename(body: &RExpr, reserved: &mut FreshNames) -> RExpr {
    let mut overlay: Vec<(Name, RExpr)> = Vec::new();
    alpha_rename_with(body, reserved, &mut overlay)
}

fn alpha_rename_with(expr: &RExpr, reserved: &mut FreshNames, overlay: &mut Vec<(Name, RExpr)>) -> RExpr {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) => expr.clone(),

        ExprKind::Argument(name) => overlay
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| expr.clone()),

        ExprKind::Variable(name, value) => {
            let v = alpha_rename_with(value, reserved, overlay);
            Expr::variable(name.clone(), v, expr.span)
        }

        ExprKind::Object(fields) => {
            let new_fields = fields.iter().map(|f| alpha_rename_with(f, reserved, overlay)).collect();
            Expr::object(new_fields, expr.ty.clone(), expr.span)
        }

        ExprKind::FieldAccess(object, field) => {
            let obj = alpha_rename_with(object, reserved, overlay);
            Expr::field_access(obj, field.clone(), expr.ty.clone(), expr.span)
        }

        ExprKind::Let(identifier, body) => {
            let ExprKind::Variable(name, value) = &identifier.kind else {
                unreachable!("a let's identifier is always a Variable")
            };
            let new_value = alpha_rename_with(value, reserved, overlay);
            let fresh_name = reserved.fresh(name.as_str());
            let replacement = Expr::argument(fresh_name.clone(), new_value.ty.clone(), expr.span);
            overlay.push((name.clone(), replacement));
            let new_identifier = Expr::variable(fresh_name, new_value, identifier.span);
            let new_body = alpha_rename_with(body, reserved, overlay);
            overlay.pop();
            Expr::let_(new_identifier, new_body, expr.span)
        }

        ExprKind::Conditional(cond, if_true, if_false) => {
            let c = alpha_rename_with(cond, reserved, overlay);
            let t = alpha_rename_with(if_true, reserved, overlay);
            let f = alpha_rename_with(if_false, reserved, overlay);
            Expr::conditional(c, t, f, expr.span)
        }

        ExprKind::Unary(op, arg) => {
            let a = alpha_rename_with(arg, reserved, overlay);
            Expr::unary(*op, a, expr.ty.clone(), expr.span)
        }

        ExprKind::Binary(op, lhs, rhs) => {
            let l = alpha_rename_with(lhs, reserved, overlay);
            let r = alpha_rename_with(rhs, reserved, overlay);
            Expr::binary(*op, l, r, expr.ty.clone(), expr.span)
        }

        ExprKind::Call(name, args) => {
            let new_args = args.iter().map(|a| alpha_rename_with(a, reserved, overlay)).collect();
            Expr::call(name.clone(), new_args, expr.ty.clone(), expr.span)
        }
    }
}

/// Replaces every `Argument` naming a formal with the caller's argument
/// expression.
fn substitute(expr: &RExpr, subst: &FxHashMap<Name, RExpr>) -> RExpr {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) => expr.clone(),

        ExprKind::Argument(name) => subst.get(name).cloned().unwrap_or_else(|| expr.clone()),

        ExprKind::Variable(name, value) => {
            let v = substitute(value, subst);
            Expr::variable(name.clone(), v, expr.span)
        }

        ExprKind::Object(fields) => {
            let new_fields = fields.iter().map(|f| substitute(f, subst)).collect();
            Expr::object(new_fields, expr.ty.clone(), expr.span)
        }

        ExprKind::FieldAccess(object, field) => {
            let obj = substitute(object, subst);
            Expr::field_access(obj, field.clone(), expr.ty.clone(), expr.span)
        }

        ExprKind::Let(identifier, body) => {
            let ExprKind::Variable(name, value) = &identifier.kind else {
                unreachable!("a let's identifier is always a Variable")
            };
            let new_value = substitute(value, subst);
            let new_identifier = Expr::variable(name.clone(), new_value, identifier.span);
            let new_body = substitute(body, subst);
            Expr::let_(new_identifier, new_body, expr.span)
        }

        ExprKind::Conditional(cond, if_true, if_false) => {
            let c = substitute(cond, subst);
            let t = substitute(if_true, subst);
            let f = substitute(if_false, subst);
            Expr::conditional(c, t, f, expr.span)
        }

        ExprKind::Unary(op, arg) => {
            let a = substitute(arg, subst);
            Expr::unary(*op, a, expr.ty.clone(), expr.span)
        }

        ExprKind::Binary(op, lhs, rhs) => {
            let l = substitute(lhs, subst);
            let r = substitute(rhs, subst);
            Expr::binary(*op, l, r, expr.ty.clone(), expr.span)
        }

        ExprKind::Call(name, args) => {
            let new_args = args.iter().map(|a| substitute(a, subst)).collect();
            Expr::call(name.clone(), new_args, expr.ty.clone(), expr.span)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_ir::{BinaryOp, FunctionArg, Span, Type};

    fn real() -> Type {
        Type::real()
    }

    fn mk_mechanism(functions: Vec<Function>, evolve_value: RExpr) -> Mechanism {
        Mechanism {
            name: Name::new("m"),
            functions,
            evolutions: vec![arblang_ir::Evolve {
                identifier: Expr::argument(Name::new("s'"), real(), Span::DUMMY),
                value: evolve_value,
                span: Span::DUMMY,
            }],
            ..Mechanism::default()
        }
    }

    #[test]
    fn a_call_is_replaced_by_its_substituted_body() {
        let arg = FunctionArg { name: Name::new("x"), ty: real() };
        let body = Expr::binary(
            BinaryOp::Mul,
            Expr::argument(Name::new("x"), real(), Span::DUMMY),
            Expr::int(2, real(), Span::DUMMY),
            real(),
            Span::DUMMY,
        );
        let double = Function { name: Name::new("double"), args: vec![arg].into(), body, ret: real(), span: Span::DUMMY };

        let call = Expr::call(Name::new("double"), vec![Expr::int(5, real(), Span::DUMMY)], real(), Span::DUMMY);
        let mechanism = mk_mechanism(vec![double], call);

        let (inlined, changed) = inline_mechanism(mechanism).unwrap();
        assert!(changed);
        let evolve_value = &inlined.evolutions[0].value;
        assert!(!contains_call(evolve_value));
    }

    #[test]
    fn a_recursive_call_is_rejected() {
        let arg = FunctionArg { name: Name::new("x"), ty: real() };
        let recurse = Expr::call(Name::new("loop"), vec![Expr::argument(Name::new("x"), real(), Span::DUMMY)], real(), Span::DUMMY);
        let looping = Function { name: Name::new("loop"), args: vec![arg].into(), body: recurse, ret: real(), span: Span::DUMMY };

        let call = Expr::call(Name::new("loop"), vec![Expr::int(1, real(), Span::DUMMY)], real(), Span::DUMMY);
        let mechanism = mk_mechanism(vec![looping], call);

        let err = inline_mechanism(mechanism).unwrap_err();
        assert!(matches!(err, Error::UndefinedFunction { .. }));
    }

    fn contains_call(expr: &RExpr) -> bool {
        if matches!(expr.kind, ExprKind::Call(_, _)) {
            return true;
        }
        expr.children().iter().any(contains_call)
    }
}
