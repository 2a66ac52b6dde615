//! Per-construct resolution (§4.1): one function per parsed declaration
//! kind, each grounded on the matching `resolve(const parsed_*&, ...)`
//! overload in `original_source/arblang/resolver/resolve.cpp`.

use std::rc::Rc;

use arblang_diagnostic::{Error, Result, TypeDescription};
use arblang_ir::{Bind, Constant, Effect, Evolve, Export, Expr, Function, FunctionArg, Initial, Name, OnEvent, Parameter, State};
use arblang_parsed::{ParsedBind, ParsedConstant, ParsedEffect, ParsedEvolve, ParsedExport, ParsedFunction, ParsedInitial, ParsedOnEvent, ParsedParameter, ParsedState};

use crate::expr::resolve_expr;
use crate::scope::InScopeMap;
use crate::types::{resolve_affectable, resolve_bindable, resolve_type};

fn mismatch(expected: &arblang_ir::Type, found: &arblang_ir::Type, span: arblang_ir::Span) -> Error {
    Error::TypeMismatch {
        expected: TypeDescription(format!("{expected:?}")),
        found: TypeDescription(format!("{found:?}")),
        span,
    }
}

pub fn resolve_constant(c: &ParsedConstant, scope: &InScopeMap) -> Result<Constant> {
    let key = Name::from(c.name.as_ref());
    if scope.is_duplicate(&key) {
        return Err(Error::DuplicateDefinition { name: c.name.to_string(), span: c.span });
    }
    let available = scope.for_constant_value();
    let value = resolve_expr(&c.value, &available)?;
    if let Some(ty) = &c.ty {
        let declared = resolve_type(ty, &scope.aliases, c.span)?;
        if declared != value.ty {
            return Err(mismatch(&declared, &value.ty, c.span));
        }
    }
    Ok(Constant { name: key, value, span: c.span })
}

pub fn resolve_parameter(p: &ParsedParameter, scope: &InScopeMap) -> Result<Parameter> {
    let key = Name::from(p.name.as_ref());
    if scope.is_duplicate(&key) {
        return Err(Error::DuplicateDefinition { name: p.name.to_string(), span: p.span });
    }
    let available = scope.for_parameter_value();
    let value = resolve_expr(&p.value, &available)?;
    if let Some(ty) = &p.ty {
        let declared = resolve_type(ty, &scope.aliases, p.span)?;
        if declared != value.ty {
            return Err(mismatch(&declared, &value.ty, p.span));
        }
    }
    Ok(Parameter { name: key, value, span: p.span })
}

pub fn resolve_state(s: &ParsedState, scope: &InScopeMap) -> Result<State> {
    let key = Name::from(s.name.as_ref());
    if scope.is_duplicate(&key) {
        return Err(Error::DuplicateDefinition { name: s.name.to_string(), span: s.span });
    }
    let ty = resolve_type(&s.ty, &scope.aliases, s.span)?;
    Ok(State { name: key, ty, span: s.span })
}

pub fn resolve_bind(b: &ParsedBind, scope: &InScopeMap) -> Result<Bind> {
    let key = Name::from(b.name.as_ref());
    if scope.is_duplicate(&key) {
        return Err(Error::DuplicateDefinition { name: b.name.to_string(), span: b.span });
    }
    let bindable = resolve_bindable(&b.bind, b.ion.as_deref(), b.span)?;
    let intrinsic = bindable.intrinsic_type();
    if let Some(ty) = &b.ty {
        let declared = resolve_type(ty, &scope.aliases, b.span)?;
        if declared != intrinsic {
            return Err(mismatch(&declared, &intrinsic, b.span));
        }
    }
    let ion = b.ion.as_deref().map(Name::from);
    Ok(Bind { name: key, bind: bindable, ion, ty: intrinsic, span: b.span })
}

pub fn resolve_function(f: &ParsedFunction, scope: &InScopeMap) -> Result<Function> {
    let key = Name::from(f.name.as_ref());
    if scope.functions.contains_key(&key) {
        return Err(Error::DuplicateDefinition { name: f.name.to_string(), span: f.span });
    }

    let mut available = scope.for_function_body();
    let mut args = Vec::with_capacity(f.args.len());
    for a in &f.args {
        let arg_ty = resolve_type(&a.ty, &scope.aliases, f.span)?;
        let arg_name = Name::from(a.name.as_ref());
        let arg_expr = Expr::argument(arg_name.clone(), arg_ty.clone(), f.span);
        available.local.insert(arg_name.clone(), arg_expr);
        args.push(FunctionArg { name: arg_name, ty: arg_ty });
    }

    let body = resolve_expr(&f.body, &available)?;
    let ret = body.ty.clone();
    if let Some(r) = &f.ret {
        let declared = resolve_type(r, &scope.aliases, f.span)?;
        if declared != ret {
            return Err(mismatch(&declared, &ret, f.span));
        }
    }

    Ok(Function { name: key, args: Rc::from(args.into_boxed_slice()), body, ret, span: f.span })
}

/// `initial s = value;`. Only checks that `s` names a state, mirroring the
/// original resolver, which never compares the initializer's type against
/// the state's own type (it only compares against an explicit annotation on
/// the identifier, and the parsed tree here carries no such annotation).
pub fn resolve_initial(i: &ParsedInitial, scope: &InScopeMap) -> Result<Initial> {
    let key = Name::from(i.name.as_ref());
    let state_expr = scope
        .states
        .get(&key)
        .cloned()
        .ok_or_else(|| Error::UndefinedIdentifier { name: i.name.to_string(), span: i.span })?;
    let value = resolve_expr(&i.value, scope)?;
    Ok(Initial { identifier: state_expr, value, span: i.span })
}

/// `evolve s' = value;`. The value's type must equal the state's
/// time-derivative type, not the state's own type.
pub fn resolve_evolve(e: &ParsedEvolve, scope: &InScopeMap) -> Result<Evolve> {
    if !e.name.ends_with('\'') {
        return Err(Error::InvalidDerivative { name: e.name.to_string(), span: e.span });
    }
    let base = Name::from(&e.name[..e.name.len() - 1]);
    let state_expr = scope
        .states
        .get(&base)
        .cloned()
        .ok_or_else(|| Error::UndefinedIdentifier { name: base.to_string(), span: e.span })?;

    let value = resolve_expr(&e.value, scope)?;
    let derivative_ty = state_expr
        .ty
        .time_derivative()
        .ok_or_else(|| Error::InvalidDerivative { name: base.to_string(), span: e.span })?;
    if value.ty != derivative_ty {
        return Err(mismatch(&derivative_ty, &value.ty, e.span));
    }

    // The evolve's identifier is a fresh primed argument naming the state's
    // derivative, not the state's own unprimed argument (§3.3): the IR's own
    // contract documents the identifier as carrying the trailing prime.
    let identifier = Expr::argument(base.with_prime(), derivative_ty, e.span);
    Ok(Evolve { identifier, value, span: e.span })
}

pub fn resolve_effect(e: &ParsedEffect, scope: &InScopeMap) -> Result<Effect> {
    let affectable = resolve_affectable(&e.effect, e.ion.as_deref(), e.span)?;
    let value = resolve_expr(&e.value, scope)?;
    if let Some(intrinsic) = affectable.intrinsic_type() {
        if intrinsic != value.ty {
            return Err(mismatch(&intrinsic, &value.ty, e.span));
        }
    }
    let ty = value.ty.clone();
    Ok(Effect { effect: affectable, ion: e.ion.as_deref().map(Name::from), value, ty, span: e.span })
}

pub fn resolve_export(x: &ParsedExport, scope: &InScopeMap) -> Result<Export> {
    let key = Name::from(x.name.as_ref());
    let param_expr = scope
        .parameters
        .get(&key)
        .cloned()
        .ok_or_else(|| Error::UndefinedIdentifier { name: x.name.to_string(), span: x.span })?;
    Ok(Export { identifier: param_expr, span: x.span })
}

/// `on_event(argument) = value;`. `argument` is a fresh real-valued local
/// (the event weight delivered by the simulator), bound while resolving
/// `value`, not a lookup into any global table — the surface grammar this
/// workspace parses (`arblang_frontend::parser::parse_on_event`) dropped the
/// original's optional type annotation on the event argument, so it is
/// always typed `real` here.
pub fn resolve_on_event(o: &ParsedOnEvent, scope: &InScopeMap) -> Result<OnEvent> {
    let key = Name::from(o.name.as_ref());
    let argument = Expr::argument(key.clone(), arblang_ir::Type::real(), o.span);
    let mut available = scope.clone();
    available.local.insert(key, argument.clone());
    let value = resolve_expr(&o.value, &available)?;
    Ok(OnEvent { identifier: argument, value, span: o.span })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_ir::{Quantity, Span, Type};
    use arblang_parsed::units::ParsedUnit;
    use arblang_parsed::{ParsedExpr, ParsedType, QuantityName};

    fn span() -> Span {
        Span::DUMMY
    }

    fn lit(n: i64) -> ParsedExpr {
        ParsedExpr::Int { value: n, unit: ParsedUnit::None, span: span() }
    }

    #[test]
    fn duplicate_parameter_name_is_rejected() {
        let mut scope = InScopeMap::new();
        scope.parameters.insert(Name::new("g"), Expr::argument(Name::new("g"), Type::real(), span()));
        let p = ParsedParameter { name: "g".into(), ty: None, value: lit(1), span: span() };
        assert!(resolve_parameter(&p, &scope).is_err());
    }

    #[test]
    fn state_requires_explicit_type() {
        let scope = InScopeMap::new();
        let s = ParsedState { name: "m".into(), ty: ParsedType::Quantity(QuantityName::Real), span: span() };
        let resolved = resolve_state(&s, &scope).unwrap();
        assert_eq!(resolved.ty, Type::real());
    }

    #[test]
    fn evolve_requires_trailing_prime_and_matching_derivative_type() {
        let mut scope = InScopeMap::new();
        scope.states.insert(Name::new("m"), Expr::argument(Name::new("m"), Type::real(), span()));

        let bad = ParsedEvolve { name: "m".into(), value: lit(1), span: span() };
        assert!(resolve_evolve(&bad, &scope).is_err());

        let good = ParsedEvolve {
            name: "m'".into(),
            value: ParsedExpr::Int {
                value: 1,
                unit: ParsedUnit::Binary {
                    op: arblang_parsed::units::UnitOp::Pow,
                    lhs: Box::new(ParsedUnit::parse_simple("s", span()).unwrap()),
                    rhs: Box::new(ParsedUnit::Integer { value: -1, span: span() }),
                    span: span(),
                },
                span: span(),
            },
            span: span(),
        };
        let resolved = resolve_evolve(&good, &scope).unwrap();
        assert_eq!(resolved.value.ty, Type::Quantity(Quantity::TIME.pow(-1)));
    }

    #[test]
    fn effect_checks_value_type_against_the_affectable_tag() {
        let scope = InScopeMap::new();
        let e = ParsedEffect { effect: "current_density".into(), ion: None, value: lit(1), span: span() };
        assert!(resolve_effect(&e, &scope).is_err());
    }

    #[test]
    fn function_bodies_cannot_see_states_or_bindings() {
        let mut scope = InScopeMap::new();
        scope.states.insert(Name::new("m"), Expr::argument(Name::new("m"), Type::real(), span()));
        scope.bindings.insert(Name::new("v"), Expr::argument(Name::new("v"), Type::real(), span()));
        scope.constants.insert(Name::new("k"), Expr::argument(Name::new("k"), Type::real(), span()));

        let sees_state = ParsedFunction {
            name: "f".into(),
            args: vec![],
            ret: None,
            body: ParsedExpr::Identifier { name: "m".into(), span: span() },
            span: span(),
        };
        assert!(resolve_function(&sees_state, &scope).is_err());

        let sees_binding = ParsedFunction {
            name: "g".into(),
            args: vec![],
            ret: None,
            body: ParsedExpr::Identifier { name: "v".into(), span: span() },
            span: span(),
        };
        assert!(resolve_function(&sees_binding, &scope).is_err());

        let sees_constant = ParsedFunction {
            name: "h".into(),
            args: vec![],
            ret: None,
            body: ParsedExpr::Identifier { name: "k".into(), span: span() },
            span: span(),
        };
        assert!(resolve_function(&sees_constant, &scope).is_ok());
    }
}
