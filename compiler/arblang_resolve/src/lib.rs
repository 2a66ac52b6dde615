//! Mechanism-level resolution (§4.1): parsed tree → resolved IR.
//!
//! Grounded on `original_source/arblang/resolver/resolve.cpp`'s
//! `resolve(const parsed_mechanism&)` entry point, which walks the parsed
//! mechanism's declaration lists in a fixed order, threading an
//! accumulating `in_scope_map` through each one so later declarations can
//! see earlier ones.

pub mod declaration;
pub mod expr;
pub mod scope;
pub mod types;

use arblang_diagnostic::Result;
use arblang_ir::{Mechanism, MechanismKind, Name};
use arblang_parsed::{ParsedMechanism, ParsedMechanismKind};

use crate::scope::InScopeMap;
use crate::types::resolve_type;

fn mechanism_kind(kind: ParsedMechanismKind) -> MechanismKind {
    match kind {
        ParsedMechanismKind::Density => MechanismKind::Density,
        ParsedMechanismKind::Point => MechanismKind::Point,
        ParsedMechanismKind::Concentration => MechanismKind::Concentration,
        ParsedMechanismKind::Junction => MechanismKind::Junction,
    }
}

/// Resolves an entire mechanism, in the fixed order from §4.1: record
/// aliases, then constants, parameters, bindings, states, functions, then
/// initializations, on_events, evolutions, effects, exports.
pub fn resolve_mechanism(parsed: &ParsedMechanism) -> Result<Mechanism> {
    let mut scope = InScopeMap::new();

    // Record aliases contribute only to the alias map; they never appear in
    // the resolved mechanism (§3.3).
    for alias in &parsed.record_aliases {
        let mut fields = Vec::with_capacity(alias.fields.len());
        for (name, ty) in &alias.fields {
            let resolved_ty = resolve_type(ty, &scope.aliases, alias.span)?;
            fields.push((Name::from(name.as_ref()), resolved_ty));
        }
        scope.aliases.insert(Name::from(alias.name.as_ref()), arblang_ir::Type::record(fields));
    }

    let mut mechanism = Mechanism {
        name: Name::from(parsed.name.as_ref()),
        kind: parsed.kind.map(mechanism_kind),
        span: parsed.span,
        ..Mechanism::default()
    };

    for c in &parsed.constants {
        let resolved = declaration::resolve_constant(c, &scope)?;
        scope.constants.insert(resolved.name.clone(), arblang_ir::Expr::argument(resolved.name.clone(), resolved.value.ty.clone(), resolved.span));
        mechanism.constants.push(resolved);
    }

    for p in &parsed.parameters {
        let resolved = declaration::resolve_parameter(p, &scope)?;
        scope.parameters.insert(resolved.name.clone(), arblang_ir::Expr::argument(resolved.name.clone(), resolved.value.ty.clone(), resolved.span));
        mechanism.parameters.push(resolved);
    }

    for b in &parsed.bindings {
        let resolved = declaration::resolve_bind(b, &scope)?;
        scope.bindings.insert(resolved.name.clone(), arblang_ir::Expr::argument(resolved.name.clone(), resolved.ty.clone(), resolved.span));
        mechanism.bindings.push(resolved);
    }

    for s in &parsed.states {
        let resolved = declaration::resolve_state(s, &scope)?;
        scope.states.insert(resolved.name.clone(), arblang_ir::Expr::argument(resolved.name.clone(), resolved.ty.clone(), resolved.span));
        mechanism.states.push(resolved);
    }

    for f in &parsed.functions {
        let resolved = declaration::resolve_function(f, &scope)?;
        scope.functions.insert(resolved.name.clone(), std::rc::Rc::new(resolved.clone()));
        mechanism.functions.push(resolved);
    }

    for i in &parsed.initializations {
        mechanism.initializations.push(declaration::resolve_initial(i, &scope)?);
    }

    for o in &parsed.on_events {
        mechanism.on_events.push(declaration::resolve_on_event(o, &scope)?);
    }

    for e in &parsed.evolutions {
        mechanism.evolutions.push(declaration::resolve_evolve(e, &scope)?);
    }

    for e in &parsed.effects {
        mechanism.effects.push(declaration::resolve_effect(e, &scope)?);
    }

    for x in &parsed.exports {
        mechanism.exports.push(declaration::resolve_export(x, &scope)?);
    }

    Ok(mechanism)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_frontend::parse_source;

    #[test]
    fn resolves_a_complete_density_mechanism() {
        let parsed = parse_source(
            r"
            density mechanism pas {
                parameter g: conductance = 0.001 [S/cm^2];
                parameter e: voltage = -70 [mV];
                bind v = membrane_potential;
                effect current_density = g * (v - e);
            }
            ",
        )
        .unwrap();
        let mech = resolve_mechanism(&parsed).unwrap();
        assert_eq!(mech.name.as_str(), "pas");
        assert_eq!(mech.kind, Some(MechanismKind::Density));
        assert_eq!(mech.parameters.len(), 2);
        assert_eq!(mech.bindings.len(), 1);
        assert_eq!(mech.effects.len(), 1);
    }

    #[test]
    fn constant_cannot_see_a_later_parameter() {
        let parsed = parse_source(
            r"
            density mechanism bad {
                constant k: real = p;
                parameter p: real = 1;
            }
            ",
        )
        .unwrap();
        assert!(resolve_mechanism(&parsed).is_err());
    }

    #[test]
    fn duplicate_name_across_tables_is_rejected() {
        let parsed = parse_source(
            r"
            density mechanism bad {
                parameter g: real = 1;
                state g: real;
            }
            ",
        )
        .unwrap();
        assert!(resolve_mechanism(&parsed).is_err());
    }

    #[test]
    fn empty_mechanism_resolves_to_an_empty_mechanism() {
        let parsed = parse_source("density mechanism empty { }").unwrap();
        let mech = resolve_mechanism(&parsed).unwrap();
        assert!(mech.constants.is_empty());
        assert!(mech.parameters.is_empty());
        assert!(mech.states.is_empty());
    }
}
