//! IR normalization (§4.2, §4.3): canonicalization to A-normal form followed
//! by single-assignment renaming, run back-to-back over every expression in
//! a resolved mechanism before the optimizer ever sees it.

pub mod canonicalize;
pub mod rename;

use arblang_ir::{Effect, Evolve, FreshNames, Initial, Mechanism, Name, OnEvent, Parameter, RExpr};

use canonicalize::canonicalize as canon_expr;
use rename::rename as rename_expr;

fn canon_then_rename(expr: &RExpr, fresh: &mut FreshNames, reserved: &mut FreshNames) -> RExpr {
    let canon = canon_expr(expr, fresh);
    rename_expr(&canon, reserved)
}

/// Normalizes every expression in `mechanism`: canonicalize to A-normal
/// form, then single-assignment-rename, grouping reserved-name sets exactly
/// as §4.3 specifies (parameters share with initializations; evolutions,
/// effects, and on_events are each their own shared group; everything else
/// — constants, each function body — gets an independent group).
#[tracing::instrument(level = "debug", skip_all, fields(mechanism = %mechanism.name))]
pub fn normalize(mut mechanism: Mechanism) -> Mechanism {
    let mut globals: Vec<Name> = Vec::new();
    for c in &mechanism.constants {
        globals.push(c.name.clone());
    }
    for p in &mechanism.parameters {
        globals.push(p.name.clone());
    }
    for s in &mechanism.states {
        globals.push(s.name.clone());
        globals.push(s.name.with_prime());
    }
    for b in &mechanism.bindings {
        globals.push(b.name.clone());
    }

    // Constants: each gets its own canonicalization counter and its own
    // reserved set (seeded with globals), since nothing groups them.
    for c in &mut mechanism.constants {
        let mut fresh = FreshNames::new();
        let mut reserved = seeded(&globals);
        c.value = canon_then_rename(&c.value, &mut fresh, &mut reserved);
    }

    // Parameters and initializations share one reserved set (§4.3: "emitted
    // in the same generated function").
    {
        let mut reserved = seeded(&globals);
        rename_group(&mut mechanism.parameters, |p: &mut Parameter| &mut p.value, &mut reserved);
        rename_group(&mut mechanism.initializations, |i: &mut Initial| &mut i.value, &mut reserved);
    }

    for f in &mut mechanism.functions {
        let mut fresh = FreshNames::new();
        let mut reserved = seeded(&globals);
        for arg in f.args.iter() {
            reserved.reserve(arg.name.clone());
        }
        f.body = canon_then_rename(&f.body, &mut fresh, &mut reserved);
    }

    {
        let mut reserved = seeded(&globals);
        rename_group(&mut mechanism.evolutions, |e: &mut Evolve| &mut e.value, &mut reserved);
    }
    {
        let mut reserved = seeded(&globals);
        rename_group(&mut mechanism.effects, |e: &mut Effect| &mut e.value, &mut reserved);
    }
    {
        let mut reserved = seeded(&globals);
        rename_group(&mut mechanism.on_events, |o: &mut OnEvent| &mut o.value, &mut reserved);
    }

    mechanism
}

/// Canonicalizes and renames every item in a declaration group, sharing one
/// reserved-name set and spawning a fresh canonicalization counter per item
/// (canonicalization's fresh-name counter is always per-declaration; only
/// the single-assignment reserved set is shared per §4.3).
fn rename_group<T>(items: &mut [T], value: impl Fn(&mut T) -> &mut RExpr, reserved: &mut FreshNames) {
    for item in items {
        let slot = value(item);
        let mut fresh = FreshNames::new();
        *slot = canon_then_rename(slot, &mut fresh, reserved);
    }
}

/// Builds a fresh reserved-name set seeded with every global name, so a
/// local introduced in any group can never collide with a constant,
/// parameter, state, or binding.
fn seeded(globals: &[Name]) -> FreshNames {
    let mut out = FreshNames::new();
    for name in globals {
        out.reserve(name.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_frontend::parse_source;
    use arblang_resolve::resolve_mechanism;

    #[test]
    fn normalizes_a_density_mechanism_without_collisions() {
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
        let mechanism = resolve_mechanism(&parsed).unwrap();
        let normalized = normalize(mechanism);
        assert_eq!(normalized.effects.len(), 1);
    }

    #[test]
    fn empty_mechanism_normalizes_to_itself() {
        let parsed = parse_source("density mechanism empty { }").unwrap();
        let mechanism = resolve_mechanism(&parsed).unwrap();
        let normalized = normalize(mechanism);
        assert!(normalized.parameters.is_empty());
    }
}
