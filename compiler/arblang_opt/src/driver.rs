//! The optimizer fixpoint driver (§4.4).
//!
//! Runs constant folding, then copy propagation, then CSE, then dead-code
//! elimination, across every declaration in the mechanism, looping until a
//! full round reports no change. Function inlining (§4.9) then runs once —
//! it is specified as a single pass, not a fixpoint member — after which the
//! four-pass loop runs again to clean up the redexes inlining exposes.
//! Termination is guaranteed: each pass is monotone in a well-founded
//! measure (reducible-redex count, live-binding count), and inlining strictly
//! shrinks the number of remaining `call` nodes to zero.

use arblang_diagnostic::Result;
use arblang_ir::{Mechanism, RExpr};

use crate::const_fold::ConstMap;
use crate::{const_fold, copy_prop, cse, dce, inline};

/// Runs the four-pass fixpoint over one declaration's expression.
#[tracing::instrument(level = "trace", skip_all)]
fn converge_expr(expr: &RExpr, constants: &ConstMap) -> Result<(RExpr, bool)> {
    let mut current = expr.clone();
    let mut any_changed = false;
    loop {
        let (after_fold, c1) = const_fold::fold(&current, constants)?;
        let (after_copy, c2) = copy_prop::propagate(&after_fold);
        let (after_cse, c3) = cse::eliminate(&after_copy);
        let (after_dce, c4) = dce::eliminate(&after_cse);
        let round_changed = c1 || c2 || c3 || c4;
        any_changed |= round_changed;
        current = after_dce;
        if !round_changed {
            break;
        }
    }
    Ok((current, any_changed))
}

/// Builds the global constant map (§4.5): constants and non-exported,
/// literal-valued parameters, each already folded against the map built from
/// everything declared before it.
fn build_constants(mechanism: &Mechanism) -> Result<ConstMap> {
    let exported: std::collections::HashSet<_> = mechanism
        .exports
        .iter()
        .filter_map(|e| match &e.identifier.kind {
            arblang_ir::ExprKind::Argument(name) => Some(name.clone()),
            _ => None,
        })
        .collect();

    let mut constants = ConstMap::default();
    for c in &mechanism.constants {
        let (folded, _) = const_fold::fold(&c.value, &constants)?;
        if is_literal(&folded) {
            constants.insert(c.name.clone(), folded);
        }
    }
    for p in &mechanism.parameters {
        if exported.contains(&p.name) {
            continue;
        }
        let (folded, _) = const_fold::fold(&p.value, &constants)?;
        if is_literal(&folded) {
            constants.insert(p.name.clone(), folded);
        }
    }
    Ok(constants)
}

fn is_literal(expr: &RExpr) -> bool {
    matches!(expr.kind, arblang_ir::ExprKind::IntLit(_) | arblang_ir::ExprKind::FloatLit(_))
}

#[tracing::instrument(level = "debug", skip_all, fields(mechanism = %mechanism.name))]
fn converge_mechanism(mut mechanism: Mechanism) -> Result<(Mechanism, bool)> {
    let mut any_changed = false;
    loop {
        let constants = build_constants(&mechanism)?;
        let mut round_changed = false;

        for c in &mut mechanism.constants {
            let (v, changed) = converge_expr(&c.value, &constants)?;
            c.value = v;
            round_changed |= changed;
        }
        for p in &mut mechanism.parameters {
            let (v, changed) = converge_expr(&p.value, &constants)?;
            p.value = v;
            round_changed |= changed;
        }
        for f in &mut mechanism.functions {
            let (v, changed) = converge_expr(&f.body, &constants)?;
            f.body = v;
            round_changed |= changed;
        }
        for i in &mut mechanism.initializations {
            let (v, changed) = converge_expr(&i.value, &constants)?;
            i.value = v;
            round_changed |= changed;
        }
        for e in &mut mechanism.evolutions {
            let (v, changed) = converge_expr(&e.value, &constants)?;
            e.value = v;
            round_changed |= changed;
        }
        for e in &mut mechanism.effects {
            let (v, changed) = converge_expr(&e.value, &constants)?;
            e.value = v;
            round_changed |= changed;
        }
        for o in &mut mechanism.on_events {
            let (v, changed) = converge_expr(&o.value, &constants)?;
            o.value = v;
            round_changed |= changed;
        }

        let (pruned, pruned_changed) = dce::prune_globals(mechanism);
        mechanism = pruned;
        round_changed |= pruned_changed;

        any_changed |= round_changed;
        if !round_changed {
            break;
        }
    }
    Ok((mechanism, any_changed))
}

/// Runs the full optimizer: the four-pass fixpoint, then inlining, then the
/// fixpoint again over whatever inlining exposed (§4.4, §4.9).
#[tracing::instrument(level = "info", skip_all, fields(mechanism = %mechanism.name))]
pub fn optimize(mechanism: Mechanism) -> Result<Mechanism> {
    let (mechanism, _) = converge_mechanism(mechanism)?;
    let (mechanism, inlined) = inline::inline_mechanism(mechanism)?;
    let (mechanism, _) = if inlined { converge_mechanism(mechanism)? } else { (mechanism, false) };
    Ok(mechanism)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_frontend::parse_source;
    use arblang_resolve::resolve_mechanism;

    #[test]
    fn optimizes_a_density_mechanism_to_a_fixpoint() {
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
        let normalized = arblang_canon::normalize(mechanism);
        let optimized = optimize(normalized).unwrap();
        assert_eq!(optimized.effects.len(), 1);
    }
}
