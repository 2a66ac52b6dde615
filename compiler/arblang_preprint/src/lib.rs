//! The pre-printer (§4.12): the last middle-end stage before code
//! generation, turning a solved [`Mechanism`] into a [`PrintableMechanism`] —
//! a flattened, pointer-resolved shape the emitter can walk directly without
//! re-deriving storage classes or state layout.
//!
//! Grounded on `original_source/arblang/pre_printer/printable_mechanism.cpp`'s
//! top-level driver, which runs state flattening, builds the pointer map and
//! ion summary, and fills in the read/write maps for each kernel in one
//! pass. This workspace adds a fourth kernel pair, `event`, the original
//! never builds (see [`read_write`]'s module docs) — a natural consequence
//! of carrying `on_event` declarations through the solver (see
//! `arblang_solve`'s crate docs) rather than dropping them.
//!
//! All four mechanism kinds build a `PrintableMechanism`, including
//! concentration mechanisms: the original's handling of concentration
//! kernels is visibly unfinished (TODO comments in its `resolved_with`/
//! `resolved_on_event` paths), but nothing about state flattening, the
//! pointer map, or the read/write maps is kind-specific, so there is no
//! reason to refuse one here. A concentration mechanism simply never
//! populates the event kernel, the same as a density mechanism.

pub mod flatten;
pub mod ion_summary;
pub mod pointer_map;
pub mod read_write;

use arblang_diagnostic::{Error, Result};
use arblang_ir::{Mechanism, MechanismKind, Name};

pub use ion_summary::IonField;
pub use pointer_map::{PointerMap, StorageClass, StorageDescriptor};
pub use read_write::{KernelMaps, ReadMap};

const PASS: &str = "arblang_preprint";

/// A mechanism prepared for code generation: every state flattened, every
/// read/write resolved to its backing storage, one [`KernelMaps`] per
/// kernel.
#[derive(Debug, Clone)]
pub struct PrintableMechanism {
    pub kind: MechanismKind,
    pub name: Name,
    pub pointer_map: PointerMap,
    pub ion_fields: Vec<IonField>,
    pub init: KernelMaps,
    pub evolve: KernelMaps,
    pub effect: KernelMaps,
    pub event: KernelMaps,
}

/// All four mechanism kinds are structurally representable here (§9
/// Resolved Open Question: a concentration mechanism still gets a
/// `PrintableMechanism`, just with an empty event kernel since
/// `MechanismKind::supports_events` excludes it). A missing `kind` at this
/// stage is a bug in an earlier pass, not a user-facing error.
fn mechanism_kind(mechanism: &Mechanism) -> Result<MechanismKind> {
    mechanism.kind.ok_or_else(|| Error::InternalInvariant {
        pass: PASS,
        message: "mechanism has no kind at pre-printing time".into(),
        span: mechanism.span,
    })
}

/// §4.12's checked storage invariant: every parameter, binding, or state
/// name has exactly one pointer-map source. An ion-qualified effect is the
/// one sanctioned exception (it legitimately has two, see
/// `pointer_map::record_effect`), so this check only runs over the
/// non-effect classification sets.
fn check_single_sourced(pointer_map: &PointerMap, names: impl Iterator<Item = Name>) -> Result<()> {
    for name in names {
        let count = pointer_map.sources(&name).len();
        if count != 1 {
            return Err(Error::InternalInvariant {
                pass: PASS,
                message: format!("`{name}` has {count} pointer-map sources, expected exactly 1"),
                span: arblang_ir::Span::DUMMY,
            });
        }
    }
    Ok(())
}

#[tracing::instrument(level = "info", skip_all, fields(mechanism = %mechanism.name))]
pub fn build_printable_mechanism(mechanism: &Mechanism) -> Result<PrintableMechanism> {
    let kind = mechanism_kind(mechanism)?;

    let state_fields = flatten::state_field_map(&mechanism.states);

    let mut flat = mechanism.clone();
    for p in &mut flat.parameters {
        p.value = flatten::simplify(&p.value, &state_fields)?;
    }
    for i in &mut flat.initializations {
        i.value = flatten::simplify(&i.value, &state_fields)?;
    }
    for e in &mut flat.evolutions {
        e.value = flatten::simplify(&e.value, &state_fields)?;
    }
    for e in &mut flat.effects {
        e.value = flatten::simplify(&e.value, &state_fields)?;
    }
    for o in &mut flat.on_events {
        o.value = flatten::simplify(&o.value, &state_fields)?;
    }

    let (pointer_map, param_set, state_set, bind_set, ion_fields) = pointer_map::build(&flat, &state_fields);

    check_single_sourced(&pointer_map, param_set.iter().chain(&state_set).chain(&bind_set).cloned())?;

    let init = read_write::build_init(&flat, &pointer_map, &state_fields, &param_set, &bind_set, &state_set)?;
    let evolve = read_write::build_evolve(&flat, &pointer_map, &state_fields, &param_set, &bind_set, &state_set)?;
    let effect = read_write::build_effect(&flat, &pointer_map, &state_fields, &param_set, &bind_set, &state_set)?;
    let event = if kind.supports_events() {
        read_write::build_event(&flat, &pointer_map, &state_fields, &param_set, &bind_set, &state_set)?
    } else {
        KernelMaps::default()
    };

    Ok(PrintableMechanism {
        kind,
        name: mechanism.name.clone(),
        pointer_map,
        ion_fields,
        init,
        evolve,
        effect,
        event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_frontend::parse_source;
    use arblang_resolve::resolve_mechanism;

    fn build(source: &str) -> PrintableMechanism {
        let parsed = parse_source(source).unwrap();
        let mechanism = resolve_mechanism(&parsed).unwrap();
        let normalized = arblang_canon::normalize(mechanism);
        let optimized = arblang_opt::optimize(normalized).unwrap();
        let solved = arblang_solve::solve_mechanism(optimized).unwrap();
        build_printable_mechanism(&solved).unwrap()
    }

    #[test]
    fn a_passive_density_mechanism_prints_its_current_pair() {
        let printable = build(
            r"
            density mechanism pas {
                parameter g: conductance = 0.001 [S/cm^2];
                parameter e: voltage = -70 [mV];
                bind v = membrane_potential;
                effect current_density = g * (v - e);
            }
            ",
        );
        assert_eq!(printable.kind, MechanismKind::Density);
        assert!(printable.pointer_map.contains(&Name::new("i")));
        assert!(printable.pointer_map.contains(&Name::new("g")));
        assert_eq!(printable.effect.writes.len(), 2);
        assert!(printable.effect.reads.parameters.iter().any(|(_, n)| n.as_str() == "g"));
        assert!(printable.effect.reads.bindings.iter().any(|(_, n)| n.as_str() == "v"));
    }

    #[test]
    fn a_stateful_mechanism_populates_init_and_evolve() {
        let printable = build(
            r"
            density mechanism hh_like {
                parameter tau: time = 1 [ms];
                state m: real;
                initial m = 0;
                evolve m' = -m / tau;
                bind v = membrane_potential;
            }
            ",
        );
        assert_eq!(printable.init.writes.len(), 1);
        assert_eq!(printable.init.writes[0].0, Name::new("m"));
        assert_eq!(printable.evolve.writes.len(), 1);
        assert_eq!(printable.evolve.writes[0].0, Name::new("m"));
        assert!(printable.evolve.reads.parameters.iter().any(|(_, n)| n.as_str() == "tau"));
        assert!(printable.evolve.reads.states.iter().any(|(_, n)| n.as_str() == "m"));
        assert!(printable.evolve.reads.bindings.iter().any(|(_, n)| n.as_str() == "dt"));
    }

    #[test]
    fn a_record_typed_state_flattens_into_one_pointer_per_field() {
        let printable = build(
            r"
            density mechanism two_gate {
                state s: { m: real, h: real };
                initial s = { m = 0; h = 1; };
                evolve s' = { m' = (1 - s.m); h' = (0 - s.h); };
            }
            ",
        );
        assert!(printable.pointer_map.contains(&Name::new("_s_m")));
        assert!(printable.pointer_map.contains(&Name::new("_s_h")));
        assert_eq!(printable.init.writes.len(), 2);
        assert_eq!(printable.evolve.writes.len(), 2);
    }

    #[test]
    fn a_concentration_mechanism_builds_structurally_with_no_event_kernel() {
        let printable = build(
            r"
            concentration mechanism conc {
                state x: real;
                initial x = 0;
                evolve x' = -x;
            }
            ",
        );
        assert_eq!(printable.kind, MechanismKind::Concentration);
        assert_eq!(printable.init.writes.len(), 1);
        assert!(printable.event.writes.is_empty());
    }
}
