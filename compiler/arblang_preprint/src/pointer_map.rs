//! Storage pointer map (§4.12, pointer-map half).
//!
//! Every IR-level name the mechanism reads or writes after flattening
//! resolves through here to the simulator storage that backs it: a
//! per-instance scalar, a node-indexed array, an ion/node-indexed array, or
//! a stream-accumulator slot. Grounded on
//! `original_source/arblang/pre_printer/printable_mechanism.cpp`'s
//! `ptr_map` construction, including its deliberate double insertion for an
//! ion-qualified current/conductance effect (own storage plus the
//! mechanism-wide accumulator it also feeds — "this is on purpose" in the
//! original).

use rustc_hash::{FxHashMap, FxHashSet};

use arblang_ir::{Affectable, Effect, Mechanism, Name};

use crate::flatten::StateFieldMap;
use crate::ion_summary::{IonField, IonTracker};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum StorageClass {
    /// One scalar per mechanism instance (a state field, a parameter).
    InternalPerInstance,
    /// One entry per simulated node the mechanism is painted on (a
    /// non-ionic bound quantity such as membrane potential or temperature).
    ExternalIndexedByNode,
    /// One entry per (ion, node) pair (an ionic bound quantity: valence,
    /// concentration, Nernst potential).
    IonicIndexedByIonNode,
    /// A slot in the simulator's per-timestep accumulator stream (a current,
    /// conductance, or flux contribution).
    StreamMember,
}

#[derive(Clone, Debug)]
pub struct StorageDescriptor {
    pub pointer: Name,
    pub class: StorageClass,
}

/// Multimap from an IR name to the storage descriptor(s) backing it. A name
/// maps to more than one descriptor only for an ion-qualified current effect
/// (`i_<ion>`/`g_<ion>`), which is both its own storage slot and a
/// contributor to the mechanism-wide `i`/`g` accumulator.
#[derive(Default, Debug, Clone)]
pub struct PointerMap(FxHashMap<Name, Vec<StorageDescriptor>>);

impl PointerMap {
    pub fn insert(&mut self, name: Name, pointer: Name, class: StorageClass) {
        self.0.entry(name).or_default().push(StorageDescriptor { pointer, class });
    }

    pub fn sources(&self, name: &Name) -> &[StorageDescriptor] {
        self.0.get(name).map_or(&[], Vec::as_slice)
    }

    /// The storage pointer a read/write map entry for `name` resolves to:
    /// the first-registered descriptor, matching the original's use of only
    /// `range.first->second` when resolving a multimap lookup.
    pub fn first_source(&self, name: &Name) -> Option<&Name> {
        self.0.get(name).and_then(|v| v.first()).map(|d| &d.pointer)
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The canonical base pointer name(s) for an effect's affectable, before any
/// ion suffix: `(primary, conductance)`. Only the current family carries a
/// conductance counterpart.
pub(crate) fn base_names(affectable: Affectable) -> (&'static str, Option<&'static str>) {
    use Affectable::*;
    match affectable {
        CurrentDensityPair | CurrentPair | CurrentDensity | Current => ("i", Some("g")),
        MolarFlux => ("molar_flux", None),
        MolarFlowRate => ("molar_flow_rate", None),
        InternalConcentrationRate => ("internal_concentration_rate", None),
        ExternalConcentrationRate => ("external_concentration_rate", None),
    }
}

/// Builds the pointer map, the classification sets used to route read-map
/// entries (parameter/binding/state), and the ion field summary, in one pass
/// over a flattened mechanism.
pub fn build(
    mechanism: &Mechanism,
    state_fields: &StateFieldMap,
) -> (PointerMap, FxHashSet<Name>, FxHashSet<Name>, FxHashSet<Name>, Vec<IonField>) {
    let mut map = PointerMap::default();
    let mut param_set = FxHashSet::default();
    let mut state_set = FxHashSet::default();
    let mut bind_set = FxHashSet::default();
    let mut ions = IonTracker::default();

    for state in &mechanism.states {
        match state_fields.get(&state.name) {
            None => {
                map.insert(state.name.clone(), state.name.clone(), StorageClass::InternalPerInstance);
                state_set.insert(state.name.clone());
            }
            Some(fields) => {
                for flattened in fields.values() {
                    map.insert(flattened.clone(), flattened.clone(), StorageClass::InternalPerInstance);
                    state_set.insert(flattened.clone());
                }
            }
        }
    }

    for param in &mechanism.parameters {
        map.insert(param.name.clone(), param.name.clone(), StorageClass::InternalPerInstance);
        param_set.insert(param.name.clone());
    }

    for bind in &mechanism.bindings {
        let class = if bind.bind.is_ionic() {
            StorageClass::IonicIndexedByIonNode
        } else {
            StorageClass::ExternalIndexedByNode
        };
        map.insert(bind.name.clone(), bind.name.clone(), class);
        bind_set.insert(bind.name.clone());

        if let Some(ion) = &bind.ion {
            ions.record(ion, bind.bind);
        }
    }

    let mut effect_seen: FxHashSet<Name> = FxHashSet::default();
    for effect in &mechanism.effects {
        record_effect(&mut map, &mut effect_seen, effect);
    }

    (map, param_set, state_set, bind_set, ions.into_fields())
}

fn record_effect(map: &mut PointerMap, seen: &mut FxHashSet<Name>, effect: &Effect) {
    let (i_base, g_base) = base_names(effect.effect);
    let i_name = Name::new(i_base);
    let g_name = g_base.map(Name::new);

    if seen.insert(i_name.clone()) {
        map.insert(i_name.clone(), i_name.clone(), StorageClass::StreamMember);
    }
    if let Some(g) = &g_name {
        if seen.insert(g.clone()) {
            map.insert(g.clone(), g.clone(), StorageClass::StreamMember);
        }
    }

    let Some(ion) = &effect.ion else { return };

    let ion_i = Name::new(format!("{i_base}_{ion}"));
    if seen.insert(ion_i.clone()) {
        map.insert(ion_i.clone(), ion_i.clone(), StorageClass::StreamMember);
        map.insert(ion_i, i_name, StorageClass::StreamMember);
    }
    if let (Some(g_base), Some(g_name)) = (g_base, g_name) {
        let ion_g = Name::new(format!("{g_base}_{ion}"));
        if seen.insert(ion_g.clone()) {
            map.insert(ion_g.clone(), ion_g.clone(), StorageClass::StreamMember);
            map.insert(ion_g, g_name, StorageClass::StreamMember);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_ion_qualified_current_has_two_sources() {
        let mut map = PointerMap::default();
        let mut seen = FxHashSet::default();
        let effect = Effect {
            effect: Affectable::CurrentDensityPair,
            ion: Some(Name::new("na")),
            value: arblang_ir::Expr::int(0, arblang_ir::Type::real(), arblang_ir::Span::DUMMY),
            ty: arblang_ir::Type::real(),
            span: arblang_ir::Span::DUMMY,
        };
        record_effect(&mut map, &mut seen, &effect);
        assert_eq!(map.sources(&Name::new("i_na")).len(), 2);
        assert_eq!(map.first_source(&Name::new("i_na")).unwrap(), &Name::new("i_na"));
    }

    #[test]
    fn a_non_ionic_current_has_one_source() {
        let mut map = PointerMap::default();
        let mut seen = FxHashSet::default();
        let effect = Effect {
            effect: Affectable::CurrentDensityPair,
            ion: None,
            value: arblang_ir::Expr::int(0, arblang_ir::Type::real(), arblang_ir::Span::DUMMY),
            ty: arblang_ir::Type::real(),
            span: arblang_ir::Span::DUMMY,
        };
        record_effect(&mut map, &mut seen, &effect);
        assert_eq!(map.sources(&Name::new("i")).len(), 1);
        assert_eq!(map.sources(&Name::new("g")).len(), 1);
    }
}
