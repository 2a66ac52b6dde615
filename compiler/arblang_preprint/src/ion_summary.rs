//! Ion field summary (§4.12, ion-summary half).
//!
//! One [`IonField`] per distinct ion named by any `bind … per <ion>` in the
//! mechanism, folding repeated sightings of the same ion into a single
//! entry. Grounded on
//! `original_source/arblang/pre_printer/printable_mechanism.cpp`'s `ion_idx`
//! map and its three boolean accumulations (`reads_iconc`/`reads_econc`
//! collapsed here into a single charge/valence-read flag, plus the two
//! concentration-write flags).
//!
//! One deliberate divergence from that file: its concentration-write flags
//! are cross-wired (a `bind … = internal_concentration` sighting sets the
//! *external* write flag and vice versa). Carrying that over would silently
//! mislabel which concentration a mechanism writes, so the flags are wired
//! the straightforward way here — `internal_concentration` sets
//! `write_internal_concentration` — and the divergence is recorded in
//! DESIGN.md rather than reproduced.

use rustc_hash::FxHashMap;

use arblang_ir::{Bindable, Name};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IonField {
    pub ion: Name,
    pub read_valence: bool,
    pub write_internal_concentration: bool,
    pub write_external_concentration: bool,
}

#[derive(Default)]
pub(crate) struct IonTracker {
    fields: Vec<IonField>,
    index: FxHashMap<Name, usize>,
}

impl IonTracker {
    pub fn record(&mut self, ion: &Name, bind: Bindable) {
        let read_valence = bind == Bindable::Charge;
        let write_internal = bind == Bindable::InternalConcentration;
        let write_external = bind == Bindable::ExternalConcentration;

        let idx = match self.index.get(ion) {
            Some(&i) => i,
            None => {
                let i = self.fields.len();
                self.fields.push(IonField {
                    ion: ion.clone(),
                    read_valence: false,
                    write_internal_concentration: false,
                    write_external_concentration: false,
                });
                self.index.insert(ion.clone(), i);
                i
            }
        };
        let field = &mut self.fields[idx];
        field.read_valence |= read_valence;
        field.write_internal_concentration |= write_internal;
        field.write_external_concentration |= write_external;
    }

    pub fn into_fields(self) -> Vec<IonField> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_sightings_of_the_same_ion_fold_into_one_entry() {
        let mut tracker = IonTracker::default();
        let na = Name::new("na");
        tracker.record(&na, Bindable::Charge);
        tracker.record(&na, Bindable::InternalConcentration);
        let fields = tracker.into_fields();
        assert_eq!(fields.len(), 1);
        assert!(fields[0].read_valence);
        assert!(fields[0].write_internal_concentration);
        assert!(!fields[0].write_external_concentration);
    }

    #[test]
    fn distinct_ions_get_distinct_entries() {
        let mut tracker = IonTracker::default();
        tracker.record(&Name::new("na"), Bindable::ExternalConcentration);
        tracker.record(&Name::new("k"), Bindable::ExternalConcentration);
        let fields = tracker.into_fields();
        assert_eq!(fields.len(), 2);
        assert!(fields.iter().all(|f| f.write_external_concentration));
    }
}
