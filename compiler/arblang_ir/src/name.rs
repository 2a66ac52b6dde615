//! Identifiers.
//!
//! Unlike the lexer/parser tier, the middle-end has no reason to intern
//! strings through a global table: the pipeline is single-shot and
//! single-threaded (see the concurrency notes in the top-level design doc),
//! so a reference-counted string is plenty cheap. `Name` exists as its own
//! type rather than a bare `Rc<str>` so that `Display`, fresh-name
//! generation, and prime-suffix handling live in one place.

use std::fmt;
use std::rc::Rc;

#[derive(Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Name(Rc<str>);

impl Name {
    pub fn new(s: impl Into<Rc<str>>) -> Self {
        Name(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A state's derivative is written `s'`; this both constructs and checks
    /// for that trailing prime (see `InvalidDerivative`).
    pub fn with_prime(&self) -> Name {
        Name::new(format!("{}'", self.0))
    }

    pub fn is_primed(&self) -> bool {
        self.0.ends_with('\'')
    }

    /// Strips a trailing prime, if any. Used by the ODE solver to recover
    /// the state name from the `evolve` identifier `s'`.
    pub fn without_prime(&self) -> Name {
        match self.0.strip_suffix('\'') {
            Some(base) => Name::new(base),
            None => self.clone(),
        }
    }

    /// Builds the flattened synthetic field name `_s_f` used when a
    /// record-typed state is flattened in the pre-printer.
    pub fn flattened_field(state: &Name, field: &Name) -> Name {
        Name::new(format!("_{}_{}", state.as_str(), field.as_str()))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::new(s)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name::new(s)
    }
}

impl std::borrow::Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Default for Name {
    fn default() -> Self {
        Name::new("")
    }
}

/// Generates fresh names for a single top-level declaration, reserving every
/// name it hands out so a later re-run of the same declaration never
/// collides with itself (§4.2, §4.3).
#[derive(Default)]
pub struct FreshNames {
    reserved: std::collections::HashSet<Name>,
    counter: u32,
}

impl FreshNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the reserved set, e.g. with every global name before running
    /// the single-assignment renamer on a declaration.
    pub fn reserve(&mut self, name: Name) {
        self.reserved.insert(name);
    }

    pub fn is_reserved(&self, name: &Name) -> bool {
        self.reserved.contains(name)
    }

    /// Produces a name of the form `<prefix>_<n>` that is not already
    /// reserved, reserves it, and returns it.
    pub fn fresh(&mut self, prefix: &str) -> Name {
        loop {
            let candidate = Name::new(format!("{prefix}_{}", self.counter));
            self.counter += 1;
            if !self.reserved.contains(&candidate) {
                self.reserved.insert(candidate.clone());
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prime_round_trips() {
        let m = Name::new("m");
        let primed = m.with_prime();
        assert_eq!(primed.as_str(), "m'");
        assert!(primed.is_primed());
        assert_eq!(primed.without_prime(), m);
    }

    #[test]
    fn fresh_names_never_collide_with_reserved() {
        let mut fresh = FreshNames::new();
        fresh.reserve(Name::new("t_0"));
        let a = fresh.fresh("t");
        let b = fresh.fresh("t");
        assert_ne!(a, b);
        assert_ne!(a.as_str(), "t_0");
    }

    #[test]
    fn flattened_field_name() {
        let s = Name::new("m");
        let f = Name::new("h");
        assert_eq!(Name::flattened_field(&s, &f).as_str(), "_m_h");
    }
}
