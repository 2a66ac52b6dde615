//! The resolver's scope tables (§4.1).
//!
//! Grounded on `original_source/arblang/resolver/resolve.cpp`'s `in_scope_map`
//! (five disjoint name tables plus a local map and a type-alias map) and on
//! the teacher's `ori_typeck::checker::components` pattern of grouping
//! related lookup tables into one plain struct rather than scattering them
//! across function parameters.

use rustc_hash::FxHashMap;

use arblang_ir::{Function, Name, RExpr, Type};
use std::rc::Rc;

/// All the name tables the resolver consults, mirroring the five disjoint
/// kinds of global declaration plus the two transient maps (`local`, for
/// let/object/function-argument bindings currently in scope, and `aliases`,
/// for `record` type aliases).
#[derive(Clone, Default)]
pub struct InScopeMap {
    pub parameters: FxHashMap<Name, RExpr>,
    pub constants: FxHashMap<Name, RExpr>,
    pub bindings: FxHashMap<Name, RExpr>,
    pub states: FxHashMap<Name, RExpr>,
    pub functions: FxHashMap<Name, Rc<Function>>,
    pub local: FxHashMap<Name, RExpr>,
    pub aliases: FxHashMap<Name, Type>,
}

impl InScopeMap {
    pub fn new() -> InScopeMap {
        InScopeMap::default()
    }

    /// The scope visible while resolving a constant's value: constants may
    /// only see earlier constants (§4.1).
    pub fn for_constant_value(&self) -> InScopeMap {
        let mut scope = self.clone();
        scope.parameters.clear();
        scope.bindings.clear();
        scope.states.clear();
        scope
    }

    /// The scope visible while resolving a parameter's value: parameters may
    /// see constants and earlier parameters but not bindings or states.
    pub fn for_parameter_value(&self) -> InScopeMap {
        let mut scope = self.clone();
        scope.bindings.clear();
        scope.states.clear();
        scope
    }

    /// The scope visible while resolving a function body: functions may see
    /// constants and parameters but not states or bindings — state/binding
    /// access only happens inside API hooks (§4.1).
    pub fn for_function_body(&self) -> InScopeMap {
        let mut scope = self.clone();
        scope.bindings.clear();
        scope.states.clear();
        scope
    }

    /// Looks up an identifier in local → parameter → constant → binding →
    /// state order (§4.1).
    pub fn lookup(&self, name: &Name) -> Option<&RExpr> {
        self.local
            .get(name)
            .or_else(|| self.parameters.get(name))
            .or_else(|| self.constants.get(name))
            .or_else(|| self.bindings.get(name))
            .or_else(|| self.states.get(name))
    }

    /// Whether `name` is already taken by any of the four global tables a
    /// newly declared parameter/constant/bind/state must not collide with.
    pub fn is_duplicate(&self, name: &Name) -> bool {
        self.parameters.contains_key(name)
            || self.constants.contains_key(name)
            || self.bindings.contains_key(name)
            || self.states.contains_key(name)
    }
}
