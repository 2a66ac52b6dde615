//! Mechanism-level declarations (§3.3).
//!
//! These sit one layer above the expression sum in `expr.rs`: a mechanism is
//! a collection of declarations, each of which refers to expressions but is
//! not itself part of the expression grammar.

use std::rc::Rc;

use crate::expr::RExpr;
use crate::name::Name;
use crate::span::Span;
use crate::types::{Quantity, Type};

/// A simulator-provided time-varying quantity a mechanism may read.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Bindable {
    MembranePotential,
    Temperature,
    CurrentDensity,
    MolarFlux,
    /// Ionic valence; intrinsically dimensionless.
    Charge,
    InternalConcentration,
    ExternalConcentration,
    NernstPotential,
    Dt,
}

impl Bindable {
    /// The bindable's intrinsic SI type; a user type annotation on a `bind`
    /// statement must match this (§4.1).
    pub fn intrinsic_type(self) -> Type {
        match self {
            Bindable::MembranePotential | Bindable::NernstPotential => Type::Quantity(Quantity::voltage()),
            Bindable::Temperature => Type::Quantity(Quantity::TEMPERATURE),
            Bindable::CurrentDensity => Type::Quantity(Quantity::current_density()),
            Bindable::MolarFlux => Type::Quantity(Quantity::molar_flux()),
            Bindable::Charge => Type::real(),
            Bindable::InternalConcentration | Bindable::ExternalConcentration => {
                Type::Quantity(Quantity::concentration())
            }
            Bindable::Dt => Type::Quantity(Quantity::TIME),
        }
    }

    /// Whether this bindable takes a per-ion index (concentrations, the
    /// Nernst potential, and valence are all per-ion; everything else is
    /// mechanism-global).
    pub fn is_ionic(self) -> bool {
        matches!(
            self,
            Bindable::Charge
                | Bindable::InternalConcentration
                | Bindable::ExternalConcentration
                | Bindable::NernstPotential
        )
    }
}

/// A simulator-accumulated quantity a mechanism contributes to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Affectable {
    CurrentDensity,
    Current,
    MolarFlux,
    MolarFlowRate,
    InternalConcentrationRate,
    ExternalConcentrationRate,
    /// `{current_density, conductivity}`, produced by the solver's effect
    /// rewrite of a `current_density` effect (§4.11).
    CurrentDensityPair,
    /// `{current, conductance}`, produced by the solver's effect rewrite of
    /// a `current` effect (§4.11).
    CurrentPair,
}

impl Affectable {
    /// The affectable's intrinsic type before the solver's effect rewrite
    /// (the pair variants have no single intrinsic type: they're records
    /// built at rewrite time).
    pub fn intrinsic_type(self) -> Option<Type> {
        match self {
            Affectable::CurrentDensity => Some(Type::Quantity(Quantity::current_density())),
            Affectable::Current => Some(Type::Quantity(Quantity::CURRENT)),
            Affectable::MolarFlux => Some(Type::Quantity(Quantity::molar_flux())),
            Affectable::MolarFlowRate => Some(Type::Quantity(Quantity::molar_flow_rate())),
            Affectable::InternalConcentrationRate | Affectable::ExternalConcentrationRate => {
                Some(Type::Quantity(Quantity::concentration_rate()))
            }
            Affectable::CurrentDensityPair | Affectable::CurrentPair => None,
        }
    }

    pub fn is_current_family(self) -> bool {
        matches!(self, Affectable::CurrentDensity | Affectable::Current)
    }
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: Name,
    pub value: RExpr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Constant {
    pub name: Name,
    pub value: RExpr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct State {
    pub name: Name,
    pub ty: Type,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Bind {
    pub name: Name,
    pub bind: Bindable,
    pub ion: Option<Name>,
    pub ty: Type,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct FunctionArg {
    pub name: Name,
    pub ty: Type,
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: Name,
    pub args: Rc<[FunctionArg]>,
    pub body: RExpr,
    pub ret: Type,
    pub span: Span,
}

/// `initial s = value;`. `identifier` is an `Argument` naming a state.
#[derive(Clone, Debug)]
pub struct Initial {
    pub identifier: RExpr,
    pub value: RExpr,
    pub span: Span,
}

/// `evolve s' = value;`. `identifier` is an `Argument` naming `s` with the
/// trailing prime retained on the `Name` (§4.1).
#[derive(Clone, Debug)]
pub struct Evolve {
    pub identifier: RExpr,
    pub value: RExpr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Effect {
    pub effect: Affectable,
    pub ion: Option<Name>,
    pub value: RExpr,
    pub ty: Type,
    pub span: Span,
}

/// `export p;`. `identifier` must name a parameter.
#[derive(Clone, Debug)]
pub struct Export {
    pub identifier: RExpr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct OnEvent {
    pub identifier: RExpr,
    pub value: RExpr,
    pub span: Span,
}
