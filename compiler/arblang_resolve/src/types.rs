//! Source-level type resolution (§4.1): turning a `ParsedType` into an
//! `arblang_ir::Type`, and mapping the string tags on `bind`/`effect`
//! statements onto `Bindable`/`Affectable`.
//!
//! Grounded on `original_source/arblang/resolver/resolved_types.cpp`'s
//! `resolve_type` overload set; the bind/effect string tables are grounded
//! on `util/common.hpp`'s `bindable`/`affectable` enums.

use rustc_hash::FxHashMap;

use arblang_diagnostic::{Error, Result, TypeDescription};
use arblang_ir::{Affectable, Bindable, Name, Quantity, Span, Type};
use arblang_parsed::{ParsedType, QuantityName, TypeOp};

fn quantity_of(name: QuantityName) -> Quantity {
    match name {
        QuantityName::Real => Quantity::REAL,
        QuantityName::Length => Quantity::LENGTH,
        QuantityName::Mass => Quantity::MASS,
        QuantityName::Time => Quantity::TIME,
        QuantityName::Current => Quantity::CURRENT,
        QuantityName::Amount => Quantity::AMOUNT,
        QuantityName::Temperature => Quantity::TEMPERATURE,
        QuantityName::Charge => Quantity::charge(),
        QuantityName::Frequency => Quantity::frequency(),
        QuantityName::Voltage => Quantity::voltage(),
        QuantityName::Resistance => Quantity::resistance(),
        QuantityName::Conductance => Quantity::conductance(),
        QuantityName::Capacitance => Quantity::capacitance(),
        QuantityName::Force => Quantity::force(),
        QuantityName::Energy => Quantity::energy(),
        QuantityName::Power => Quantity::power(),
        QuantityName::Area => Quantity::area(),
        QuantityName::Volume => Quantity::volume(),
        QuantityName::Concentration => Quantity::concentration(),
    }
}

/// Resolves a source-level type annotation to an `arblang_ir::Type`.
pub fn resolve_type(ty: &ParsedType, aliases: &FxHashMap<Name, Type>, span: Span) -> Result<Type> {
    match ty {
        ParsedType::Quantity(q) => Ok(Type::Quantity(quantity_of(*q))),
        ParsedType::Boolean => Ok(Type::Boolean),
        ParsedType::Integer(_) => Err(Error::InternalInvariant {
            pass: "resolve",
            message: "a bare integer type may only appear as the rhs of `^`".into(),
            span,
        }),
        ParsedType::RecordAlias(name) => aliases
            .get(&Name::from(name.as_ref()))
            .cloned()
            .ok_or_else(|| Error::UndefinedIdentifier { name: name.to_string(), span }),
        ParsedType::Binary(op, lhs, rhs) => {
            let lhs_ty = resolve_type(lhs, aliases, span)?;
            let lhs_q = require_quantity(&lhs_ty, span)?;
            match op {
                TypeOp::Pow => {
                    let ParsedType::Integer(n) = rhs.as_ref() else {
                        return Err(Error::TypeMismatch {
                            expected: TypeDescription("an integer exponent".into()),
                            found: TypeDescription("a non-integer type".into()),
                            span,
                        });
                    };
                    Ok(Type::Quantity(lhs_q.pow(*n)))
                }
                TypeOp::Mul | TypeOp::Div => {
                    let rhs_ty = resolve_type(rhs, aliases, span)?;
                    let rhs_q = require_quantity(&rhs_ty, span)?;
                    Ok(Type::Quantity(if *op == TypeOp::Mul { lhs_q.mul(rhs_q) } else { lhs_q.div(rhs_q) }))
                }
            }
        }
    }
}

fn require_quantity(ty: &Type, span: Span) -> Result<Quantity> {
    ty.as_quantity().ok_or_else(|| Error::TypeMismatch {
        expected: TypeDescription("a quantity type".into()),
        found: TypeDescription(format!("{ty:?}")),
        span,
    })
}

/// Resolves a `bind`'s tag string to a `Bindable`, checking that its
/// ion-argument arity matches what the tag requires (§4.1).
pub fn resolve_bindable(tag: &str, ion: Option<&str>, span: Span) -> Result<Bindable> {
    let bindable = match tag {
        "membrane_potential" => Bindable::MembranePotential,
        "temperature" => Bindable::Temperature,
        "current_density" => Bindable::CurrentDensity,
        "molar_flux" => Bindable::MolarFlux,
        "charge" => Bindable::Charge,
        "internal_concentration" => Bindable::InternalConcentration,
        "external_concentration" => Bindable::ExternalConcentration,
        "nernst_potential" => Bindable::NernstPotential,
        other => {
            return Err(Error::InvalidBinding { message: format!("`{other}` is not a bindable tag"), span })
        }
    };
    check_ion_arity(bindable.is_ionic(), ion, tag, span)?;
    Ok(bindable)
}

/// Resolves an `effect`'s tag string to an `Affectable`, same ion-arity rule
/// as bindables (internal/external concentration rates and molar flux are
/// per-ion; current(-density) and molar flow rate are mechanism-global).
pub fn resolve_affectable(tag: &str, ion: Option<&str>, span: Span) -> Result<Affectable> {
    let (affectable, is_ionic) = match tag {
        "current_density" => (Affectable::CurrentDensity, false),
        "current" => (Affectable::Current, false),
        "molar_flux" => (Affectable::MolarFlux, true),
        "molar_flow_rate" => (Affectable::MolarFlowRate, false),
        "internal_concentration_rate" => (Affectable::InternalConcentrationRate, true),
        "external_concentration_rate" => (Affectable::ExternalConcentrationRate, true),
        other => {
            return Err(Error::InvalidBinding { message: format!("`{other}` is not an affectable tag"), span })
        }
    };
    check_ion_arity(is_ionic, ion, tag, span)?;
    Ok(affectable)
}

fn check_ion_arity(expects_ion: bool, ion: Option<&str>, tag: &str, span: Span) -> Result<()> {
    match (expects_ion, ion) {
        (true, None) => Err(Error::InvalidBinding { message: format!("`{tag}` requires an ion species"), span }),
        (false, Some(ion)) => {
            Err(Error::InvalidBinding { message: format!("`{tag}` does not take an ion species (`{ion}` given)"), span })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_ir::Span;

    #[test]
    fn resolves_quantity_and_binary_types() {
        let aliases = FxHashMap::default();
        let voltage = ParsedType::Quantity(QuantityName::Voltage);
        assert_eq!(resolve_type(&voltage, &aliases, Span::DUMMY).unwrap(), Type::Quantity(Quantity::voltage()));

        let per_area = ParsedType::Binary(
            TypeOp::Div,
            Box::new(ParsedType::Quantity(QuantityName::Current)),
            Box::new(ParsedType::Binary(
                TypeOp::Pow,
                Box::new(ParsedType::Quantity(QuantityName::Length)),
                Box::new(ParsedType::Integer(2)),
            )),
        );
        assert_eq!(resolve_type(&per_area, &aliases, Span::DUMMY).unwrap(), Type::Quantity(Quantity::current_density()));
    }

    #[test]
    fn ionic_bindable_requires_an_ion() {
        assert!(resolve_bindable("internal_concentration", None, Span::DUMMY).is_err());
        assert!(resolve_bindable("internal_concentration", Some("na"), Span::DUMMY).is_ok());
    }

    #[test]
    fn non_ionic_bindable_rejects_an_ion() {
        assert!(resolve_bindable("membrane_potential", Some("na"), Span::DUMMY).is_err());
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert!(resolve_bindable("bogus", None, Span::DUMMY).is_err());
        assert!(resolve_affectable("bogus", None, Span::DUMMY).is_err());
    }
}
