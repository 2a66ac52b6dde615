//! Current-effect rewriting (§4.11, effect-rewriting half).
//!
//! A `current`/`current_density` effect's value `i` is rewritten into a
//! `{i, g}` record, where `g = ∂i/∂v` (divided by a unit-voltage literal to
//! restore conductance units) and `v` is the membrane-potential binding's
//! name. The effect's affectable is swapped for its `_pair` counterpart so
//! the pre-printer can later split contributions to the overall current and
//! conductance accumulators. Grounded on
//! `original_source/arblang/solver/solve.cpp`'s `get_ig_pair`, including its
//! field-naming convention (`i`/`g`, or `i_<ion>`/`g_<ion>` for an ionic
//! effect) and its pass-through when no membrane-potential binding exists.

use arblang_diagnostic::Result;
use arblang_ir::{Affectable, BinaryOp, Effect, Expr, Name, Quantity, Type};

use crate::diff::sym_diff;
use crate::ode::simplify;

pub fn rewrite_effect(effect: &Effect, voltage: Option<&Name>) -> Result<Effect> {
    let Some(v) = voltage else {
        return Ok(effect.clone());
    };
    if !effect.effect.is_current_family() {
        return Ok(effect.clone());
    }

    let span = effect.span;
    let (bindings, i) = effect.value.clone().let_chain();

    let g_raw = sym_diff(&i, v, None)?;
    let unit_voltage = Expr::int(1, Type::Quantity(Quantity::voltage()), span);
    let g_ty = match (&g_raw.ty, &unit_voltage.ty) {
        (Type::Quantity(a), Type::Quantity(b)) => Type::Quantity(a.div(*b)),
        (ty, _) => ty.clone(),
    };
    let g_div = Expr::binary(BinaryOp::Div, g_raw, unit_voltage, g_ty, span);
    let g = simplify(&g_div)?;

    let (i_name, g_name) = match &effect.ion {
        Some(ion) => (Name::new(format!("i_{ion}")), Name::new(format!("g_{ion}"))),
        None => (Name::new("i"), Name::new("g")),
    };
    let pair_ty = Type::record(vec![(i_name.clone(), i.ty.clone()), (g_name.clone(), g.ty.clone())]);
    let object = Expr::object(
        vec![Expr::variable(i_name, i, span), Expr::variable(g_name, g, span)],
        pair_ty.clone(),
        span,
    );
    let solution = simplify(&Expr::rebuild_let_chain(bindings, object, span))?;

    let pair = match effect.effect {
        Affectable::CurrentDensity => Affectable::CurrentDensityPair,
        Affectable::Current => Affectable::CurrentPair,
        other => {
            return Err(arblang_diagnostic::Error::InternalInvariant {
                pass: "arblang_solve::effect",
                message: format!("{other:?} is not a current-family affectable"),
                span,
            })
        }
    };

    Ok(Effect {
        effect: pair,
        ion: effect.ion.clone(),
        value: solution,
        ty: pair_ty,
        span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_ir::{ExprKind, Span};

    #[test]
    fn a_current_density_effect_is_rewritten_into_an_i_g_pair() {
        let span = Span::DUMMY;
        let v = Name::new("v");
        let g = Name::new("gbar");
        let e = Name::new("erev");
        let v_arg = Expr::argument(v.clone(), Type::Quantity(Quantity::voltage()), span);
        let g_arg = Expr::argument(g, Type::Quantity(Quantity::conductance()), span);
        let e_arg = Expr::argument(e, Type::Quantity(Quantity::voltage()), span);
        let diff = Expr::binary(BinaryOp::Sub, v_arg, e_arg, Type::Quantity(Quantity::voltage()), span);
        let current_density = Expr::binary(
            BinaryOp::Mul,
            g_arg,
            diff,
            Type::Quantity(Quantity::current_density()),
            span,
        );
        let effect = Effect {
            effect: Affectable::CurrentDensity,
            ion: None,
            value: current_density,
            ty: Type::Quantity(Quantity::current_density()),
            span,
        };
        let rewritten = rewrite_effect(&effect, Some(&v)).unwrap();
        assert_eq!(rewritten.effect, Affectable::CurrentDensityPair);
        assert!(matches!(rewritten.value.kind, ExprKind::Object(ref fs) if fs.len() == 2));
    }

    #[test]
    fn without_a_known_voltage_binding_the_effect_passes_through() {
        let span = Span::DUMMY;
        let value = Expr::int(0, Type::Quantity(Quantity::current_density()), span);
        let effect = Effect {
            effect: Affectable::CurrentDensity,
            ion: None,
            value: value.clone(),
            ty: Type::Quantity(Quantity::current_density()),
            span,
        };
        let rewritten = rewrite_effect(&effect, None).unwrap();
        assert_eq!(rewritten.effect, Affectable::CurrentDensity);
        assert!(std::rc::Rc::ptr_eq(&rewritten.value, &value));
    }

    #[test]
    fn a_non_current_effect_passes_through_unchanged() {
        let span = Span::DUMMY;
        let value = Expr::int(0, Type::Quantity(Quantity::molar_flux()), span);
        let effect = Effect {
            effect: Affectable::MolarFlux,
            ion: Some(Name::new("na")),
            value: value.clone(),
            ty: Type::Quantity(Quantity::molar_flux()),
            span,
        };
        let rewritten = rewrite_effect(&effect, Some(&Name::new("v"))).unwrap();
        assert_eq!(rewritten.effect, Affectable::MolarFlux);
        assert!(std::rc::Rc::ptr_eq(&rewritten.value, &value));
    }
}
