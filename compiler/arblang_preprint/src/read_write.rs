//! Per-kernel read/write maps (§4.12, read/write half).
//!
//! Four kernels — init, evolve, effect, event — each get a [`KernelMaps`]:
//! which parameter/binding/state pointers the kernel reads, and which
//! storage pointers it writes along with the (self-contained) expression to
//! write there. Grounded on
//! `original_source/arblang/pre_printer/get_read_arguments.cpp` (the read
//! side) and `printable_mechanism.cpp`'s `get_resolved_variables`/`write_var`
//! (the write side), adapted for two shapes the original's assumptions don't
//! cover: a top-level body the optimizer folded down to a bare literal with
//! no enclosing `let` at all (the original expects exactly one named
//! "resolved variable"), and a solved `evolve`/`effect` body that is a raw
//! expression tree rather than a single trailing reference (the solver's own
//! local simplification re-simplifies but does not re-run canonicalization's
//! let-binding discipline). Rather than require a single named result, a
//! write target here is any self-contained expression — reconstructed with
//! its own copy of the declaration's outer `let`-bindings when a record
//! result's fields are split across different storage pointers.
//!
//! The event kernel has no counterpart in the original file at all (it only
//! ever handles init/evolve/effect); its read/write maps are built the same
//! way as the init kernel's, since an `on_event` assigns a new state value
//! exactly like an `initial` does.

use rustc_hash::FxHashSet;

use arblang_diagnostic::{Error, Result};
use arblang_ir::{Affectable, Expr, ExprKind, Mechanism, Name, RExpr, Span};

use crate::flatten::StateFieldMap;
use crate::pointer_map::{self, PointerMap};

const PASS: &str = "arblang_preprint::read_write";

#[derive(Default, Debug, Clone)]
pub struct ReadMap {
    pub parameters: Vec<(Name, Name)>,
    pub bindings: Vec<(Name, Name)>,
    pub states: Vec<(Name, Name)>,
}

#[derive(Default, Debug, Clone)]
pub struct KernelMaps {
    pub reads: ReadMap,
    pub writes: Vec<(Name, RExpr)>,
}

/// Collects every `Argument` this expression reads, the way
/// `get_read_arguments.cpp` does: a bound name's own definition is not
/// itself a read (a `Let`/`Variable` recurses straight into the bound value
/// and the body, never reporting the bound name).
fn read_arguments(expr: &RExpr, out: &mut Vec<Name>) -> Result<()> {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) => Ok(()),
        ExprKind::Argument(name) => {
            out.push(name.clone());
            Ok(())
        }
        ExprKind::Variable(_, value) => read_arguments(value, out),
        ExprKind::Object(fields) => {
            for field in fields {
                read_arguments(field, out)?;
            }
            Ok(())
        }
        ExprKind::FieldAccess(..) => Err(Error::InternalInvariant {
            pass: PASS,
            message: "unexpected field access after state flattening".into(),
            span: expr.span,
        }),
        ExprKind::Let(identifier, body) => {
            read_arguments(identifier, out)?;
            read_arguments(body, out)
        }
        ExprKind::Conditional(cond, if_true, if_false) => {
            read_arguments(cond, out)?;
            read_arguments(if_true, out)?;
            read_arguments(if_false, out)
        }
        ExprKind::Unary(_, arg) => read_arguments(arg, out),
        ExprKind::Binary(_, lhs, rhs) => {
            read_arguments(lhs, out)?;
            read_arguments(rhs, out)
        }
        ExprKind::Call(name, _) => Err(Error::InternalInvariant {
            pass: PASS,
            message: format!("unexpected call to `{name}` at this stage of the compiler"),
            span: expr.span,
        }),
    }
}

/// Splits `expr` into `(slot name, self-contained write expression)` pairs:
/// one pair per field when the let-chain's result is a record, otherwise a
/// single pair under `default_name` holding the whole expression unchanged.
fn write_targets(expr: &RExpr, default_name: &Name) -> Result<Vec<(Name, RExpr)>> {
    let (bindings, result) = expr.clone().let_chain();
    match &result.kind {
        ExprKind::Object(fields) => {
            let mut targets = Vec::with_capacity(fields.len());
            for field in fields {
                let ExprKind::Variable(name, value) = &field.kind else {
                    return Err(Error::InternalInvariant {
                        pass: PASS,
                        message: "object field of a let-chain result is not a named slot".into(),
                        span: field.span,
                    });
                };
                let rebuilt = Expr::rebuild_let_chain(bindings.clone(), value.clone(), field.span);
                targets.push((name.clone(), rebuilt));
            }
            Ok(targets)
        }
        _ => Ok(vec![(default_name.clone(), expr.clone())]),
    }
}

/// Resolves a write slot's name to the storage pointer backing it — through
/// the flattened-state decoder first when writing a state field, falling
/// back to the pointer map directly otherwise — and appends the resolved
/// `(pointer, expression)` pair.
fn push_writes(
    pointer_map: &PointerMap,
    state_fields: &StateFieldMap,
    state_name: Option<&Name>,
    slots: Vec<(Name, RExpr)>,
    out: &mut Vec<(Name, RExpr)>,
) -> Result<()> {
    for (slot_name, value) in slots {
        let pointer_key = match state_name {
            Some(state) => {
                let field = slot_name.without_prime();
                state_fields
                    .get(state)
                    .and_then(|fields| fields.get(&field))
                    .cloned()
                    .unwrap_or_else(|| state.clone())
            }
            None => slot_name,
        };
        let pointer = pointer_map.first_source(&pointer_key).cloned().ok_or_else(|| Error::InternalInvariant {
            pass: PASS,
            message: format!("no storage source for `{pointer_key}`"),
            span: value.span,
        })?;
        out.push((pointer, value));
    }
    Ok(())
}

/// Classifies every name read across a kernel into its parameter, binding,
/// or state bucket, resolving each to its storage pointer and dropping
/// duplicate reads.
fn classify(
    names: &[Name],
    param_set: &FxHashSet<Name>,
    bind_set: &FxHashSet<Name>,
    state_set: &FxHashSet<Name>,
    pointer_map: &PointerMap,
) -> Result<ReadMap> {
    let mut reads = ReadMap::default();
    let mut seen = FxHashSet::default();
    for name in names {
        if !seen.insert(name.clone()) {
            continue;
        }
        let pointer = pointer_map.first_source(name).cloned().ok_or_else(|| Error::InternalInvariant {
            pass: PASS,
            message: format!("no storage source for `{name}`"),
            span: Span::DUMMY,
        })?;
        if param_set.contains(name) {
            reads.parameters.push((pointer, name.clone()));
        } else if bind_set.contains(name) {
            reads.bindings.push((pointer, name.clone()));
        } else if state_set.contains(name) {
            reads.states.push((pointer, name.clone()));
        } else {
            return Err(Error::InternalInvariant {
                pass: PASS,
                message: format!("`{name}` is neither a parameter, a binding, nor a state"),
                span: Span::DUMMY,
            });
        }
    }
    Ok(reads)
}

pub fn build_init(
    mechanism: &Mechanism,
    pointer_map: &PointerMap,
    state_fields: &StateFieldMap,
    param_set: &FxHashSet<Name>,
    bind_set: &FxHashSet<Name>,
    state_set: &FxHashSet<Name>,
) -> Result<KernelMaps> {
    let mut writes = Vec::new();
    let mut read_names = Vec::new();

    for init in &mechanism.initializations {
        let ExprKind::Argument(state_name) = &init.identifier.kind else {
            return Err(Error::InternalInvariant {
                pass: PASS,
                message: "initial identifier is not a state argument".into(),
                span: init.span,
            });
        };
        read_arguments(&init.value, &mut read_names)?;
        let slots = write_targets(&init.value, state_name)?;
        push_writes(pointer_map, state_fields, Some(state_name), slots, &mut writes)?;
    }

    for param in &mechanism.parameters {
        if matches!(param.value.kind, ExprKind::IntLit(_) | ExprKind::FloatLit(_)) {
            continue;
        }
        read_arguments(&param.value, &mut read_names)?;
        let slots = write_targets(&param.value, &param.name)?;
        push_writes(pointer_map, state_fields, None, slots, &mut writes)?;
    }

    let reads = classify(&read_names, param_set, bind_set, state_set, pointer_map)?;
    Ok(KernelMaps { reads, writes })
}

pub fn build_evolve(
    mechanism: &Mechanism,
    pointer_map: &PointerMap,
    state_fields: &StateFieldMap,
    param_set: &FxHashSet<Name>,
    bind_set: &FxHashSet<Name>,
    state_set: &FxHashSet<Name>,
) -> Result<KernelMaps> {
    let mut writes = Vec::new();
    let mut read_names = Vec::new();

    for evolve in &mechanism.evolutions {
        let ExprKind::Argument(target) = &evolve.identifier.kind else {
            return Err(Error::InternalInvariant {
                pass: PASS,
                message: "evolve identifier is not an argument".into(),
                span: evolve.span,
            });
        };
        let state_name = target.without_prime();
        read_arguments(&evolve.value, &mut read_names)?;
        let slots = write_targets(&evolve.value, &state_name)?;
        push_writes(pointer_map, state_fields, Some(&state_name), slots, &mut writes)?;
    }

    let reads = classify(&read_names, param_set, bind_set, state_set, pointer_map)?;
    Ok(KernelMaps { reads, writes })
}

pub fn build_effect(
    mechanism: &Mechanism,
    pointer_map: &PointerMap,
    state_fields: &StateFieldMap,
    param_set: &FxHashSet<Name>,
    bind_set: &FxHashSet<Name>,
    state_set: &FxHashSet<Name>,
) -> Result<KernelMaps> {
    let mut writes = Vec::new();
    let mut read_names = Vec::new();

    for effect in &mechanism.effects {
        read_arguments(&effect.value, &mut read_names)?;
        let (base, _) = pointer_map::base_names(effect.effect);
        let target = match &effect.ion {
            Some(ion) => Name::new(format!("{base}_{ion}")),
            None => Name::new(base),
        };
        let slots = write_targets(&effect.value, &target)?;
        push_writes(pointer_map, state_fields, None, slots, &mut writes)?;
    }

    let reads = classify(&read_names, param_set, bind_set, state_set, pointer_map)?;
    Ok(KernelMaps { reads, writes })
}

pub fn build_event(
    mechanism: &Mechanism,
    pointer_map: &PointerMap,
    state_fields: &StateFieldMap,
    param_set: &FxHashSet<Name>,
    bind_set: &FxHashSet<Name>,
    state_set: &FxHashSet<Name>,
) -> Result<KernelMaps> {
    let mut writes = Vec::new();
    let mut read_names = Vec::new();

    for event in &mechanism.on_events {
        let ExprKind::Argument(state_name) = &event.identifier.kind else {
            return Err(Error::InternalInvariant {
                pass: PASS,
                message: "on_event identifier is not a state argument".into(),
                span: event.span,
            });
        };
        read_arguments(&event.value, &mut read_names)?;
        let slots = write_targets(&event.value, state_name)?;
        push_writes(pointer_map, state_fields, Some(state_name), slots, &mut writes)?;
    }

    let reads = classify(&read_names, param_set, bind_set, state_set, pointer_map)?;
    Ok(KernelMaps { reads, writes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_ir::{Quantity, Type};

    fn real() -> Type {
        Type::real()
    }

    #[test]
    fn read_arguments_skips_bound_names_but_keeps_their_dependencies() {
        let span = Span::DUMMY;
        let gbar = Expr::argument(Name::new("gbar"), real(), span);
        let x = Expr::variable(Name::new("x"), gbar, span);
        let body = Expr::argument(Name::new("x"), real(), span);
        let expr = Expr::let_(x, body, span);

        let mut out = Vec::new();
        read_arguments(&expr, &mut out).unwrap();
        assert_eq!(out, vec![Name::new("gbar")]);
    }

    #[test]
    fn write_targets_splits_a_record_result_per_field() {
        let span = Span::DUMMY;
        let m_val = Expr::int(0, real(), span);
        let h_val = Expr::int(1, real(), span);
        let record = Expr::object(
            vec![
                Expr::variable(Name::new("m"), m_val, span),
                Expr::variable(Name::new("h"), h_val, span),
            ],
            real(),
            span,
        );
        let targets = write_targets(&record, &Name::new("s")).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].0, Name::new("m"));
        assert_eq!(targets[1].0, Name::new("h"));
    }

    #[test]
    fn write_targets_falls_back_to_the_default_name_for_a_bare_literal() {
        let span = Span::DUMMY;
        let literal = Expr::int(0, real(), span);
        let targets = write_targets(&literal, &Name::new("m")).unwrap();
        assert_eq!(targets, vec![(Name::new("m"), literal)]);
    }

    #[test]
    fn write_targets_keeps_a_raw_non_object_expression_self_contained() {
        let span = Span::DUMMY;
        let a = Expr::argument(Name::new("a"), Type::Quantity(Quantity::TIME), span);
        let two = Expr::int(2, real(), span);
        let sum = Expr::binary(arblang_ir::BinaryOp::Mul, a, two, Type::Quantity(Quantity::TIME), span);
        let targets = write_targets(&sum, &Name::new("m")).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0, Name::new("m"));
        assert!(matches!(targets[0].1.kind, ExprKind::Binary(..)));
    }
}
