//! Record-typed state flattening (§4.12, flattening half).
//!
//! Every record-typed state `s` with fields `f1..fn` gets one synthetic
//! flattened name `_s_f` per field (`Name::flattened_field`); [`simplify`]
//! then walks a post-solve expression rewriting `field_access(argument(s), f)`
//! into a flat `argument(_s_f)` everywhere it appears, while also collapsing
//! every node's type to a bare real quantity, since code generation treats
//! every slot as a `double` regardless of its original unit or record shape.
//!
//! Grounded on `original_source/arblang/pre_printer/simplify.cpp`'s
//! `gen_state_field_map` and its `simplify(r_expr, state_field_map)`
//! overload set, including its per-call `rewrites` memo keyed by variable
//! name (here: a simplified `Variable` is cached once per name so a shared
//! reference is not re-walked).

use rustc_hash::FxHashMap;

use arblang_diagnostic::{Error, Result};
use arblang_ir::{Expr, ExprKind, Name, RExpr, State, Type};

/// Maps a record-typed state's name to a `field name -> flattened name`
/// table. States of non-record type have no entry.
pub type StateFieldMap = FxHashMap<Name, FxHashMap<Name, Name>>;

/// Builds the flattened-field decoder for every record-typed state in
/// `states` (§4.12's "State flattening"; boundary case in §8: a single-field
/// record state produces exactly one synthetic field name).
pub fn state_field_map(states: &[State]) -> StateFieldMap {
    let mut decoder = StateFieldMap::default();
    for state in states {
        if let Type::Record(fields) = &state.ty {
            let mut mapped = FxHashMap::default();
            for (field_name, _) in fields.iter() {
                mapped.insert(field_name.clone(), Name::flattened_field(&state.name, field_name));
            }
            decoder.insert(state.name.clone(), mapped);
        }
    }
    decoder
}

/// Collapses any type to the uniform real-quantity type code generation
/// treats everything as: a quantity loses its dimension, a boolean or
/// record collapses entirely (§4.12).
pub fn simplify_type(_ty: &Type) -> Type {
    Type::real()
}

const PASS: &str = "arblang_preprint::flatten";

/// Rewrites one post-solve expression: state-record field accesses become
/// flat argument references, and every node's type collapses to real.
/// Starts a fresh rewrite memo, matching the original's per-declaration
/// `rewrites` map.
pub fn simplify(expr: &RExpr, map: &StateFieldMap) -> Result<RExpr> {
    let mut rewrites = FxHashMap::default();
    simplify_rec(expr, map, &mut rewrites)
}

fn simplify_rec(expr: &RExpr, map: &StateFieldMap, rewrites: &mut FxHashMap<Name, RExpr>) -> Result<RExpr> {
    let span = expr.span;
    match &expr.kind {
        ExprKind::IntLit(v) => Ok(Expr::int(*v, simplify_type(&expr.ty), span)),
        ExprKind::FloatLit(v) => Ok(Expr::float(*v, simplify_type(&expr.ty), span)),
        ExprKind::Argument(name) => Ok(Expr::argument(name.clone(), simplify_type(&expr.ty), span)),

        ExprKind::Variable(name, value) => {
            if let Some(cached) = rewrites.get(name) {
                return Ok(cached.clone());
            }
            let simple_value = simplify_rec(value, map, rewrites)?;
            let simple = Expr::variable(name.clone(), simple_value, span);
            rewrites.insert(name.clone(), simple.clone());
            Ok(simple)
        }

        ExprKind::Object(fields) => {
            let mut simple_fields = Vec::with_capacity(fields.len());
            for field in fields {
                simple_fields.push(simplify_rec(field, map, rewrites)?);
            }
            Ok(Expr::object(simple_fields, simplify_type(&expr.ty), span))
        }

        ExprKind::FieldAccess(object, field) => {
            let ExprKind::Argument(state_name) = &object.kind else {
                return Err(Error::InternalInvariant {
                    pass: PASS,
                    message: "object of a field access is not a state argument".into(),
                    span,
                });
            };
            let flattened = map
                .get(state_name)
                .and_then(|fields| fields.get(field))
                .ok_or_else(|| Error::InternalInvariant {
                    pass: PASS,
                    message: format!("no flattened field for `{state_name}.{field}`"),
                    span,
                })?;
            Ok(Expr::argument(flattened.clone(), simplify_type(&expr.ty), span))
        }

        ExprKind::Let(identifier, body) => {
            let simple_id = simplify_rec(identifier, map, rewrites)?;
            let simple_body = simplify_rec(body, map, rewrites)?;
            Ok(Expr::let_(simple_id, simple_body, span))
        }

        ExprKind::Conditional(cond, if_true, if_false) => {
            let c = simplify_rec(cond, map, rewrites)?;
            let t = simplify_rec(if_true, map, rewrites)?;
            let f = simplify_rec(if_false, map, rewrites)?;
            Ok(Expr::conditional(c, t, f, span))
        }

        ExprKind::Unary(op, arg) => {
            let a = simplify_rec(arg, map, rewrites)?;
            Ok(Expr::unary(*op, a, simplify_type(&expr.ty), span))
        }

        ExprKind::Binary(op, lhs, rhs) => {
            let l = simplify_rec(lhs, map, rewrites)?;
            let r = simplify_rec(rhs, map, rewrites)?;
            Ok(Expr::binary(*op, l, r, simplify_type(&expr.ty), span))
        }

        ExprKind::Call(name, _) => Err(Error::InternalInvariant {
            pass: PASS,
            message: format!("unexpected call to `{name}` at this stage of the compiler"),
            span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_ir::Span;

    #[test]
    fn a_single_field_record_state_gets_one_flattened_name() {
        let ty = Type::record(vec![(Name::new("m"), Type::real())]);
        let state = State {
            name: Name::new("s"),
            ty,
            span: Span::DUMMY,
        };
        let decoder = state_field_map(std::slice::from_ref(&state));
        let fields = decoder.get(&Name::new("s")).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get(&Name::new("m")).unwrap().as_str(), "_s_m");
    }

    #[test]
    fn field_access_over_a_flattened_state_becomes_a_flat_argument() {
        let state_ty = Type::record(vec![(Name::new("m"), Type::real())]);
        let decoder = state_field_map(&[State {
            name: Name::new("s"),
            ty: state_ty.clone(),
            span: Span::DUMMY,
        }]);
        let access = Expr::field_access(
            Expr::argument(Name::new("s"), state_ty, Span::DUMMY),
            Name::new("m"),
            Type::real(),
            Span::DUMMY,
        );
        let simplified = simplify(&access, &decoder).unwrap();
        assert!(matches!(&simplified.kind, ExprKind::Argument(name) if name.as_str() == "_s_m"));
    }

    #[test]
    fn every_node_collapses_to_a_real_type() {
        let v = Expr::argument(Name::new("v"), Type::Quantity(arblang_ir::Quantity::voltage()), Span::DUMMY);
        let simplified = simplify(&v, &StateFieldMap::default()).unwrap();
        assert!(simplified.ty.is_real());
    }
}
