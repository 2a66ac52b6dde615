//! Expression resolution (§4.1).
//!
//! Grounded on `original_source/arblang/resolver/resolve.cpp`'s per-node
//! `resolve(const parsed_*&, const in_scope_map&)` overloads. Every type
//! check below (which operators accept which operand shapes, the boolean
//! mismatch pre-check, the `pow` rhs-literal-int requirement for non-real
//! bases, `abs` having no validation at all) is copied from that file
//! verbatim, not invented.

use arblang_diagnostic::{Error, Result, TypeDescription};
use arblang_ir::{BinaryOp, Expr, ExprKind, Name, RExpr, Type, UnaryOp};
use arblang_parsed::units::normalize_unit;
use arblang_parsed::{BinaryOp as PBinaryOp, ParsedExpr, UnaryOp as PUnaryOp};

use crate::scope::InScopeMap;

fn unary_op(op: PUnaryOp) -> UnaryOp {
    match op {
        PUnaryOp::Exp => UnaryOp::Exp,
        PUnaryOp::Log => UnaryOp::Log,
        PUnaryOp::Cos => UnaryOp::Cos,
        PUnaryOp::Sin => UnaryOp::Sin,
        PUnaryOp::Abs => UnaryOp::Abs,
        PUnaryOp::Exprelr => UnaryOp::Exprelr,
        PUnaryOp::Not => UnaryOp::Not,
        PUnaryOp::Neg => UnaryOp::Neg,
    }
}

fn binary_op(op: PBinaryOp) -> BinaryOp {
    match op {
        PBinaryOp::Add => BinaryOp::Add,
        PBinaryOp::Sub => BinaryOp::Sub,
        PBinaryOp::Mul => BinaryOp::Mul,
        PBinaryOp::Div => BinaryOp::Div,
        PBinaryOp::Pow => BinaryOp::Pow,
        PBinaryOp::Lt => BinaryOp::Lt,
        PBinaryOp::Le => BinaryOp::Le,
        PBinaryOp::Gt => BinaryOp::Gt,
        PBinaryOp::Ge => BinaryOp::Ge,
        PBinaryOp::Eq => BinaryOp::Eq,
        PBinaryOp::Ne => BinaryOp::Ne,
        PBinaryOp::And => BinaryOp::And,
        PBinaryOp::Or => BinaryOp::Or,
        PBinaryOp::Min => BinaryOp::Min,
        PBinaryOp::Max => BinaryOp::Max,
        PBinaryOp::Dot => BinaryOp::Dot,
    }
}

fn mismatch(expected: &str, found: &Type, span: arblang_ir::Span) -> Error {
    Error::TypeMismatch {
        expected: TypeDescription(expected.into()),
        found: TypeDescription(format!("{found:?}")),
        span,
    }
}

/// Resolves an unresolved expression tree to the resolved IR, applying every
/// scope lookup and operator type rule along the way.
pub fn resolve_expr(expr: &ParsedExpr, scope: &InScopeMap) -> Result<RExpr> {
    match expr {
        ParsedExpr::Int { value, unit, span } => {
            let (quantity, power) = normalize_unit(unit)?;
            let ty = Type::Quantity(quantity);
            if power == 0 {
                Ok(Expr::int(*value, ty, *span))
            } else {
                Ok(Expr::float((*value as f64) * 10f64.powi(power), ty, *span))
            }
        }
        ParsedExpr::Float { value, unit, span } => {
            let (quantity, power) = normalize_unit(unit)?;
            Ok(Expr::float(value * 10f64.powi(power), Type::Quantity(quantity), *span))
        }
        ParsedExpr::Identifier { name, span } => {
            let key = Name::from(name.as_ref());
            scope
                .lookup(&key)
                .cloned()
                .ok_or_else(|| Error::UndefinedIdentifier { name: name.to_string(), span: *span })
        }
        ParsedExpr::Object { record_name, fields, span } => resolve_object(record_name.as_deref(), fields, *span, scope),
        ParsedExpr::Let { name, value, body, span } => resolve_let(name, value, body, *span, scope),
        ParsedExpr::With { value, body, span } => resolve_with(value, body, *span, scope),
        ParsedExpr::Conditional { cond, if_true, if_false, span } => {
            let cond_v = resolve_expr(cond, scope)?;
            let true_v = resolve_expr(if_true, scope)?;
            let false_v = resolve_expr(if_false, scope)?;
            if true_v.ty != false_v.ty {
                return Err(mismatch(&format!("{:?}", true_v.ty), &false_v.ty, *span));
            }
            Ok(Expr::conditional(cond_v, true_v, false_v, *span))
        }
        ParsedExpr::Unary { op, operand, span } => resolve_unary(*op, operand, *span, scope),
        ParsedExpr::Binary { op, lhs, rhs, span } => resolve_binary(*op, lhs, rhs, *span, scope),
        ParsedExpr::Call { function, args, span } => resolve_call(function, args, *span, scope),
    }
}

fn resolve_object(
    record_name: Option<&str>,
    fields: &[(std::rc::Rc<str>, ParsedExpr)],
    span: arblang_ir::Span,
    scope: &InScopeMap,
) -> Result<RExpr> {
    let mut o_fields = Vec::with_capacity(fields.len());
    let mut t_vec = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        let value_v = resolve_expr(value, scope)?;
        let field_name = Name::from(name.as_ref());
        let ty = value_v.ty.clone();
        o_fields.push(Expr::variable(field_name.clone(), value_v, span));
        t_vec.push((field_name, ty));
    }
    let o_type = Type::record(t_vec);

    if let Some(r_name) = record_name {
        let key = Name::from(r_name);
        let alias_type = scope
            .aliases
            .get(&key)
            .ok_or_else(|| Error::UndefinedIdentifier { name: r_name.to_string(), span })?;
        if *alias_type != o_type {
            return Err(mismatch(&format!("{alias_type:?}"), &o_type, span));
        }
    }

    Ok(Expr::object(o_fields, o_type, span))
}

fn resolve_let(name: &str, value: &ParsedExpr, body: &ParsedExpr, span: arblang_ir::Span, scope: &InScopeMap) -> Result<RExpr> {
    let key = Name::from(name);
    if scope.is_duplicate(&key) {
        return Err(Error::DuplicateDefinition { name: name.to_string(), span });
    }
    let value_v = resolve_expr(value, scope)?;
    let variable = Expr::variable(key.clone(), value_v, span);

    let mut inner = scope.clone();
    inner.local.insert(key, variable.clone());
    let body_v = resolve_expr(body, &inner)?;
    Ok(Expr::let_(variable, body_v, span))
}

/// Desugars `with value { body }` into one `let` per field of `value`'s
/// record type, each bound to `value.field`, nested so the innermost let's
/// body is `body` (§4.1).
fn resolve_with(value: &ParsedExpr, body: &ParsedExpr, span: arblang_ir::Span, scope: &InScopeMap) -> Result<RExpr> {
    let value_v = resolve_expr(value, scope)?;
    let fields = value_v
        .ty
        .as_record_fields()
        .ok_or_else(|| Error::NotARecord { found: TypeDescription(format!("{:?}", value_v.ty)), span })?
        .to_vec();

    let mut inner = scope.clone();
    let mut bindings = Vec::with_capacity(fields.len());
    for (field_name, field_ty) in &fields {
        if inner.is_duplicate(field_name) {
            return Err(Error::DuplicateDefinition { name: field_name.to_string(), span });
        }
        let access = Expr::field_access(value_v.clone(), field_name.clone(), field_ty.clone(), span);
        let variable = Expr::variable(field_name.clone(), access, span);
        inner.local.insert(field_name.clone(), variable.clone());
        bindings.push(variable);
    }

    let body_v = resolve_expr(body, &inner)?;
    let mut result = body_v;
    for variable in bindings.into_iter().rev() {
        result = Expr::let_(variable, result, span);
    }
    Ok(result)
}

fn resolve_unary(op: PUnaryOp, operand: &ParsedExpr, span: arblang_ir::Span, scope: &InScopeMap) -> Result<RExpr> {
    let value = resolve_expr(operand, scope)?;
    let ty = value.ty.clone();
    let ir_op = unary_op(op);
    match ir_op {
        UnaryOp::Exp | UnaryOp::Log | UnaryOp::Cos | UnaryOp::Sin | UnaryOp::Exprelr => {
            if !ty.is_real() {
                return Err(mismatch("a real-valued quantity", &ty, span));
            }
        }
        UnaryOp::Not => {
            if ty != Type::Boolean {
                return Err(mismatch("a boolean", &ty, span));
            }
        }
        UnaryOp::Neg => {
            if ty.as_record_fields().is_some() {
                return Err(Error::TypeMismatch {
                    expected: TypeDescription("a non-record type".into()),
                    found: TypeDescription(format!("{ty:?}")),
                    span,
                });
            }
        }
        // `abs` gets no type validation in the original resolver: its case
        // falls through to `default: break`.
        UnaryOp::Abs => {}
    }
    Ok(Expr::unary(ir_op, value, ty, span))
}

fn resolve_binary(op: PBinaryOp, lhs: &ParsedExpr, rhs: &ParsedExpr, span: arblang_ir::Span, scope: &InScopeMap) -> Result<RExpr> {
    let lhs_v = resolve_expr(lhs, scope)?;

    if op == PBinaryOp::Dot {
        let Some(fields) = lhs_v.ty.as_record_fields() else {
            return Err(Error::NotARecord { found: TypeDescription(format!("{:?}", lhs_v.ty)), span });
        };
        let ParsedExpr::Identifier { name: field_name, .. } = rhs else {
            return Err(Error::TypeMismatch {
                expected: TypeDescription("a bare field identifier".into()),
                found: TypeDescription("a compound expression".into()),
                span,
            });
        };
        let key = Name::from(field_name.as_ref());
        let field_ty = fields
            .iter()
            .find(|(n, _)| *n == key)
            .map(|(_, t)| t.clone())
            .ok_or_else(|| Error::UnknownField { field: field_name.to_string(), span })?;
        return Ok(Expr::field_access(lhs_v, key, field_ty, span));
    }

    let rhs_v = resolve_expr(rhs, scope)?;
    if rhs_v.ty.as_record_fields().is_some() || lhs_v.ty.as_record_fields().is_some() {
        return Err(Error::TypeMismatch {
            expected: TypeDescription("a non-record type".into()),
            found: TypeDescription("a record type".into()),
            span,
        });
    }
    let lhs_is_bool = lhs_v.ty == Type::Boolean;
    let rhs_is_bool = rhs_v.ty == Type::Boolean;
    if lhs_is_bool != rhs_is_bool {
        return Err(Error::TypeMismatch {
            expected: TypeDescription(format!("{:?}", lhs_v.ty)),
            found: TypeDescription(format!("{:?}", rhs_v.ty)),
            span,
        });
    }

    let lhs_q = lhs_v.ty.as_quantity();
    let rhs_q = rhs_v.ty.as_quantity();
    let ir_op = binary_op(op);

    let result_ty = match op {
        PBinaryOp::Min | PBinaryOp::Max | PBinaryOp::Add | PBinaryOp::Sub => match (lhs_q, rhs_q) {
            (Some(a), Some(b)) if a == b => lhs_v.ty.clone(),
            _ => return Err(mismatch(&format!("{:?}", lhs_v.ty), &rhs_v.ty, span)),
        },
        PBinaryOp::Mul => match (lhs_q, rhs_q) {
            (Some(a), Some(b)) => Type::Quantity(a.mul(b)),
            _ => return Err(mismatch("a quantity", &rhs_v.ty, span)),
        },
        PBinaryOp::Div => match (lhs_q, rhs_q) {
            (Some(a), Some(b)) => Type::Quantity(a.div(b)),
            _ => return Err(mismatch("a quantity", &rhs_v.ty, span)),
        },
        PBinaryOp::Pow => {
            let rhs_is_real = matches!(rhs_q, Some(q) if q.is_real());
            if !rhs_is_real {
                return Err(mismatch("a real-valued quantity exponent", &rhs_v.ty, span));
            }
            let Some(lhs_q) = lhs_q else {
                return Err(mismatch("a quantity base", &lhs_v.ty, span));
            };
            if lhs_q.is_real() {
                Type::real()
            } else {
                let ExprKind::IntLit(n) = &rhs_v.kind else {
                    return Err(mismatch("a literal integer exponent", &rhs_v.ty, span));
                };
                Type::Quantity(lhs_q.pow(*n as i32))
            }
        }
        PBinaryOp::Lt | PBinaryOp::Le | PBinaryOp::Gt | PBinaryOp::Ge | PBinaryOp::Eq | PBinaryOp::Ne => {
            match (lhs_q, rhs_q) {
                (Some(a), Some(b)) if a == b => Type::Boolean,
                _ => return Err(mismatch(&format!("{:?}", lhs_v.ty), &rhs_v.ty, span)),
            }
        }
        PBinaryOp::And | PBinaryOp::Or => {
            if let (Some(a), Some(b)) = (lhs_q, rhs_q) {
                if a != b {
                    return Err(mismatch(&format!("{:?}", lhs_v.ty), &rhs_v.ty, span));
                }
            }
            Type::Boolean
        }
        PBinaryOp::Dot => unreachable!("handled above"),
    };

    Ok(Expr::binary(ir_op, lhs_v, rhs_v, result_ty, span))
}

fn resolve_call(function: &str, args: &[ParsedExpr], span: arblang_ir::Span, scope: &InScopeMap) -> Result<RExpr> {
    let key = Name::from(function);
    let func = scope
        .functions
        .get(&key)
        .cloned()
        .ok_or_else(|| Error::UndefinedFunction { name: function.to_string(), span })?;

    let mut c_args = Vec::with_capacity(args.len());
    for a in args {
        c_args.push(resolve_expr(a, scope)?);
    }

    if func.args.len() != c_args.len() {
        return Err(Error::ArityMismatch {
            name: function.to_string(),
            expected: func.args.len(),
            found: c_args.len(),
            span,
        });
    }
    for (f_arg, c_arg) in func.args.iter().zip(c_args.iter()) {
        if f_arg.ty != c_arg.ty {
            return Err(mismatch(&format!("{:?}", f_arg.ty), &c_arg.ty, span));
        }
    }

    Ok(Expr::call(key, c_args, func.ret.clone(), span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arblang_ir::Quantity;
    use arblang_parsed::units::ParsedUnit;
    use arblang_parsed::ParsedExpr;

    fn span() -> arblang_ir::Span {
        arblang_ir::Span::DUMMY
    }

    fn ident(name: &str) -> ParsedExpr {
        ParsedExpr::Identifier { name: name.into(), span: span() }
    }

    #[test]
    fn resolves_an_identifier_through_scope_lookup_order() {
        let mut scope = InScopeMap::new();
        let arg = Expr::argument(Name::new("g"), Type::real(), span());
        scope.parameters.insert(Name::new("g"), arg.clone());
        let resolved = resolve_expr(&ident("g"), &scope).unwrap();
        assert!(std::rc::Rc::ptr_eq(&resolved, &arg));
    }

    #[test]
    fn pow_requires_literal_int_exponent_for_non_real_base() {
        let scope = InScopeMap::new();
        let lhs = ParsedExpr::Int { value: 2, unit: ParsedUnit::parse_simple("m", span()).unwrap(), span: span() };
        let rhs_lit = ParsedExpr::Int { value: 2, unit: ParsedUnit::None, span: span() };
        let ok = resolve_binary(PBinaryOp::Pow, &lhs, &rhs_lit, span(), &scope).unwrap();
        assert_eq!(ok.ty, Type::Quantity(Quantity::LENGTH.pow(2)));

        let rhs_non_lit = ident("n");
        let mut scope2 = InScopeMap::new();
        scope2.parameters.insert(Name::new("n"), Expr::argument(Name::new("n"), Type::real(), span()));
        let err = resolve_binary(PBinaryOp::Pow, &lhs, &rhs_non_lit, span(), &scope2);
        assert!(err.is_err());
    }

    #[test]
    fn abs_accepts_any_non_record_operand() {
        let scope = InScopeMap::new();
        let operand = ParsedExpr::Int { value: -3, unit: ParsedUnit::parse_simple("m", span()).unwrap(), span: span() };
        let resolved = resolve_unary(PUnaryOp::Abs, &operand, span(), &scope).unwrap();
        assert_eq!(resolved.ty, Type::Quantity(Quantity::LENGTH));
    }

    #[test]
    fn with_desugars_into_a_let_chain_over_record_fields() {
        let mut scope = InScopeMap::new();
        let rec_ty = Type::record(vec![(Name::new("m"), Type::real()), (Name::new("h"), Type::real())]);
        scope.parameters.insert(Name::new("s"), Expr::argument(Name::new("s"), rec_ty, span()));

        let with_expr = ParsedExpr::With {
            value: Box::new(ident("s")),
            body: Box::new(ident("m")),
            span: span(),
        };
        let resolved = resolve_expr(&with_expr, &scope).unwrap();
        assert!(matches!(resolved.kind, ExprKind::Let(..)));
        assert_eq!(resolved.ty, Type::real());
    }

    #[test]
    fn boolean_mismatch_is_rejected_regardless_of_operator() {
        let mut scope = InScopeMap::new();
        scope.parameters.insert(Name::new("flag"), Expr::argument(Name::new("flag"), Type::Boolean, span()));
        let lhs = ident("flag");
        let rhs = ParsedExpr::Int { value: 1, unit: ParsedUnit::None, span: span() };
        assert!(resolve_binary(PBinaryOp::And, &lhs, &rhs, span(), &scope).is_err());
    }
}
