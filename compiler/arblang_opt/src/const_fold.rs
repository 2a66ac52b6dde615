//! Constant folding (§4.5).
//!
//! Operates bottom-up over one declaration's expression. Booleans have no
//! literal node of their own in this IR (§3.2); a folded boolean is an
//! `IntLit(0|1)` carrying `Type::Boolean`, the same representation the
//! resolver gives a comparison's static result.
//!
//! `constants` carries every global (constant, non-exported constant-valued
//! parameter) whose value has already folded to a literal; an `Argument`
//! naming one of those is replaced with its literal before folding continues,
//! standing in for the teacher's mutable-map bookkeeping in an IR where every
//! pass rebuilds rather than mutates (see `arblang_ir::expr`'s module doc).

use rustc_hash::FxHashMap;

use arblang_diagnostic::{Error, Result};
use arblang_ir::hash::structural_eq;
use arblang_ir::{BinaryOp, Expr, ExprKind, Name, RExpr, Type, UnaryOp};

pub type ConstMap = FxHashMap<Name, RExpr>;

/// Folds one expression to a fixpoint of single-pass rewrites, reporting
/// whether anything changed.
pub fn fold(expr: &RExpr, constants: &ConstMap) -> Result<(RExpr, bool)> {
    let mut changed = false;
    let folded = fold_once(expr, constants, &mut changed)?;
    Ok((folded, changed))
}

fn fold_once(expr: &RExpr, constants: &ConstMap, changed: &mut bool) -> Result<RExpr> {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) => Ok(expr.clone()),

        ExprKind::Argument(name) => match constants.get(name) {
            Some(literal) => {
                *changed = true;
                Ok(literal.clone())
            }
            None => Ok(expr.clone()),
        },

        ExprKind::Variable(name, value) => {
            let v = fold_once(value, constants, changed)?;
            Ok(Expr::variable(name.clone(), v, expr.span))
        }

        ExprKind::Object(fields) => {
            let mut new_fields = Vec::with_capacity(fields.len());
            for f in fields {
                new_fields.push(fold_once(f, constants, changed)?);
            }
            Ok(Expr::object(new_fields, expr.ty.clone(), expr.span))
        }

        ExprKind::FieldAccess(object, field) => {
            let obj = fold_once(object, constants, changed)?;
            if let ExprKind::Object(fields) = &obj.kind {
                if let Some(matched) = fields.iter().find_map(|f| match &f.kind {
                    ExprKind::Variable(n, v) if n == field => Some(v.clone()),
                    _ => None,
                }) {
                    *changed = true;
                    return Ok(matched);
                }
            }
            Ok(Expr::field_access(obj, field.clone(), expr.ty.clone(), expr.span))
        }

        ExprKind::Let(identifier, body) => {
            let ExprKind::Variable(name, value) = &identifier.kind else {
                unreachable!("a let's identifier is always a Variable")
            };
            let new_value = fold_once(value, constants, changed)?;
            let new_identifier = Expr::variable(name.clone(), new_value, identifier.span);
            let new_body = fold_once(body, constants, changed)?;
            Ok(Expr::let_(new_identifier, new_body, expr.span))
        }

        ExprKind::Conditional(cond, if_true, if_false) => {
            let c = fold_once(cond, constants, changed)?;
            let t = fold_once(if_true, constants, changed)?;
            let f = fold_once(if_false, constants, changed)?;
            if let Some(v) = literal_value(&c) {
                *changed = true;
                return Ok(if v != 0.0 { t } else { f });
            }
            Ok(Expr::conditional(c, t, f, expr.span))
        }

        ExprKind::Unary(op, arg) => {
            let a = fold_once(arg, constants, changed)?;
            if let Some(v) = literal_value(&a) {
                if let Some(result) = fold_unary(*op, v) {
                    *changed = true;
                    return Ok(literal(result, &expr.ty, expr.span));
                }
            }
            Ok(Expr::unary(*op, a, expr.ty.clone(), expr.span))
        }

        ExprKind::Binary(op, lhs, rhs) => {
            let l = fold_once(lhs, constants, changed)?;
            let r = fold_once(rhs, constants, changed)?;
            fold_binary_node(*op, l, r, &expr.ty, expr.span, changed)
        }

        ExprKind::Call(name, args) => {
            let mut new_args = Vec::with_capacity(args.len());
            for a in args {
                new_args.push(fold_once(a, constants, changed)?);
            }
            Ok(Expr::call(name.clone(), new_args, expr.ty.clone(), expr.span))
        }
    }
}

fn literal_value(expr: &RExpr) -> Option<f64> {
    match expr.kind {
        ExprKind::IntLit(v) => Some(v as f64),
        ExprKind::FloatLit(v) => Some(v),
        _ => None,
    }
}

/// Re-emits a folded numeric result as an int literal if integral, else a
/// float literal, retaining `ty` (§4.5).
fn literal(value: f64, ty: &Type, span: arblang_ir::Span) -> RExpr {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Expr::int(value as i64, ty.clone(), span)
    } else {
        Expr::float(value, ty.clone(), span)
    }
}

fn bool_literal(value: bool, span: arblang_ir::Span) -> RExpr {
    Expr::int(i64::from(value), Type::Boolean, span)
}

fn fold_binary_node(
    op: BinaryOp,
    l: RExpr,
    r: RExpr,
    ty: &Type,
    span: arblang_ir::Span,
    changed: &mut bool,
) -> Result<RExpr> {
    let lv = literal_value(&l);
    let rv = literal_value(&r);

    if let (Some(a), Some(b)) = (lv, rv) {
        match fold_binary_literal(op, a, b, span)? {
            Some(BinaryFold::Number(n)) => {
                *changed = true;
                return Ok(literal(n, ty, span));
            }
            Some(BinaryFold::Bool(b)) => {
                *changed = true;
                return Ok(bool_literal(b, span));
            }
            None => {}
        }
    }

    if let Some(simplified) = one_sided_identity(op, &l, lv, &r, rv) {
        *changed = true;
        return Ok(simplified);
    }

    if structural_eq(&l, &r) {
        if let Some(simplified) = structural_identity(op, &l, ty, span) {
            *changed = true;
            return Ok(simplified);
        }
    }

    if op == BinaryOp::Div {
        if let Some(k) = rv {
            if k == 0.0 {
                return Err(Error::DivisionByZero { span });
            }
            // x / k = x * (1/k); the reciprocal inverts k's quantity.
            *changed = true;
            let recip_ty = invert_quantity(&r.ty);
            let recip = literal(1.0 / k, &recip_ty, span);
            return Ok(Expr::binary(BinaryOp::Mul, l, recip, ty.clone(), span));
        }
    }

    Ok(Expr::binary(op, l, r, ty.clone(), span))
}

/// Folds a unary literal application (§4.5). `exprelr` is `v / (log(v) - 1)`,
/// the rate-correction used by channel kinetics to avoid the removable
/// singularity at `v == 0`.
fn fold_unary(op: UnaryOp, v: f64) -> Option<f64> {
    match op {
        UnaryOp::Exp => Some(v.exp()),
        UnaryOp::Log => Some(v.ln()),
        UnaryOp::Cos => Some(v.cos()),
        UnaryOp::Sin => Some(v.sin()),
        UnaryOp::Abs => Some(v.abs()),
        UnaryOp::Exprelr => Some(v / (v.ln() - 1.0)),
        UnaryOp::Neg => Some(-v),
        UnaryOp::Not => Some(if v == 0.0 { 1.0 } else { 0.0 }),
    }
}

fn invert_quantity(ty: &Type) -> Type {
    match ty {
        Type::Quantity(q) => Type::Quantity(q.pow(-1)),
        other => other.clone(),
    }
}

enum BinaryFold {
    Number(f64),
    Bool(bool),
}

fn fold_binary_literal(op: BinaryOp, l: f64, r: f64, span: arblang_ir::Span) -> Result<Option<BinaryFold>> {
    use BinaryOp::*;
    Ok(match op {
        Add => Some(BinaryFold::Number(l + r)),
        Sub => Some(BinaryFold::Number(l - r)),
        Mul => Some(BinaryFold::Number(l * r)),
        Div => {
            if r == 0.0 {
                return Err(Error::DivisionByZero { span });
            }
            Some(BinaryFold::Number(l / r))
        }
        Pow => Some(BinaryFold::Number(l.powf(r))),
        Min => Some(BinaryFold::Number(l.min(r))),
        Max => Some(BinaryFold::Number(l.max(r))),
        Lt => Some(BinaryFold::Bool(l < r)),
        Le => Some(BinaryFold::Bool(l <= r)),
        Gt => Some(BinaryFold::Bool(l > r)),
        Ge => Some(BinaryFold::Bool(l >= r)),
        Eq => Some(BinaryFold::Bool(l == r)),
        Ne => Some(BinaryFold::Bool(l != r)),
        And => Some(BinaryFold::Bool(l != 0.0 && r != 0.0)),
        Or => Some(BinaryFold::Bool(l != 0.0 || r != 0.0)),
        Dot => None,
    })
}

/// Identities applicable when exactly one operand is a known literal (§4.5).
fn one_sided_identity(op: BinaryOp, l: &RExpr, lv: Option<f64>, r: &RExpr, rv: Option<f64>) -> Option<RExpr> {
    use BinaryOp::*;
    match (op, lv, rv) {
        (Add, Some(0.0), None) => Some(r.clone()),
        (Sub, Some(0.0), None) => Some(Expr::unary(UnaryOp::Neg, r.clone(), r.ty.clone(), r.span)),
        (Mul, Some(0.0), None) => Some(l.clone()),
        (Div, Some(0.0), None) => Some(l.clone()),
        (And, Some(n), None) if n == 0.0 => Some(l.clone()),
        (Or, Some(n), None) if n == 0.0 => Some(r.clone()),
        (Pow, Some(0.0), None) => Some(l.clone()),

        (And, Some(n), None) if n != 0.0 => Some(r.clone()),
        (Or, Some(n), None) if n != 0.0 => Some(l.clone()),
        (Pow, Some(1.0), None) => Some(l.clone()),

        (Add, None, Some(0.0)) => Some(l.clone()),
        (Sub, None, Some(0.0)) => Some(l.clone()),
        (Mul, None, Some(0.0)) => Some(r.clone()),
        (And, None, Some(n)) if n == 0.0 => Some(r.clone()),
        (Or, None, Some(n)) if n == 0.0 => Some(l.clone()),
        (And, None, Some(n)) if n != 0.0 => Some(l.clone()),
        (Or, None, Some(n)) if n != 0.0 => Some(r.clone()),
        (Pow, None, Some(0.0)) => Some(Expr::int(1, l.ty.clone(), l.span)),
        (Pow, None, Some(1.0)) => Some(l.clone()),

        _ => None,
    }
}

/// Identities applicable when both operands are structurally identical
/// (§4.5); cheap to check here since CSE normally runs right after this pass.
/// `ty` is the binary node's own result type — used for `x / x = 1`, which is
/// dimensionless regardless of `x`'s quantity; `Sub`/`Min`/`Max` keep the
/// operand's type since they preserve its dimension.
fn structural_identity(op: BinaryOp, x: &RExpr, ty: &Type, span: arblang_ir::Span) -> Option<RExpr> {
    use BinaryOp::*;
    match op {
        Sub => Some(Expr::int(0, x.ty.clone(), span)),
        Div => Some(Expr::int(1, ty.clone(), span)),
        Lt | Ne => Some(bool_literal(false, span)),
        Le | Eq => Some(bool_literal(true, span)),
        Min | Max => Some(x.clone()),
        _ => None,
    }
}
