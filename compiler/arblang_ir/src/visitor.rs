//! Generic child-expression traversal shared by every rewriting pass.
//!
//! Every pass from canonicalization through the pre-printer is "recurse into
//! children, maybe rebuild this node." Centralizing the children/rebuild
//! bookkeeping here means a pass only has to write the part of the rewrite
//! it actually cares about.

use crate::expr::{Expr, ExprKind, RExpr};

impl Expr {
    /// The direct child expressions of this node, in the order `rebuild`
    /// expects them back. Leaves return an empty vector.
    pub fn children(&self) -> Vec<RExpr> {
        match &self.kind {
            ExprKind::IntLit(_) | ExprKind::FloatLit(_) | ExprKind::Argument(_) => vec![],
            ExprKind::Variable(_, value) => vec![value.clone()],
            ExprKind::Object(fields) => fields.clone(),
            ExprKind::FieldAccess(object, _) => vec![object.clone()],
            ExprKind::Let(identifier, body) => vec![identifier.clone(), body.clone()],
            ExprKind::Conditional(cond, t, f) => vec![cond.clone(), t.clone(), f.clone()],
            ExprKind::Unary(_, arg) => vec![arg.clone()],
            ExprKind::Binary(_, l, r) => vec![l.clone(), r.clone()],
            ExprKind::Call(_, args) => args.clone(),
        }
    }

    /// Rebuilds this node's `ExprKind` with `new_children` substituted in
    /// for the slots `children()` reported, preserving every other field
    /// (operator, name, type).
    ///
    /// Panics if `new_children.len()` doesn't match `children().len()` for
    /// this node's shape; every call site in this workspace constructs
    /// `new_children` from a `map` over `children()`, so the lengths always
    /// agree by construction.
    #[allow(clippy::unwrap_used)]
    pub fn rebuild(&self, new_children: Vec<RExpr>) -> ExprKind {
        match &self.kind {
            ExprKind::IntLit(v) => ExprKind::IntLit(*v),
            ExprKind::FloatLit(v) => ExprKind::FloatLit(*v),
            ExprKind::Argument(name) => ExprKind::Argument(name.clone()),
            ExprKind::Variable(name, _) => {
                ExprKind::Variable(name.clone(), new_children.into_iter().next().unwrap())
            }
            ExprKind::Object(_) => ExprKind::Object(new_children),
            ExprKind::FieldAccess(_, field) => {
                ExprKind::FieldAccess(new_children.into_iter().next().unwrap(), field.clone())
            }
            ExprKind::Let(_, _) => {
                let mut it = new_children.into_iter();
                let identifier = it.next().unwrap();
                let body = it.next().unwrap();
                ExprKind::Let(identifier, body)
            }
            ExprKind::Conditional(_, _, _) => {
                let mut it = new_children.into_iter();
                let cond = it.next().unwrap();
                let t = it.next().unwrap();
                let f = it.next().unwrap();
                ExprKind::Conditional(cond, t, f)
            }
            ExprKind::Unary(op, _) => ExprKind::Unary(*op, new_children.into_iter().next().unwrap()),
            ExprKind::Binary(op, _, _) => {
                let mut it = new_children.into_iter();
                let l = it.next().unwrap();
                let r = it.next().unwrap();
                ExprKind::Binary(*op, l, r)
            }
            ExprKind::Call(name, _) => ExprKind::Call(name.clone(), new_children),
        }
    }
}

/// Recursively rewrites `expr` bottom-up: children are transformed first,
/// then the rebuilt node is passed through `post`. `post` is responsible for
/// fixing up the node's type if the rewrite changes it (e.g. constant
/// folding a binary op into a literal).
pub fn transform(expr: &RExpr, post: &mut impl FnMut(RExpr) -> RExpr) -> RExpr {
    let new_children: Vec<RExpr> = expr.children().iter().map(|c| transform(c, post)).collect();
    let same = new_children
        .iter()
        .zip(expr.children().iter())
        .all(|(a, b)| std::rc::Rc::ptr_eq(a, b));
    let rebuilt = if same {
        expr.clone()
    } else {
        let kind = expr.rebuild(new_children);
        Expr::new(kind, expr.ty.clone(), expr.span)
    };
    post(rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinaryOp;
    use crate::name::Name;
    use crate::span::Span;
    use crate::types::Type;

    #[test]
    fn children_and_rebuild_round_trip_binary() {
        let l = Expr::int(1, Type::real(), Span::DUMMY);
        let r = Expr::int(2, Type::real(), Span::DUMMY);
        let bin = Expr::binary(BinaryOp::Add, l.clone(), r.clone(), Type::real(), Span::DUMMY);
        let children = bin.children();
        assert_eq!(children.len(), 2);
        let rebuilt = bin.rebuild(children);
        match rebuilt {
            ExprKind::Binary(BinaryOp::Add, a, b) => {
                assert!(std::rc::Rc::ptr_eq(&a, &l));
                assert!(std::rc::Rc::ptr_eq(&b, &r));
            }
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn transform_rewrites_leaves() {
        let l = Expr::int(1, Type::real(), Span::DUMMY);
        let r = Expr::int(2, Type::real(), Span::DUMMY);
        let bin = Expr::binary(BinaryOp::Add, l, r, Type::real(), Span::DUMMY);

        let out = transform(&bin, &mut |e| match &e.kind {
            ExprKind::IntLit(v) => Expr::int(v + 10, e.ty.clone(), e.span),
            _ => e,
        });
        match &out.kind {
            ExprKind::Binary(_, l, r) => {
                assert!(matches!(l.kind, ExprKind::IntLit(11)));
                assert!(matches!(r.kind, ExprKind::IntLit(12)));
            }
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn name_display_and_flattening() {
        let _ = Name::new("x");
    }
}
