//! The parsed (unresolved) syntax tree and the unit grammar (§6).
//!
//! Lexing and parsing are explicitly out of scope for the core (§1); this
//! crate defines only the *shape* of what a parser must produce, plus the
//! unit algebra that both the parser (literal suffixes) and the resolver
//! (type annotations) need.

pub mod tree;
pub mod units;

pub use tree::{
    BinaryOp, ParsedBind, ParsedConstant, ParsedEffect, ParsedEvolve, ParsedExport, ParsedExpr, ParsedFunction,
    ParsedFunctionArg, ParsedInitial, ParsedMechanism, ParsedMechanismKind, ParsedOnEvent, ParsedParameter,
    ParsedRecordAlias, ParsedState, ParsedType, QuantityName, TypeOp, UnaryOp,
};
pub use units::{normalize_unit, ParsedUnit, Prefix, Symbol, UnitOp};
