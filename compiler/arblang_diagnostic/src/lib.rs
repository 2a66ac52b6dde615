//! Error types for every stage of the middle-end (§7).
//!
//! One flat `Error` enum rather than a per-crate error type: every stage
//! from the frontend through the pre-printer funnels into the same
//! `Result<T, Error>`, so callers chaining stages with `?` never have to
//! convert between sibling error types.

use arblang_ir::Span;
use std::fmt;

/// A quantity's dimension vector, rendered for a `TypeMismatch` message
/// without pulling a `Type` import into every call site.
#[derive(Clone, Debug, Default)]
pub struct TypeDescription(pub String);

impl fmt::Display for TypeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    // -- frontend (supplementary; §1, §7) --
    #[error("{message}")]
    LexError { message: String, span: Span },

    #[error("{message}")]
    ParseError { message: String, span: Span },

    // -- resolver (§4.1, §7) --
    #[error("`{name}` is already defined")]
    DuplicateDefinition { name: String, span: Span },

    #[error("`{name}` is not defined")]
    UndefinedIdentifier { name: String, span: Span },

    #[error("function `{name}` is not defined")]
    UndefinedFunction { name: String, span: Span },

    #[error("`{name}` needs an explicit type annotation")]
    MissingTypeAnnotation { name: String, span: Span },

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: TypeDescription,
        found: TypeDescription,
        span: Span,
    },

    #[error("`{name}` expects {expected} argument(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("`{name}` must be declared with a trailing prime to be evolved")]
    InvalidDerivative { name: String, span: Span },

    #[error("expected a record type, found {found}")]
    NotARecord { found: TypeDescription, span: Span },

    #[error("no field `{field}` on this record")]
    UnknownField { field: String, span: Span },

    #[error("invalid unit expression: {message}")]
    InvalidUnit { message: String, span: Span },

    #[error("invalid binding or effect tag: {message}")]
    InvalidBinding { message: String, span: Span },

    // -- solver (§4.10, §4.11, §7) --
    #[error("cannot symbolically differentiate this expression")]
    NonDifferentiable { span: Span },

    #[error("state `{state}` has a non-diagonal derivative; only diagonal linear ODEs are supported")]
    UnsupportedODE { state: String, span: Span },

    // -- constant folder (§4.5, §7) --
    #[error("division by zero")]
    DivisionByZero { span: Span },

    // -- pre-printer (§4.12, §7) --
    #[error("mechanism kind {kind:?} is not yet supported by the pre-printer")]
    UnsupportedMechanismKind { kind: String, span: Span },

    #[error("bindable {bindable} is not yet supported by the pre-printer")]
    UnsupportedBindable { bindable: String, span: Span },

    #[error("affectable {affectable} is not yet supported by the pre-printer")]
    UnsupportedAffectable { affectable: String, span: Span },

    // -- cross-cutting --
    /// An invariant established by an earlier pass (§3) was found violated
    /// by a later one. This is always a bug in the compiler, not a malformed
    /// input, so it carries the offending pass's name instead of user-facing
    /// wording.
    #[error("internal invariant violated in `{pass}`: {message}")]
    InternalInvariant {
        pass: &'static str,
        message: String,
        span: Span,
    },
}

impl Error {
    /// The source span this error is anchored to, for rendering a caret
    /// under the offending text.
    pub fn span(&self) -> Span {
        match self {
            Error::LexError { span, .. }
            | Error::ParseError { span, .. }
            | Error::DuplicateDefinition { span, .. }
            | Error::UndefinedIdentifier { span, .. }
            | Error::UndefinedFunction { span, .. }
            | Error::MissingTypeAnnotation { span, .. }
            | Error::TypeMismatch { span, .. }
            | Error::ArityMismatch { span, .. }
            | Error::InvalidDerivative { span, .. }
            | Error::NotARecord { span, .. }
            | Error::UnknownField { span, .. }
            | Error::InvalidUnit { span, .. }
            | Error::InvalidBinding { span, .. }
            | Error::NonDifferentiable { span, .. }
            | Error::UnsupportedODE { span, .. }
            | Error::DivisionByZero { span, .. }
            | Error::UnsupportedMechanismKind { span, .. }
            | Error::UnsupportedBindable { span, .. }
            | Error::UnsupportedAffectable { span, .. }
            | Error::InternalInvariant { span, .. } => *span,
        }
    }

    /// Whether this error originates from a pass that is never supposed to
    /// fail on well-formed input further upstream — i.e. a compiler bug
    /// rather than a source-program mistake.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::InternalInvariant { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
