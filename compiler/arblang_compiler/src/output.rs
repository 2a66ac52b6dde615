//! Result types for the portable compilation pipeline.
//!
//! Mirrors the teacher's `ori_compiler::output`, but collapses its three
//! separate error collections (parse/type/runtime diagnostics) into one: every
//! stage here already funnels into the same `arblang_diagnostic::Error`, so
//! there is nothing left for this crate to unify.

use arblang_diagnostic::Error;
use arblang_ir::Mechanism;
use arblang_preprint::PrintableMechanism;

/// Which compilation phase produced an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPhase {
    Parse,
    Resolve,
    Canonicalize,
    Optimize,
    Solve,
    Preprint,
}

/// Result of running the full pipeline over one mechanism source file.
#[derive(Clone, Debug)]
pub struct CompileOutput {
    /// The post-solve IR, present on success (`--emit=ir`'s source).
    pub ir: Option<Mechanism>,
    /// The pre-printer's structured description, present on success
    /// (`--emit=preprint`'s source, and the default).
    pub mechanism: Option<PrintableMechanism>,
    /// The error that stopped the pipeline, present on failure.
    pub error: Option<Error>,
    /// Which phase raised `error`, if any.
    pub error_phase: Option<ErrorPhase>,
}

impl CompileOutput {
    pub fn success(ir: Mechanism, mechanism: PrintableMechanism) -> Self {
        Self {
            ir: Some(ir),
            mechanism: Some(mechanism),
            error: None,
            error_phase: None,
        }
    }

    pub fn failure(phase: ErrorPhase, error: Error) -> Self {
        Self {
            ir: None,
            mechanism: None,
            error: Some(error),
            error_phase: Some(phase),
        }
    }

    pub fn is_success(&self) -> bool {
        self.mechanism.is_some()
    }
}
