//! Core compilation pipeline: parse → resolve → canonicalize → optimize →
//! solve → pre-print.
//!
//! Portable (no filesystem IO beyond the caller handing us a `&str`).
//! Grounded on the teacher's `ori_compiler::pipeline`: one `CompileConfig`,
//! one staged function returning early on the first error, a result struct
//! that never panics on failure.

use arblang_diagnostic::Error;

use crate::output::{CompileOutput, ErrorPhase};

/// Configuration for a compilation run.
pub struct CompileConfig {
    /// Logical file path, used only in diagnostics (never for IO).
    pub file_path: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            file_path: "input.arbl".to_string(),
        }
    }
}

/// Runs the full middle-end pipeline over one mechanism's source text.
///
/// Each stage is a plain function call; the first one to return an `Err`
/// short-circuits the rest, tagged with the phase that produced it so a
/// caller (`arblangc`) can report it without re-deriving where it came from.
#[tracing::instrument(level = "info", skip_all, fields(file = %config.file_path))]
pub fn compile(source: &str, config: &CompileConfig) -> CompileOutput {
    let parsed = match arblang_frontend::parse_source(source) {
        Ok(parsed) => parsed,
        Err(e) => return CompileOutput::failure(ErrorPhase::Parse, e),
    };

    let resolved = match arblang_resolve::resolve_mechanism(&parsed) {
        Ok(resolved) => resolved,
        Err(e) => return CompileOutput::failure(ErrorPhase::Resolve, e),
    };

    let canonicalized = arblang_canon::normalize(resolved);

    let optimized = match arblang_opt::optimize(canonicalized) {
        Ok(optimized) => optimized,
        Err(e) => return CompileOutput::failure(ErrorPhase::Optimize, e),
    };

    let solved = match arblang_solve::solve_mechanism(optimized) {
        Ok(solved) => solved,
        Err(e) => return CompileOutput::failure(ErrorPhase::Solve, e),
    };

    let printable = match arblang_preprint::build_printable_mechanism(&solved) {
        Ok(printable) => printable,
        Err(e) => return CompileOutput::failure(ErrorPhase::Preprint, e),
    };

    CompileOutput::success(solved, printable)
}

/// Render an `Error` the way `arblangc` presents it to a human: the
/// message, with an internal-invariant error additionally flagged as a
/// compiler bug rather than a problem with the input mechanism.
pub fn render_error(file_path: &str, error: &Error) -> String {
    if error.is_internal() {
        format!("{file_path}: internal compiler error: {error}")
    } else {
        format!("{file_path}: {error}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_well_formed_mechanism_compiles_successfully() {
        let output = compile(
            r"
            density mechanism pas {
                parameter g: conductance = 0.001 [S/cm^2];
                parameter e: voltage = -70 [mV];
                bind v = membrane_potential;
                effect current_density = g * (v - e);
            }
            ",
            &CompileConfig::default(),
        );
        assert!(output.is_success());
        assert!(output.error.is_none());
        assert!(output.mechanism.is_some());
        assert!(output.ir.is_some());
    }

    #[test]
    fn an_undefined_identifier_fails_at_the_resolve_phase() {
        let output = compile(
            r"
            density mechanism broken {
                effect current_density = gbar;
            }
            ",
            &CompileConfig::default(),
        );
        assert!(!output.is_success());
        assert_eq!(output.error_phase, Some(ErrorPhase::Resolve));
        assert!(matches!(output.error, Some(Error::UndefinedIdentifier { .. })));
    }

    #[test]
    fn a_syntax_error_fails_at_the_parse_phase() {
        let output = compile("density mechanism (((", &CompileConfig::default());
        assert!(!output.is_success());
        assert_eq!(output.error_phase, Some(ErrorPhase::Parse));
    }
}
