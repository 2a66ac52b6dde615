//! Lexer and recursive-descent parser (§1, supplementary; §6).
//!
//! Lexing and parsing are explicitly out of the core middle-end's scope —
//! the core starts from an already-parsed `arblang_parsed::ParsedMechanism`
//! — but a runnable crate needs a way to get there from `.arblang` source
//! text, so this crate supplies it.

pub mod lexer;
pub mod parser;
pub mod token;

use arblang_diagnostic::Result;
use arblang_parsed::ParsedMechanism;

/// Lexes and parses a single mechanism source file.
pub fn parse_source(src: &str) -> Result<ParsedMechanism> {
    let tokens = lexer::lex(src)?;
    parser::parse(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_density_mechanism() {
        let mech = parse_source(
            r"
            density mechanism pas {
                parameter g: conductance = 0.001 [S/cm^2];
                parameter e: voltage = -70 [mV];
                bind v = membrane_potential;
                effect current_density = g * (v - e);
            }
            ",
        )
        .unwrap();
        assert_eq!(&*mech.name, "pas");
        assert_eq!(mech.parameters.len(), 2);
        assert_eq!(mech.effects.len(), 1);
    }

    #[test]
    fn surfaces_lex_errors_through_the_same_result() {
        assert!(parse_source("density mechanism x { parameter g = 1 $ }").is_err());
    }
}
