//! The unit grammar (§6): a prefixed SI symbol, or a binary combination of
//! units via `*`, `/`, `^integer`.
//!
//! Grounded on `unit_expressions.cpp`'s `string_to_pref`/`string_to_sym`
//! tables and the quantity mapping in the same file's `to_type` overload for
//! `simple_unit`.

use arblang_diagnostic::{Error, Result};
use arblang_ir::{Quantity, Span};

/// An SI prefix, spanning `Y` (10^24) down to `y` (10^-24).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Prefix {
    Y,
    Z,
    E,
    P,
    T,
    G,
    Mega,
    K,
    H,
    Da,
    D,
    C,
    Milli,
    U,
    N,
    P2,
    F,
    A,
    Z2,
    Y2,
    None,
}

impl Prefix {
    /// The power of ten this prefix contributes.
    pub fn power(self) -> i32 {
        match self {
            Prefix::Y => 24,
            Prefix::Z => 21,
            Prefix::E => 18,
            Prefix::P => 15,
            Prefix::T => 12,
            Prefix::G => 9,
            Prefix::Mega => 6,
            Prefix::K => 3,
            Prefix::H => 2,
            Prefix::Da => 1,
            Prefix::D => -1,
            Prefix::C => -2,
            Prefix::Milli => -3,
            Prefix::U => -6,
            Prefix::N => -9,
            Prefix::P2 => -12,
            Prefix::F => -15,
            Prefix::A => -18,
            Prefix::Z2 => -21,
            Prefix::Y2 => -24,
            Prefix::None => 0,
        }
    }

    /// Parses a prefix string (`"k"`, `"da"`, `"u"`, …). The two-letter `da`
    /// prefix is the only multi-character one; every other prefix is a
    /// single ASCII letter, which is why the lookup tries the whole string
    /// first rather than peeling one character at a time.
    fn parse(s: &str) -> Option<Prefix> {
        Some(match s {
            "Y" => Prefix::Y,
            "Z" => Prefix::Z,
            "E" => Prefix::E,
            "P" => Prefix::P,
            "T" => Prefix::T,
            "G" => Prefix::G,
            "M" => Prefix::Mega,
            "k" => Prefix::K,
            "h" => Prefix::H,
            "da" => Prefix::Da,
            "d" => Prefix::D,
            "c" => Prefix::C,
            "m" => Prefix::Milli,
            "u" => Prefix::U,
            "n" => Prefix::N,
            "p" => Prefix::P2,
            "f" => Prefix::F,
            "a" => Prefix::A,
            "z" => Prefix::Z2,
            "y" => Prefix::Y2,
            _ => return None,
        })
    }
}

/// An SI base or derived symbol (§6).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Symbol {
    M,
    G,
    S,
    A,
    K,
    Mol,
    Hz,
    L,
    LowerL,
    N,
    Pa,
    W,
    J,
    C,
    V,
    F,
    H,
    Ohm,
    S2,
    M2,
}

impl Symbol {
    fn parse(s: &str) -> Option<Symbol> {
        Some(match s {
            "m" => Symbol::M,
            "g" => Symbol::G,
            "s" => Symbol::S,
            "A" => Symbol::A,
            "K" => Symbol::K,
            "mol" => Symbol::Mol,
            "Hz" => Symbol::Hz,
            "L" => Symbol::L,
            "l" => Symbol::LowerL,
            "N" => Symbol::N,
            "Pa" => Symbol::Pa,
            "W" => Symbol::W,
            "J" => Symbol::J,
            "C" => Symbol::C,
            "V" => Symbol::V,
            "F" => Symbol::F,
            "H" => Symbol::H,
            "Ohm" => Symbol::Ohm,
            "S" => Symbol::S2,
            "M" => Symbol::M2,
            _ => return None,
        })
    }

    /// The symbol's SI dimension vector, derived from its definition in
    /// terms of the six base dimensions.
    fn quantity(self) -> Quantity {
        match self {
            Symbol::A => Quantity::CURRENT,
            Symbol::M => Quantity::LENGTH,
            Symbol::G => Quantity::MASS,
            Symbol::S => Quantity::TIME,
            Symbol::K => Quantity::TEMPERATURE,
            Symbol::Mol => Quantity::AMOUNT,
            Symbol::Hz => Quantity::TIME.pow(-1),
            Symbol::L | Symbol::LowerL => Quantity::LENGTH.pow(3),
            Symbol::N => Quantity::MASS.mul(Quantity::LENGTH).mul(Quantity::TIME.pow(-2)),
            Symbol::Pa => Quantity::MASS.mul(Quantity::LENGTH.pow(-1)).mul(Quantity::TIME.pow(-2)),
            Symbol::W => Quantity::MASS.mul(Quantity::LENGTH.pow(2)).mul(Quantity::TIME.pow(-3)),
            Symbol::J => Quantity::MASS.mul(Quantity::LENGTH.pow(2)).mul(Quantity::TIME.pow(-2)),
            Symbol::C => Quantity::CURRENT.mul(Quantity::TIME),
            Symbol::V => Quantity::voltage(),
            Symbol::F => Quantity::CURRENT
                .pow(2)
                .mul(Quantity::TIME.pow(4))
                .mul(Quantity::MASS.pow(-1))
                .mul(Quantity::LENGTH.pow(-2)),
            Symbol::H => Quantity::MASS
                .mul(Quantity::LENGTH.pow(2))
                .mul(Quantity::TIME.pow(-2))
                .mul(Quantity::CURRENT.pow(-2)),
            Symbol::Ohm => Quantity::MASS
                .mul(Quantity::LENGTH.pow(2))
                .mul(Quantity::TIME.pow(-3))
                .mul(Quantity::CURRENT.pow(-2)),
            Symbol::S2 => Quantity::REAL
                .div(
                    Quantity::MASS
                        .mul(Quantity::LENGTH.pow(2))
                        .mul(Quantity::TIME.pow(-3))
                        .mul(Quantity::CURRENT.pow(-2)),
                ),
            Symbol::M2 => Quantity::concentration(),
        }
    }
}

/// A unit expression, parsed but not yet normalized: `m`, `nA`, `nA/um^2`.
#[derive(Clone, Debug)]
pub enum ParsedUnit {
    None,
    Simple { prefix: Prefix, symbol: Symbol, span: Span },
    /// A bare exponent, valid only as the right operand of `^`.
    Integer { value: i32, span: Span },
    Binary { op: UnitOp, lhs: Box<ParsedUnit>, rhs: Box<ParsedUnit>, span: Span },
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnitOp {
    Mul,
    Div,
    Pow,
}

impl ParsedUnit {
    /// Parses a single prefixed-symbol token (no `*`/`/`/`^` combinators;
    /// those are assembled by the caller as it reads `token * token` in the
    /// surface grammar).
    pub fn parse_simple(s: &str, span: Span) -> Result<ParsedUnit> {
        if let Some(symbol) = Symbol::parse(s) {
            return Ok(ParsedUnit::Simple { prefix: Prefix::None, symbol, span });
        }
        for split in 1..s.len() {
            if !s.is_char_boundary(split) {
                continue;
            }
            let (pref_str, sym_str) = s.split_at(split);
            if let (Some(prefix), Some(symbol)) = (Prefix::parse(pref_str), Symbol::parse(sym_str)) {
                return Ok(ParsedUnit::Simple { prefix, symbol, span });
            }
        }
        Err(Error::InvalidUnit { message: format!("`{s}` is not a recognized unit"), span })
    }
}

/// Normalizes a unit expression to its quantity and the accumulated power of
/// ten a literal carrying this unit must be scaled by (§6: "normalization
/// strips the prefix and multiplies the literal by ten to the accumulated
/// power").
pub fn normalize_unit(unit: &ParsedUnit) -> Result<(Quantity, i32)> {
    match unit {
        ParsedUnit::None => Ok((Quantity::REAL, 0)),
        ParsedUnit::Simple { prefix, symbol, .. } => Ok((symbol.quantity(), prefix.power())),
        ParsedUnit::Integer { value, .. } => Ok((Quantity::REAL, *value)),
        ParsedUnit::Binary { op, lhs, rhs, span } => {
            let (lq, lp) = normalize_unit(lhs)?;
            let (rq, rp) = normalize_unit(rhs)?;
            match op {
                UnitOp::Mul => Ok((lq.mul(rq), lp + rp)),
                UnitOp::Div => Ok((lq.div(rq), lp - rp)),
                UnitOp::Pow => {
                    let ParsedUnit::Integer { value, .. } = rhs.as_ref() else {
                        return Err(Error::InvalidUnit {
                            message: "the exponent of `^` in a unit expression must be an integer".into(),
                            span: *span,
                        });
                    };
                    Ok((lq.pow(*value), lp * value))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nano_ampere_per_micrometer_squared() {
        let na = ParsedUnit::parse_simple("nA", Span::DUMMY).unwrap();
        let um = ParsedUnit::parse_simple("um", Span::DUMMY).unwrap();
        let um2 = ParsedUnit::Binary {
            op: UnitOp::Pow,
            lhs: Box::new(um),
            rhs: Box::new(ParsedUnit::Integer { value: 2, span: Span::DUMMY }),
            span: Span::DUMMY,
        };
        let unit = ParsedUnit::Binary {
            op: UnitOp::Div,
            lhs: Box::new(na),
            rhs: Box::new(um2),
            span: Span::DUMMY,
        };
        let (q, power) = normalize_unit(&unit).unwrap();
        assert_eq!(q, Quantity::current_density());
        // nA: prefix n (-9); um^2: prefix u (-6) * 2 = -12; n / u^2 = -9 - (-12) = 3
        assert_eq!(power, 3);
    }

    #[test]
    fn plain_volt_has_zero_power() {
        let v = ParsedUnit::parse_simple("V", Span::DUMMY).unwrap();
        let (q, power) = normalize_unit(&v).unwrap();
        assert_eq!(q, Quantity::voltage());
        assert_eq!(power, 0);
    }

    #[test]
    fn unrecognized_unit_errors() {
        assert!(ParsedUnit::parse_simple("bogus", Span::DUMMY).is_err());
    }
}
