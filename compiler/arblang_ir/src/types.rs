//! The Arblang type system (§3.1).
//!
//! A type is a quantity (an SI dimension vector), a boolean, or a record.
//! Quantity arithmetic is exponent arithmetic: multiplication adds exponents,
//! division subtracts them, integer powers scale them.

use std::fmt;
use std::rc::Rc;

use crate::name::Name;

/// The six SI base dimensions, as integer exponents. A quantity is *real*
/// iff every exponent is zero.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Quantity {
    pub length: i32,
    pub mass: i32,
    pub time: i32,
    pub current: i32,
    pub amount: i32,
    pub temperature: i32,
}

impl Quantity {
    pub const REAL: Quantity = Quantity {
        length: 0,
        mass: 0,
        time: 0,
        current: 0,
        amount: 0,
        temperature: 0,
    };

    pub const LENGTH: Quantity = Quantity {
        length: 1,
        ..Quantity::REAL
    };
    pub const MASS: Quantity = Quantity {
        mass: 1,
        ..Quantity::REAL
    };
    pub const TIME: Quantity = Quantity {
        time: 1,
        ..Quantity::REAL
    };
    pub const CURRENT: Quantity = Quantity {
        current: 1,
        ..Quantity::REAL
    };
    pub const AMOUNT: Quantity = Quantity {
        amount: 1,
        ..Quantity::REAL
    };
    pub const TEMPERATURE: Quantity = Quantity {
        temperature: 1,
        ..Quantity::REAL
    };

    /// Named derived quantities used throughout the resolver and solver.
    pub fn voltage() -> Quantity {
        // V = kg * m^2 * s^-3 * A^-1
        Quantity::MASS.mul(Quantity::LENGTH.pow(2)).mul(Quantity::TIME.pow(-3)).mul(Quantity::CURRENT.pow(-1))
    }

    pub fn current_density() -> Quantity {
        Quantity::CURRENT.mul(Quantity::LENGTH.pow(-2))
    }

    pub fn concentration() -> Quantity {
        Quantity::AMOUNT.mul(Quantity::LENGTH.pow(-3))
    }

    pub fn concentration_rate() -> Quantity {
        Quantity::concentration().mul(Quantity::TIME.pow(-1))
    }

    pub fn molar_flux() -> Quantity {
        // flux density: amount per area per time
        Quantity::AMOUNT.mul(Quantity::LENGTH.pow(-2)).mul(Quantity::TIME.pow(-1))
    }

    pub fn molar_flow_rate() -> Quantity {
        Quantity::AMOUNT.mul(Quantity::TIME.pow(-1))
    }

    pub fn charge() -> Quantity {
        Quantity::CURRENT.mul(Quantity::TIME)
    }

    pub fn frequency() -> Quantity {
        Quantity::TIME.pow(-1)
    }

    pub fn resistance() -> Quantity {
        Quantity::MASS.mul(Quantity::LENGTH.pow(2)).mul(Quantity::TIME.pow(-3)).mul(Quantity::CURRENT.pow(-2))
    }

    pub fn conductance() -> Quantity {
        Quantity::REAL.div(Quantity::resistance())
    }

    pub fn capacitance() -> Quantity {
        Quantity::CURRENT.pow(2).mul(Quantity::TIME.pow(4)).mul(Quantity::MASS.pow(-1)).mul(Quantity::LENGTH.pow(-2))
    }

    pub fn force() -> Quantity {
        Quantity::MASS.mul(Quantity::LENGTH).mul(Quantity::TIME.pow(-2))
    }

    pub fn energy() -> Quantity {
        Quantity::MASS.mul(Quantity::LENGTH.pow(2)).mul(Quantity::TIME.pow(-2))
    }

    pub fn power() -> Quantity {
        Quantity::MASS.mul(Quantity::LENGTH.pow(2)).mul(Quantity::TIME.pow(-3))
    }

    pub fn area() -> Quantity {
        Quantity::LENGTH.pow(2)
    }

    pub fn volume() -> Quantity {
        Quantity::LENGTH.pow(3)
    }

    pub fn is_real(self) -> bool {
        self == Quantity::REAL
    }

    pub fn mul(self, other: Quantity) -> Quantity {
        Quantity {
            length: self.length + other.length,
            mass: self.mass + other.mass,
            time: self.time + other.time,
            current: self.current + other.current,
            amount: self.amount + other.amount,
            temperature: self.temperature + other.temperature,
        }
    }

    pub fn div(self, other: Quantity) -> Quantity {
        Quantity {
            length: self.length - other.length,
            mass: self.mass - other.mass,
            time: self.time - other.time,
            current: self.current - other.current,
            amount: self.amount - other.amount,
            temperature: self.temperature - other.temperature,
        }
    }

    pub fn pow(self, n: i32) -> Quantity {
        Quantity {
            length: self.length * n,
            mass: self.mass * n,
            time: self.time * n,
            current: self.current * n,
            amount: self.amount * n,
            temperature: self.temperature * n,
        }
    }

    /// Time-derivative of a quantity: `q / time` (§3.1).
    pub fn derivative(self) -> Quantity {
        self.div(Quantity::TIME)
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_real() {
            return write!(f, "real");
        }
        write!(
            f,
            "L^{} M^{} T^{} I^{} N^{} Θ^{}",
            self.length, self.mass, self.time, self.current, self.amount, self.temperature
        )
    }
}

/// A field of a record type: `(name, type)`.
pub type Field = (Name, Type);

/// A resolved type: a quantity, a boolean, or a record.
///
/// Record equality is order-independent on field names (§3.1): two records
/// are equal iff they carry the same set of `(name, type)` pairs, regardless
/// of declaration order.
#[derive(Clone, Debug)]
pub enum Type {
    Quantity(Quantity),
    Boolean,
    Record(Rc<[Field]>),
}

impl Type {
    pub fn real() -> Type {
        Type::Quantity(Quantity::REAL)
    }

    pub fn record(fields: Vec<Field>) -> Type {
        Type::Record(Rc::from(fields.into_boxed_slice()))
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Type::Quantity(q) if q.is_real())
    }

    pub fn as_quantity(&self) -> Option<Quantity> {
        match self {
            Type::Quantity(q) => Some(*q),
            _ => None,
        }
    }

    pub fn as_record_fields(&self) -> Option<&[Field]> {
        match self {
            Type::Record(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn field_type(&self, name: &Name) -> Option<&Type> {
        self.as_record_fields()?.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Time-derivative of a type, lifted pointwise through records
    /// (§3.1). Booleans have no derivative.
    pub fn time_derivative(&self) -> Option<Type> {
        match self {
            Type::Quantity(q) => Some(Type::Quantity(q.derivative())),
            Type::Boolean => None,
            Type::Record(fields) => {
                let mut derived = Vec::with_capacity(fields.len());
                for (name, ty) in fields.iter() {
                    derived.push((name.clone(), ty.time_derivative()?));
                }
                Some(Type::record(derived))
            }
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Quantity(a), Type::Quantity(b)) => a == b,
            (Type::Boolean, Type::Boolean) => true,
            (Type::Record(a), Type::Record(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                a.iter().all(|(name, ty)| {
                    b.iter().any(|(n2, t2)| n2 == name && t2 == ty)
                })
            }
            _ => false,
        }
    }
}
impl Eq for Type {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_equality_is_order_independent() {
        let a = Type::record(vec![
            (Name::new("m"), Type::real()),
            (Name::new("h"), Type::real()),
        ]);
        let b = Type::record(vec![
            (Name::new("h"), Type::real()),
            (Name::new("m"), Type::real()),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn quantity_algebra() {
        let current_density = Quantity::CURRENT.mul(Quantity::LENGTH.pow(-2));
        assert_eq!(current_density, Quantity::current_density());
        assert_eq!(current_density.mul(Quantity::LENGTH.pow(2)), Quantity::CURRENT);
    }

    #[test]
    fn derivative_of_quantity_divides_by_time() {
        let v = Quantity::voltage();
        assert_eq!(v.derivative(), v.div(Quantity::TIME));
    }

    #[test]
    fn derived_quantities_compose_from_base_ones() {
        assert_eq!(Quantity::conductance(), Quantity::REAL.div(Quantity::resistance()));
        assert_eq!(Quantity::capacitance().mul(Quantity::voltage()), Quantity::charge());
        assert_eq!(Quantity::power(), Quantity::energy().div(Quantity::TIME));
    }

    #[test]
    fn derivative_lifts_through_records_and_rejects_booleans() {
        let rec = Type::record(vec![(Name::new("m"), Type::real())]);
        assert!(rec.time_derivative().is_some());
        assert!(Type::Boolean.time_derivative().is_none());
    }
}
