//! Physical quantities and the conversion between experimental and internal
//! units.
//!
//! All physics is carried out in Hartree atomic units (ħ = mₑ = e = 1). Values
//! coming from the instrument configuration or from the detector are in
//! experimental units (mm, ns, eV, V, G, degrees) and must go through
//! `to_internal()` before being used, and through `from_internal()` on the
//! way out. A `Quantity` carries its dimension along, so that a length cannot
//! be silently used where a time or a field strength was expected.

use crate::numeric::{reals::consts::PI, Float};

use thiserror::Error;

use std::{
    fmt::{self, Display},
    ops::{Div, Mul, Neg},
};

/// Bohr radius (m)
pub const BOHR_RADIUS: Float = 5.291_772_109_03e-11;

/// Atomic unit of time (s)
pub const ATOMIC_TIME: Float = 2.418_884_326_585_7e-17;

/// Hartree energy (eV)
pub const HARTREE: Float = 27.211_386_245_988;

/// Atomic unit of magnetic flux density (T)
pub const ATOMIC_MAGNETIC_FIELD: Float = 2.350_517_567_58e5;

/// Unified atomic mass unit (electron masses)
pub const ATOMIC_MASS_UNIT: Float = 1_822.888_486_209;

/// Physical dimension, as integer exponents of the base dimensions
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub length: i8,
    pub time: i8,
    pub mass: i8,
    pub charge: i8,
    pub angle: i8,
}
//
#[allow(missing_docs)]
impl Dimension {
    pub const DIMENSIONLESS: Self = Self::new(0, 0, 0, 0, 0);
    pub const LENGTH: Self = Self::new(1, 0, 0, 0, 0);
    pub const TIME: Self = Self::new(0, 1, 0, 0, 0);
    pub const ANGLE: Self = Self::new(0, 0, 0, 0, 1);
    pub const VELOCITY: Self = Self::new(1, -1, 0, 0, 0);
    pub const MOMENTUM: Self = Self::new(1, -1, 1, 0, 0);
    pub const ENERGY: Self = Self::new(2, -2, 1, 0, 0);
    pub const POTENTIAL: Self = Self::new(2, -2, 1, -1, 0);
    pub const ELECTRIC_FIELD: Self = Self::new(1, -2, 1, -1, 0);
    pub const MAGNETIC_FIELD: Self = Self::new(0, -1, 1, -1, 0);

    /// Build a dimension from its base exponents
    pub const fn new(length: i8, time: i8, mass: i8, charge: i8, angle: i8) -> Self {
        Self {
            length,
            time,
            mass,
            charge,
            angle,
        }
    }

    /// Dimension of a product of quantities
    fn product(self, other: Self) -> Self {
        Self::new(
            self.length + other.length,
            self.time + other.time,
            self.mass + other.mass,
            self.charge + other.charge,
            self.angle + other.angle,
        )
    }

    /// Dimension of a quotient of quantities
    fn quotient(self, other: Self) -> Self {
        Self::new(
            self.length - other.length,
            self.time - other.time,
            self.mass - other.mass,
            self.charge - other.charge,
            self.angle - other.angle,
        )
    }

    /// Human-readable name, where one exists
    pub fn name(&self) -> Option<&'static str> {
        Some(match *self {
            Self::DIMENSIONLESS => "dimensionless",
            Self::LENGTH => "length",
            Self::TIME => "time",
            Self::ANGLE => "angle",
            Self::VELOCITY => "velocity",
            Self::MOMENTUM => "momentum",
            Self::ENERGY => "energy",
            Self::POTENTIAL => "potential",
            Self::ELECTRIC_FIELD => "electric field",
            Self::MAGNETIC_FIELD => "magnetic field",
            _ => return None,
        })
    }
}

impl Display for Dimension {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(fmt, "{name}"),
            None => write!(
                fmt,
                "L^{} T^{} M^{} Q^{} A^{}",
                self.length, self.time, self.mass, self.charge, self.angle
            ),
        }
    }
}

/// A quantity was used where a quantity of another dimension was expected
#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("unit mismatch: expected {expected}, got {actual}")]
pub struct UnitMismatch {
    /// Dimension that the quantity should have had
    pub expected: Dimension,

    /// Dimension that the quantity actually had
    pub actual: Dimension,
}

/// Units in which values may enter or leave the program
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Unit {
    /// Lengths (mm)
    Millimeter,
    /// Times (ns)
    Nanosecond,
    /// Energies (eV)
    ElectronVolt,
    /// Electric potentials (V)
    Volt,
    /// Magnetic flux densities (G)
    Gauss,
    /// Angles (°)
    Degree,
    /// Internal (atomic) unit of the given dimension
    Atomic(Dimension),
}
//
impl Unit {
    /// Dimension measured by this unit
    pub fn dimension(&self) -> Dimension {
        match *self {
            Unit::Millimeter => Dimension::LENGTH,
            Unit::Nanosecond => Dimension::TIME,
            Unit::ElectronVolt => Dimension::ENERGY,
            Unit::Volt => Dimension::POTENTIAL,
            Unit::Gauss => Dimension::MAGNETIC_FIELD,
            Unit::Degree => Dimension::ANGLE,
            Unit::Atomic(dim) => dim,
        }
    }

    /// Number of internal units in one of this unit
    fn scale(&self) -> Float {
        match *self {
            Unit::Millimeter => 1e-3 / BOHR_RADIUS,
            Unit::Nanosecond => 1e-9 / ATOMIC_TIME,
            // An electron crossing one volt gains one electron-volt
            Unit::ElectronVolt | Unit::Volt => 1. / HARTREE,
            Unit::Gauss => 1e-4 / ATOMIC_MAGNETIC_FIELD,
            Unit::Degree => PI / 180.,
            Unit::Atomic(_) => 1.,
        }
    }

    /// Convert a raw value in this unit into a raw value in internal units
    pub fn to_internal_value(&self, value: Float) -> Float {
        value * self.scale()
    }

    /// Convert a raw value in internal units into a raw value in this unit
    pub fn from_internal_value(&self, value: Float) -> Float {
        value / self.scale()
    }
}

/// Scalar value in internal units, tagged with its dimension
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantity {
    value: Float,
    dimension: Dimension,
}
//
impl Quantity {
    /// Tag a value which is already in internal units
    pub fn internal(value: Float, dimension: Dimension) -> Self {
        Self { value, dimension }
    }

    /// Dimension of this quantity
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Extract the internal value, checking that it has the expected dimension
    pub fn value_as(&self, expected: Dimension) -> Result<Float, UnitMismatch> {
        self.check(expected)?;
        Ok(self.value)
    }

    /// Check that this quantity has the expected dimension
    pub fn check(&self, expected: Dimension) -> Result<(), UnitMismatch> {
        if self.dimension == expected {
            Ok(())
        } else {
            Err(UnitMismatch {
                expected,
                actual: self.dimension,
            })
        }
    }

    /// Sum of two quantities of the same dimension
    pub fn checked_add(self, other: Self) -> Result<Self, UnitMismatch> {
        other.check(self.dimension)?;
        Ok(Self::internal(self.value + other.value, self.dimension))
    }

    /// Difference of two quantities of the same dimension
    pub fn checked_sub(self, other: Self) -> Result<Self, UnitMismatch> {
        self.checked_add(-other)
    }
}

impl Mul for Quantity {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::internal(self.value * rhs.value, self.dimension.product(rhs.dimension))
    }
}

impl Mul<Float> for Quantity {
    type Output = Self;

    fn mul(self, rhs: Float) -> Self {
        Self::internal(self.value * rhs, self.dimension)
    }
}

impl Div for Quantity {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self::internal(self.value / rhs.value, self.dimension.quotient(rhs.dimension))
    }
}

impl Neg for Quantity {
    type Output = Self;

    fn neg(self) -> Self {
        Self::internal(-self.value, self.dimension)
    }
}

/// Convert a value in some unit into a quantity in internal units
pub fn to_internal(value: Float, unit: Unit) -> Quantity {
    Quantity::internal(unit.to_internal_value(value), unit.dimension())
}

/// Convert a quantity in internal units back into a raw value in some unit
pub fn from_internal(quantity: Quantity, unit: Unit) -> Result<Float, UnitMismatch> {
    Ok(unit.from_internal_value(quantity.value_as(unit.dimension())?))
}

/// Shorthand for a length in millimeters
pub fn in_millimeter(value: Float) -> Quantity {
    to_internal(value, Unit::Millimeter)
}

/// Shorthand for a time in nanoseconds
pub fn in_nanosecond(value: Float) -> Quantity {
    to_internal(value, Unit::Nanosecond)
}

/// Shorthand for an energy in electron-volts
pub fn in_electron_volt(value: Float) -> Quantity {
    to_internal(value, Unit::ElectronVolt)
}

/// Shorthand for an electric potential in volts
pub fn in_volt(value: Float) -> Quantity {
    to_internal(value, Unit::Volt)
}

/// Shorthand for a magnetic flux density in gauss
pub fn in_gauss(value: Float) -> Quantity {
    to_internal(value, Unit::Gauss)
}

/// Shorthand for an angle in degrees
pub fn in_degree(value: Float) -> Quantity {
    to_internal(value, Unit::Degree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn experimental_units_round_trip() {
        for unit in [
            Unit::Millimeter,
            Unit::Nanosecond,
            Unit::ElectronVolt,
            Unit::Volt,
            Unit::Gauss,
            Unit::Degree,
        ] {
            let q = to_internal(12.5, unit);
            assert_eq!(q.dimension(), unit.dimension());
            assert_float_eq!(from_internal(q, unit).unwrap(), 12.5, rmax <= 1e-12);
        }
    }

    #[test]
    fn known_conversion_factors() {
        assert_float_eq!(in_millimeter(1.).value_as(Dimension::LENGTH).unwrap(), 1.889_726_124_6e7, rmax <= 1e-9);
        assert_float_eq!(in_nanosecond(1.).value_as(Dimension::TIME).unwrap(), 4.134_137_333_5e7, rmax <= 1e-9);
        assert_float_eq!(in_degree(180.).value_as(Dimension::ANGLE).unwrap(), PI, rmax <= 1e-15);
        let one_hartree = in_electron_volt(HARTREE);
        assert_float_eq!(one_hartree.value_as(Dimension::ENERGY).unwrap(), 1., rmax <= 1e-15);
    }

    #[test]
    fn potential_over_length_is_a_field() {
        let field = in_volt(-85.) / in_millimeter(49.5);
        assert!(field.check(Dimension::ELECTRIC_FIELD).is_ok());

        let not_a_field = in_volt(-85.) / in_nanosecond(49.5);
        assert_eq!(
            not_a_field.check(Dimension::ELECTRIC_FIELD),
            Err(UnitMismatch {
                expected: Dimension::ELECTRIC_FIELD,
                actual: Dimension::new(2, -3, 1, -1, 0),
            })
        );
    }

    #[test]
    fn mismatched_sums_are_rejected() {
        let sum = in_volt(-285.).checked_sub(in_volt(-200.)).unwrap();
        assert_float_eq!(from_internal(sum, Unit::Volt).unwrap(), -85., rmax <= 1e-12);
        assert!(in_volt(1.).checked_add(in_electron_volt(1.)).is_err());
        assert!(from_internal(in_millimeter(1.), Unit::Nanosecond).is_err());
    }
}
