//! This module implements some domain-specific momentum handling logic.

use crate::{numeric::Float, units::HARTREE};
use nalgebra::{SVector, Vector2};

/// Momentum dimension
pub const MOMENTUM_DIM: usize = 3;

/// Non-relativistic 3-momentum, in atomic units
pub type Momentum = SVector<Float, MOMENTUM_DIM>;

/// Position in the detector plane, in atomic units
pub type Position = Vector2<Float>;

/// Convenience const for accessing the X coordinate of a vector
pub const X: usize = 0;

/// Convenience const for accessing the Y coordinate of a vector
pub const Y: usize = 1;

/// Convenience const for accessing the Z (beam axis) coordinate of a vector
pub const Z: usize = 2;

/// Kinetic energy of a particle of a given mass, in electron-volts
pub fn kinetic_energy_ev(p: &Momentum, mass: Float) -> Float {
    p.norm_squared() / (2. * mass) * HARTREE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::ATOMIC_MASS_UNIT;
    use float_eq::assert_float_eq;

    #[test]
    fn kinetic_energies() {
        // One atomic unit of momentum gives an electron half a Hartree
        assert_float_eq!(kinetic_energy_ev(&Momentum::new(0., 0., 1.), 1.), HARTREE / 2., rmax <= 1e-15);
        let p = Momentum::new(3., -4., 0.);
        assert_float_eq!(kinetic_energy_ev(&p, ATOMIC_MASS_UNIT), 12.5 * HARTREE / ATOMIC_MASS_UNIT, rmax <= 1e-14);
    }
}
