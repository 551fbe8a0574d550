//! Detector hits, as seen by the spectrometer model

use crate::{
    momentum::Position,
    numeric::Float,
    units::{Dimension, Quantity, Unit, UnitMismatch},
};

/// Arrival of a particle on a detector: flight time and position
///
/// Values are stored in internal units, and only enter or leave through
/// dimension-checked quantities.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    t: Float,
    x: Float,
    y: Float,
}
//
impl Hit {
    /// Build a hit from dimension-checked quantities
    pub fn new(t: Quantity, x: Quantity, y: Quantity) -> Result<Self, UnitMismatch> {
        Ok(Self {
            t: t.value_as(Dimension::TIME)?,
            x: x.value_as(Dimension::LENGTH)?,
            y: y.value_as(Dimension::LENGTH)?,
        })
    }

    /// Build a hit from a flight time in ns and a position in mm
    pub fn in_experimental_units(t: Float, x: Float, y: Float) -> Self {
        Self::from_internal(
            Unit::Nanosecond.to_internal_value(t),
            Unit::Millimeter.to_internal_value(x),
            Unit::Millimeter.to_internal_value(y),
        )
    }

    pub(crate) fn from_internal(t: Float, x: Float, y: Float) -> Self {
        Self { t, x, y }
    }

    /// Flight time
    pub fn t(&self) -> Quantity {
        Quantity::internal(self.t, Dimension::TIME)
    }

    /// Horizontal position
    pub fn x(&self) -> Quantity {
        Quantity::internal(self.x, Dimension::LENGTH)
    }

    /// Vertical position
    pub fn y(&self) -> Quantity {
        Quantity::internal(self.y, Dimension::LENGTH)
    }

    /// Flight time (ns) and position (mm)
    pub fn to_experimental_units(&self) -> (Float, Float, Float) {
        (
            Unit::Nanosecond.from_internal_value(self.t),
            Unit::Millimeter.from_internal_value(self.x),
            Unit::Millimeter.from_internal_value(self.y),
        )
    }

    pub(crate) fn time_au(&self) -> Float {
        self.t
    }

    pub(crate) fn position_au(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::in_millimeter;
    use float_eq::assert_float_eq;

    #[test]
    fn experimental_units_round_trip() {
        let hit = Hit::in_experimental_units(30., -12.5, 4.);
        let (t, x, y) = hit.to_experimental_units();
        assert_float_eq!(t, 30., rmax <= 1e-12);
        assert_float_eq!(x, -12.5, rmax <= 1e-12);
        assert_float_eq!(y, 4., rmax <= 1e-12);
        assert_eq!(Hit::new(hit.t(), hit.x(), hit.y()), Ok(hit));
    }

    #[test]
    fn hit_components_are_dimension_checked() {
        let q = in_millimeter(1.);
        assert!(Hit::new(q, q, q).is_err());
    }
}
