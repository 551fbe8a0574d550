//! Field regions of the spectrometer and their composition into beamlines

use crate::{
    numeric::Float,
    units::{Dimension, Quantity, UnitMismatch},
};

use thiserror::Error;

use std::slice;

/// Problems that can be encountered while describing a field region
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum FieldError {
    /// A length or field strength had the wrong dimension
    #[error(transparent)]
    Unit(#[from] UnitMismatch),

    /// Field regions must have a finite, positive length
    #[error("field region length must be positive, got {0} a.u.")]
    NonPositiveLength(Float),

    /// Field strengths must be finite
    #[error("field strength must be finite, got {0} a.u.")]
    NonFiniteField(Float),
}

/// Elementary region of a beamline
///
/// A segment has a length along the beam axis and either no electric field
/// (free drift) or a uniform electric field. The field strength is signed so
/// that a positively charged particle is accelerated towards the detector when
/// it is positive.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSegment {
    /// Length along the beam axis (a.u.)
    length: Float,

    /// Uniform electric field strength (a.u.), if any
    field_strength: Option<Float>,
}
//
impl FieldSegment {
    /// Field-free drift region
    pub fn none(length: Quantity) -> Result<Self, FieldError> {
        Self::new(length, None)
    }

    /// Region with a uniform electric field
    pub fn uniform_electric(length: Quantity, field_strength: Quantity) -> Result<Self, FieldError> {
        Self::new(length, Some(field_strength))
    }

    fn new(length: Quantity, field_strength: Option<Quantity>) -> Result<Self, FieldError> {
        let length = length.value_as(Dimension::LENGTH)?;
        if !(length.is_finite() && length > 0.) {
            return Err(FieldError::NonPositiveLength(length));
        }
        let field_strength = field_strength
            .map(|f| f.value_as(Dimension::ELECTRIC_FIELD))
            .transpose()?;
        if let Some(f) = field_strength.filter(|f| !f.is_finite()) {
            return Err(FieldError::NonFiniteField(f));
        }
        Ok(Self {
            length,
            field_strength,
        })
    }

    /// Length of the region
    pub fn length(&self) -> Quantity {
        Quantity::internal(self.length, Dimension::LENGTH)
    }

    /// Electric field strength of the region, if any
    pub fn field_strength(&self) -> Option<Quantity> {
        self.field_strength
            .map(|f| Quantity::internal(f, Dimension::ELECTRIC_FIELD))
    }

    /// Length of the region in internal units
    pub(crate) fn length_au(&self) -> Float {
        self.length
    }

    /// Longitudinal acceleration of a particle with a given charge/mass ratio
    pub(crate) fn acceleration(&self, charge_over_mass: Float) -> Float {
        self.field_strength.map_or(0., |f| charge_over_mass * f)
    }
}

/// Ordered sequence of field regions, as traversed by a particle
///
/// A beamline is never empty, and its regions are never merged or reordered:
/// the first region is the one where the particle starts.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Beamline {
    segments: Vec<FieldSegment>,
}
//
#[allow(clippy::len_without_is_empty)]
impl Beamline {
    /// Append a region at the detector end of the beamline
    pub fn then(mut self, segment: FieldSegment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Append another beamline at the detector end of this one
    pub fn chain(mut self, other: Beamline) -> Self {
        self.segments.extend(other.segments);
        self
    }

    /// Regions of the beamline, in traversal order
    pub fn segments(&self) -> slice::Iter<'_, FieldSegment> {
        self.segments.iter()
    }

    /// Number of regions
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Total length of the beamline
    pub fn total_length(&self) -> Quantity {
        Quantity::internal(
            self.segments.iter().map(FieldSegment::length_au).sum(),
            Dimension::LENGTH,
        )
    }
}

impl From<FieldSegment> for Beamline {
    fn from(segment: FieldSegment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

/// Compose field regions into a beamline, in traversal order
///
/// Returns None only if no region was provided.
///
pub fn compose(segments: impl IntoIterator<Item = FieldSegment>) -> Option<Beamline> {
    let segments = segments.into_iter().collect::<Vec<_>>();
    (!segments.is_empty()).then_some(Beamline { segments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{in_millimeter, in_nanosecond, in_volt};

    fn drift(mm: Float) -> FieldSegment {
        FieldSegment::none(in_millimeter(mm)).unwrap()
    }

    fn accel(mm: Float, volts: Float) -> FieldSegment {
        FieldSegment::uniform_electric(in_millimeter(mm), in_volt(volts) / in_millimeter(mm)).unwrap()
    }

    #[test]
    fn composition_preserves_order_and_segments() {
        let beamline = compose([accel(33., 85.), drift(67.4), drift(10.)]).unwrap();
        assert_eq!(beamline.len(), 3);
        let segments = beamline.segments().copied().collect::<Vec<_>>();
        assert_eq!(segments, vec![accel(33., 85.), drift(67.4), drift(10.)]);
        let total = beamline.total_length().value_as(Dimension::LENGTH).unwrap();
        assert!((total - in_millimeter(110.4).value_as(Dimension::LENGTH).unwrap()).abs() < 1e-3);
    }

    #[test]
    fn composition_is_associative() {
        let (a, b, c) = (accel(10., 1200.), accel(82.5, 1715.), drift(16.5));
        let flat = compose([a, b, c]).unwrap();
        let left = compose([a, b]).unwrap().then(c);
        let right = Beamline::from(a).chain(compose([b, c]).unwrap());
        assert_eq!(flat, left);
        assert_eq!(flat, right);
    }

    #[test]
    fn empty_composition_yields_nothing() {
        assert!(compose(Vec::<FieldSegment>::new()).is_none());
    }

    #[test]
    fn segments_check_their_inputs() {
        assert!(matches!(
            FieldSegment::none(in_nanosecond(3.)),
            Err(FieldError::Unit(_))
        ));
        assert!(matches!(
            FieldSegment::uniform_electric(in_millimeter(3.), in_volt(3.)),
            Err(FieldError::Unit(_))
        ));
        assert!(matches!(
            FieldSegment::none(in_millimeter(0.)),
            Err(FieldError::NonPositiveLength(_))
        ));
        assert_eq!(drift(5.).field_strength(), None);
        assert_eq!(drift(5.).acceleration(-1.), 0.);
    }
}
