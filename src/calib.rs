//! Detector calibration

use crate::{
    event::{DetectorHit, RawHit},
    momentum::{X, Y},
    numeric::Float,
};

use nalgebra::{Rotation2, Vector2};

/// Affine calibration of one detector arm
///
/// Flight times are shifted by the trigger offset. Positions are rotated
/// around the origin of the raw detector frame, then shifted by the detector
/// centre, then scaled along each axis.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    /// Flight time offset (ns)
    pub t0: Float,

    /// Detector rotation
    rotation: Rotation2<Float>,

    /// Detector centre, in the rotated frame (mm)
    center: Vector2<Float>,

    /// Per-axis scale factor
    scale: Vector2<Float>,
}
//
impl Calibration {
    /// Set up a calibration from a time offset (ns), a rotation angle
    /// (radians), a detector centre (mm) and per-axis scale factors
    pub fn new(t0: Float, angle: Float, x0: Float, y0: Float, dx: Float, dy: Float) -> Self {
        Self {
            t0,
            rotation: Rotation2::new(angle),
            center: Vector2::new(x0, y0),
            scale: Vector2::new(dx, dy),
        }
    }

    /// Rotation angle (radians)
    pub fn angle(&self) -> Float {
        self.rotation.angle()
    }

    /// Detector centre (mm)
    pub fn center(&self) -> (Float, Float) {
        (self.center[X], self.center[Y])
    }

    /// Per-axis scale factors
    pub fn scale(&self) -> (Float, Float) {
        (self.scale[X], self.scale[Y])
    }

    /// Calibrate a raw hit
    pub fn apply(&self, hit: &RawHit) -> DetectorHit {
        let position = (self.rotation * Vector2::new(hit.x, hit.y) - self.center).component_mul(&self.scale);
        DetectorHit {
            t: hit.t - self.t0,
            x: position[X],
            y: position[Y],
        }
    }
}
