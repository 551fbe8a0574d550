//! This module defines the properties and storage of detector events

use crate::{
    momentum::{kinetic_energy_ev, Momentum, X, Y, Z},
    numeric::Float,
    spectrometer::ReconstructionFailure,
};

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Raw readout of one physical hit slot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawHit {
    /// Flight time (ns)
    pub t: Float,

    /// Horizontal position (mm)
    pub x: Float,

    /// Vertical position (mm)
    pub y: Float,

    /// Detector quality flag, larger is worse
    pub flag: i32,
}

/// Malformed raw arm readout, with the length of each array
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("hit arrays have mismatched lengths (t: {t}, x: {x}, y: {y}, flag: {flag})")]
pub struct MismatchedArrays {
    pub t: usize,
    pub x: usize,
    pub y: usize,
    pub flag: usize,
}

/// Raw readout of one detector arm: fixed-width parallel arrays, of which only
/// the first `count` slots hold actual hits
#[derive(Clone, Debug, PartialEq)]
pub struct RawArm {
    t: Box<[Float]>,
    x: Box<[Float]>,
    y: Box<[Float]>,
    flag: Box<[i32]>,
    count: usize,
}
//
impl RawArm {
    /// Wrap the readout arrays of an arm and its declared hit count
    pub fn new(
        t: Vec<Float>,
        x: Vec<Float>,
        y: Vec<Float>,
        flag: Vec<i32>,
        count: usize,
    ) -> Result<Self, MismatchedArrays> {
        let capacity = t.len();
        if x.len() != capacity || y.len() != capacity || flag.len() != capacity {
            return Err(MismatchedArrays {
                t: t.len(),
                x: x.len(),
                y: y.len(),
                flag: flag.len(),
            });
        }
        Ok(Self {
            t: t.into(),
            x: x.into(),
            y: y.into(),
            flag: flag.into(),
            count,
        })
    }

    /// Number of hit slots in the readout
    pub fn capacity(&self) -> usize {
        self.t.len()
    }

    /// Number of hits declared by the detector
    pub fn declared_count(&self) -> usize {
        self.count
    }

    /// Number of declared hits which do not fit in the readout
    pub fn overflow(&self) -> usize {
        self.count.saturating_sub(self.capacity())
    }

    /// Zip the readout arrays into hits, keeping only declared ones
    pub fn hits(&self) -> Vec<RawHit> {
        self.t
            .iter()
            .zip(self.x.iter())
            .zip(self.y.iter())
            .zip(self.flag.iter())
            .take(self.count)
            .map(|(((&t, &x), &y), &flag)| RawHit { t, x, y, flag })
            .collect()
    }
}

/// Raw readout of both arms of the spectrometer for one event
#[derive(Clone, Debug, PartialEq)]
pub struct RawEvent {
    /// Ion arm readout
    pub ions: RawArm,

    /// Electron arm readout
    pub electrons: RawArm,
}

/// Calibrated hit (ns, mm)
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DetectorHit {
    /// Flight time
    pub t: Float,

    /// Horizontal position
    pub x: Float,

    /// Vertical position
    pub y: Float,
}

/// Reconstructed initial momentum (a.u.) and kinetic energy (eV)
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AnalyzedMomentum {
    pub px: Float,
    pub py: Float,
    pub pz: Float,
    pub ke: Float,
}
//
impl AnalyzedMomentum {
    /// Record the momentum of a particle of a given mass
    pub fn new(p: &Momentum, mass: Float) -> Self {
        Self {
            px: p[X],
            py: p[Y],
            pz: p[Z],
            ke: kinetic_energy_ev(p, mass),
        }
    }
}

/// Outcome of the momentum reconstruction of an electron hit
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reconstruction {
    /// The hit was outside of the good-signal window
    NotAttempted,

    /// The momentum was reconstructed
    Reconstructed(AnalyzedMomentum),

    /// Reconstruction was attempted and failed
    Failed {
        /// Why the reconstruction failed
        #[serde(serialize_with = "serialize_display")]
        reason: ReconstructionFailure,
    },
}
//
impl Reconstruction {
    /// Reconstructed momentum, if any
    pub fn momentum(&self) -> Option<&AnalyzedMomentum> {
        match self {
            Reconstruction::Reconstructed(p) => Some(p),
            _ => None,
        }
    }
}

/// Calibrated electron hit, with its reconstruction status
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ElectronHit {
    /// Flight time
    pub t: Float,

    /// Horizontal position
    pub x: Float,

    /// Vertical position
    pub y: Float,

    /// Momentum reconstruction status
    #[serde(rename = "as")]
    pub reconstruction: Reconstruction,
}

/// Event which passed all cuts
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalyzedEvent {
    /// Ion hits, in detector order
    #[serde(rename = "ihits")]
    pub ions: Vec<DetectorHit>,

    /// Electron hits, in detector order
    #[serde(rename = "ehits")]
    pub electrons: Vec<ElectronHit>,
}

fn serialize_display<S: Serializer>(value: &impl std::fmt::Display, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm(t: &[Float], count: usize) -> RawArm {
        let n = t.len();
        RawArm::new(t.to_vec(), vec![1.; n], vec![2.; n], vec![0; n], count).unwrap()
    }

    #[test]
    fn hits_are_truncated_to_the_declared_count() {
        let raw = arm(&[5000., 6000., 7000., 0.], 3);
        let hits = raw.hits();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[2], RawHit { t: 7000., x: 1., y: 2., flag: 0 });
        assert_eq!(raw.overflow(), 0);
    }

    #[test]
    fn empty_slots_are_never_hits() {
        assert!(arm(&[0., 0., 0.], 0).hits().is_empty());
    }

    #[test]
    fn declared_count_beyond_capacity_is_clamped() {
        let raw = arm(&[1., 2.], 5);
        assert_eq!(raw.hits().len(), 2);
        assert_eq!(raw.overflow(), 3);
    }

    #[test]
    fn arrays_must_have_equal_lengths() {
        let err = RawArm::new(vec![1.; 4], vec![1.; 4], vec![1.; 3], vec![0; 4], 1).unwrap_err();
        assert_eq!(err, MismatchedArrays { t: 4, x: 4, y: 3, flag: 4 });
    }

    #[test]
    fn reconstruction_status_serialization() {
        let hit = ElectronHit {
            t: 30.,
            x: 0.,
            y: 0.,
            reconstruction: Reconstruction::NotAttempted,
        };
        let json = serde_json::to_value(hit).unwrap();
        assert_eq!(json["as"]["status"], "not_attempted");

        let failed = Reconstruction::Failed {
            reason: ReconstructionFailure::BranchAmbiguous { revolutions: 1 },
        };
        let json = serde_json::to_value(failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json["reason"].as_str().unwrap().contains("revolution"));

        let ok = Reconstruction::Reconstructed(AnalyzedMomentum::new(&Momentum::new(0., 0., 1.), 1.));
        let json = serde_json::to_value(ok).unwrap();
        assert_eq!(json["status"], "reconstructed");
        assert_eq!(json["pz"], 1.);
    }
}
