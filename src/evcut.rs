//! Mechanism to apply cuts to detector hits and events

use crate::{
    calib::Calibration,
    event::{DetectorHit, RawArm},
    numeric::Float,
    resacc::ArmCounters,
};

/// Range of calibrated flight times (ns)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeWindow {
    /// Lower bound
    pub min: Float,

    /// Upper bound
    pub max: Float,
}
//
impl TimeWindow {
    /// Set up a time window
    pub fn new(min: Float, max: Float) -> Self {
        Self { min, max }
    }

    /// Truth that min <= t < max
    pub fn contains(&self, t: Float) -> bool {
        self.min <= t && t < self.max
    }

    /// Truth that min < t < max
    pub fn contains_strictly(&self, t: Float) -> bool {
        self.min < t && t < self.max
    }
}

/// Per-hit cuts of one detector arm: quality flag, calibration, dead time
#[derive(Clone, Debug, PartialEq)]
pub struct ArmCut {
    /// Largest accepted detector flag
    pub flag_max: i32,

    /// Calibration of the detector
    pub calibration: Calibration,

    /// Window of calibrated flight times outside of the detector dead time
    pub live_window: TimeWindow,
}
//
impl ArmCut {
    /// Extract the calibrated hits which pass the cuts, in detector order
    pub fn apply(&self, arm: &RawArm, counters: &mut ArmCounters) -> Vec<DetectorHit> {
        counters.overflow += arm.overflow();
        let raw_hits = arm.hits();
        counters.read += raw_hits.len();

        let mut hits = Vec::with_capacity(raw_hits.len());
        for raw in &raw_hits {
            if raw.flag > self.flag_max {
                counters.bad_flag += 1;
                continue;
            }
            let hit = self.calibration.apply(raw);
            if !self.live_window.contains(hit.t) {
                counters.dead_time += 1;
                continue;
            }
            hits.push(hit);
        }
        counters.kept += hits.len();
        hits
    }
}

/// Ion coincidence cut: the first few ion hits must all fall in a window
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoincidenceCut {
    /// Number of leading hits which must be in coincidence
    pub multiplicity: usize,

    /// Coincidence window, bounds excluded
    pub window: TimeWindow,
}
//
impl CoincidenceCut {
    /// Decide whether a list of ion hits passes the cut or should be rejected
    pub fn keep(&self, hits: &[DetectorHit]) -> bool {
        hits.len() >= self.multiplicity
            && hits[..self.multiplicity]
                .iter()
                .all(|hit| self.window.contains_strictly(hit.t))
    }
}
