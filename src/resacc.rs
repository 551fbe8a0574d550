//! This module allows accumulating analysis results across detector events

use crate::{
    event::{AnalyzedEvent, Reconstruction},
    resfin::FinalResults,
    spectrometer::ReconstructionFailure,
};

use serde::Serialize;

/// Fate of the hits of one detector arm
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ArmCounters {
    /// Hits declared by the detector and present in the readout
    pub read: usize,

    /// Hits declared by the detector beyond the readout capacity
    pub overflow: usize,

    /// Hits rejected because of their detector flag
    pub bad_flag: usize,

    /// Hits rejected because they fell in the detector dead time
    pub dead_time: usize,

    /// Hits which passed all per-hit cuts
    pub kept: usize,
}
//
impl ArmCounters {
    /// Merge counts from another batch of events
    pub fn merge(&mut self, other: Self) {
        self.read += other.read;
        self.overflow += other.overflow;
        self.bad_flag += other.bad_flag;
        self.dead_time += other.dead_time;
        self.kept += other.kept;
    }
}

/// Fate of events and hits during the analysis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisCounters {
    /// Events which entered the analysis
    pub events_read: usize,

    /// Events which passed all cuts
    pub events_kept: usize,

    /// Events whose ions failed the coincidence cut
    pub coincidence_rejected: usize,

    /// Events dropped because no ion hit was left
    pub no_ions: usize,

    /// Events dropped because no electron hit was left
    pub no_electrons: usize,

    /// Ion arm hit counts
    pub ions: ArmCounters,

    /// Electron arm hit counts
    pub electrons: ArmCounters,

    /// Electron hits outside of the good-signal window
    pub not_attempted: usize,

    /// Electron hits whose momentum was reconstructed
    pub reconstructed: usize,

    /// Electron hits which no trajectory can explain
    pub out_of_domain: usize,

    /// Electron hits too close to a whole number of cyclotron revolutions
    pub branch_ambiguous: usize,

    /// Electron hits whose flight time matches several longitudinal momenta
    pub longitudinal_ambiguous: usize,
}
//
impl AnalysisCounters {
    /// Record the outcome of an electron momentum reconstruction
    pub fn record(&mut self, reconstruction: &Reconstruction) {
        match reconstruction {
            Reconstruction::NotAttempted => self.not_attempted += 1,
            Reconstruction::Reconstructed(_) => self.reconstructed += 1,
            Reconstruction::Failed {
                reason: ReconstructionFailure::OutOfDomain(_),
            } => self.out_of_domain += 1,
            Reconstruction::Failed {
                reason: ReconstructionFailure::BranchAmbiguous { .. },
            } => self.branch_ambiguous += 1,
            Reconstruction::Failed {
                reason: ReconstructionFailure::LongitudinalAmbiguous { .. },
            } => self.longitudinal_ambiguous += 1,
        }
    }

    /// Electron hits whose momentum reconstruction was attempted and failed
    pub fn failed_reconstructions(&self) -> usize {
        self.out_of_domain + self.branch_ambiguous + self.longitudinal_ambiguous
    }

    /// Merge counts from another batch of events
    pub fn merge(&mut self, other: Self) {
        self.events_read += other.events_read;
        self.events_kept += other.events_kept;
        self.coincidence_rejected += other.coincidence_rejected;
        self.no_ions += other.no_ions;
        self.no_electrons += other.no_electrons;
        self.ions.merge(other.ions);
        self.electrons.merge(other.electrons);
        self.not_attempted += other.not_attempted;
        self.reconstructed += other.reconstructed;
        self.out_of_domain += other.out_of_domain;
        self.branch_ambiguous += other.branch_ambiguous;
        self.longitudinal_ambiguous += other.longitudinal_ambiguous;
    }
}

/// This struct accumulates the output of the analysis of a batch of events,
/// and ultimately produces the final results
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultsAccumulator {
    /// Events which passed the cuts, in input order
    events: Vec<AnalyzedEvent>,

    /// Fate of every event and hit seen so far
    counters: AnalysisCounters,
}
//
impl ResultsAccumulator {
    /// Prepare for results accumulation
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters, to be updated by the analysis
    pub fn counters_mut(&mut self) -> &mut AnalysisCounters {
        &mut self.counters
    }

    /// Integrate an event which passed all cuts
    pub fn integrate(&mut self, event: AnalyzedEvent) {
        self.events.push(event);
    }

    /// Integrate results from another batch of events, which comes after
    /// the events that were integrated so far
    pub fn merge(&mut self, other: Self) {
        self.events.extend(other.events);
        self.counters.merge(other.counters);
    }

    /// Turn the accumulated data into final results
    pub fn finalize(self) -> FinalResults {
        debug_assert_eq!(self.events.len(), self.counters.events_kept);
        FinalResults::new(self.events, self.counters)
    }
}
