//! This module contains the final results of an analysis run

use crate::{event::AnalyzedEvent, numeric::Float, resacc::AnalysisCounters};

/// Final results of the analysis
#[derive(Clone, Debug, PartialEq)]
pub struct FinalResults {
    /// Events which passed all cuts, in input order
    pub events: Vec<AnalyzedEvent>,

    /// Fate of every event and hit
    pub counters: AnalysisCounters,
}
//
impl FinalResults {
    /// Wrap up the accumulated analysis output
    pub fn new(events: Vec<AnalyzedEvent>, counters: AnalysisCounters) -> Self {
        Self { events, counters }
    }

    /// Fraction of the input events which passed all cuts
    pub fn acceptance(&self) -> Float {
        ratio(self.counters.events_kept, self.counters.events_read)
    }

    /// Fraction of the attempted electron reconstructions which succeeded
    pub fn reconstruction_efficiency(&self) -> Float {
        let c = &self.counters;
        ratio(c.reconstructed, c.reconstructed + c.failed_reconstructions())
    }

    /// Mean kinetic energy of the reconstructed electrons (eV)
    pub fn mean_electron_energy(&self) -> Option<Float> {
        let (count, sum) = self
            .events
            .iter()
            .flat_map(|event| event.electrons.iter())
            .filter_map(|hit| hit.reconstruction.momentum())
            .fold((0usize, 0.), |(count, sum), p| (count + 1, sum + p.ke));
        (count > 0).then(|| sum / count as Float)
    }

    /// Human-readable report, one `(label, value)` line at a time
    pub fn report(&self) -> Vec<(&'static str, String)> {
        let c = &self.counters;
        let mut lines = vec![
            ("Events read", c.events_read.to_string()),
            ("Events kept", c.events_kept.to_string()),
            ("Acceptance", format!("{:.4}", self.acceptance())),
            ("Rejected by ion coincidence", c.coincidence_rejected.to_string()),
            ("Dropped without ions", c.no_ions.to_string()),
            ("Dropped without electrons", c.no_electrons.to_string()),
            ("Ion hits read", c.ions.read.to_string()),
            ("Ion hits beyond capacity", c.ions.overflow.to_string()),
            ("Ion hits with bad flag", c.ions.bad_flag.to_string()),
            ("Ion hits in dead time", c.ions.dead_time.to_string()),
            ("Electron hits read", c.electrons.read.to_string()),
            ("Electron hits beyond capacity", c.electrons.overflow.to_string()),
            ("Electron hits with bad flag", c.electrons.bad_flag.to_string()),
            ("Electron hits in dead time", c.electrons.dead_time.to_string()),
            ("Electron hits not attempted", c.not_attempted.to_string()),
            ("Electron momenta reconstructed", c.reconstructed.to_string()),
            ("Electron hits out of domain", c.out_of_domain.to_string()),
            ("Electron hits on ambiguous branch", c.branch_ambiguous.to_string()),
            ("Electron hits with ambiguous pz", c.longitudinal_ambiguous.to_string()),
            ("Reconstruction efficiency", format!("{:.4}", self.reconstruction_efficiency())),
        ];
        if let Some(ke) = self.mean_electron_energy() {
            lines.push(("Mean electron energy (eV)", format!("{ke:.4}")));
        }
        lines
    }
}

fn ratio(num: usize, denom: usize) -> Float {
    if denom == 0 {
        0.
    } else {
        num as Float / denom as Float
    }
}
