//! Per-event analysis: calibration, cuts and electron momentum reconstruction

use crate::{
    config::Configuration,
    evcut::{ArmCut, CoincidenceCut, TimeWindow},
    event::{AnalyzedEvent, AnalyzedMomentum, DetectorHit, ElectronHit, RawArm, RawEvent, Reconstruction},
    hit::Hit,
    momentum::{Momentum, Position},
    numeric::Float,
    resacc::{AnalysisCounters, ResultsAccumulator},
    spectrometer::{Particle, Spectrometer},
    units::{from_internal, Unit},
    Result,
};

use eyre::WrapErr;

/// Everything needed to analyse events, set up once from the configuration
#[derive(Clone, Debug)]
pub struct Analysis {
    ion_cut: ArmCut,
    coincidence: CoincidenceCut,
    electron_cut: ArmCut,
    good_signal: TimeWindow,

    /// Electron arm, used to reconstruct electron momenta
    electron_arm: Spectrometer,

    /// Ion arm for the reference ion species, only used for diagnostics
    ion_arm: Spectrometer,
}
//
impl Analysis {
    /// Set up the analysis
    pub fn new(cfg: &Configuration) -> Result<Self> {
        let settings = &cfg.spectrometer;
        let electron_arm = Spectrometer::electron(
            settings.electron_beamline().wrap_err("Invalid electron arm")?,
            settings.magnetic_field(),
        )?;
        let (mass, charge) = cfg.ion_species;
        let ion_arm = Spectrometer::new(
            settings.ion_beamline().wrap_err("Invalid ion arm")?,
            settings.magnetic_field(),
            Particle::ion(mass, charge),
        )?;
        Ok(Self {
            ion_cut: cfg.ion_cut.clone(),
            coincidence: cfg.coincidence,
            electron_cut: cfg.electron_cut.clone(),
            good_signal: cfg.good_signal,
            electron_arm,
            ion_arm,
        })
    }

    /// Electron arm of the spectrometer
    pub fn electron_arm(&self) -> &Spectrometer {
        &self.electron_arm
    }

    /// Analyse a batch of events, accumulating those which pass the cuts
    pub fn analyse_batch(&self, batch: &[RawEvent]) -> ResultsAccumulator {
        let mut accumulator = ResultsAccumulator::new();
        for raw in batch {
            if let Some(event) = self.analyse(raw, accumulator.counters_mut()) {
                accumulator.integrate(event);
            }
        }
        accumulator
    }

    /// Analyse one event, dropping it if either arm has no hit left
    pub fn analyse(&self, raw: &RawEvent, counters: &mut AnalysisCounters) -> Option<AnalyzedEvent> {
        counters.events_read += 1;

        let ions = self.analyse_ions(&raw.ions, counters);
        if ions.is_empty() {
            counters.no_ions += 1;
            return None;
        }

        let electrons = self.analyse_electrons(&raw.electrons, counters);
        if electrons.is_empty() {
            counters.no_electrons += 1;
            return None;
        }

        counters.events_kept += 1;
        Some(AnalyzedEvent { ions, electrons })
    }

    /// Calibrated ion hits, or nothing if they fail the coincidence cut
    pub fn analyse_ions(&self, raw: &RawArm, counters: &mut AnalysisCounters) -> Vec<DetectorHit> {
        let hits = self.ion_cut.apply(raw, &mut counters.ions);
        if self.coincidence.keep(&hits) {
            hits
        } else {
            counters.coincidence_rejected += 1;
            Vec::new()
        }
    }

    /// Calibrated electron hits, annotated with their initial momentum when
    /// they fall in the good-signal window
    pub fn analyse_electrons(&self, raw: &RawArm, counters: &mut AnalysisCounters) -> Vec<ElectronHit> {
        self.electron_cut
            .apply(raw, &mut counters.electrons)
            .into_iter()
            .map(|DetectorHit { t, x, y }| {
                let reconstruction = if self.good_signal.contains_strictly(t) {
                    self.reconstruct_electron(t, x, y)
                } else {
                    Reconstruction::NotAttempted
                };
                counters.record(&reconstruction);
                ElectronHit { t, x, y, reconstruction }
            })
            .collect()
    }

    /// Reconstruct the momentum of a calibrated electron hit (ns, mm)
    fn reconstruct_electron(&self, t: Float, x: Float, y: Float) -> Reconstruction {
        let hit = Hit::in_experimental_units(t, x, y);
        match self.electron_arm.reconstruct(&hit) {
            Ok(p) => Reconstruction::Reconstructed(AnalyzedMomentum::new(&p, self.electron_arm.particle().mass)),
            Err(reason) => Reconstruction::Failed { reason },
        }
    }

    /// Expected flight time of each arm's particle at rest (ns)
    pub fn flight_times_at_rest(&self) -> Result<(Option<Float>, Option<Float>)> {
        let at_rest = |arm: &Spectrometer| -> Result<Option<Float>> {
            let hit = arm.simulate(&Momentum::zeros(), &Position::zeros()).ok();
            Ok(hit.map(|hit| from_internal(hit.t(), Unit::Nanosecond)).transpose()?)
        };
        Ok((at_rest(&self.ion_arm)?, at_rest(&self.electron_arm)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SP8: &str = include_str!("../sp8.cfg");

    fn analysis() -> Analysis {
        Analysis::new(&Configuration::parse(SP8).unwrap()).unwrap()
    }

    fn arm(t: &[Float], flag: &[i32], count: usize) -> RawArm {
        let n = t.len();
        RawArm::new(t.to_vec(), vec![0.; n], vec![0.; n], flag.to_vec(), count).unwrap()
    }

    /// Raw electron time for a calibrated flight time
    fn electron_time(t: Float) -> Float {
        t - 160.322
    }

    #[test]
    fn three_coincident_ions_pass() {
        let analysis = analysis();
        let mut counters = AnalysisCounters::default();
        let raw = arm(&[5000., 6000., 7000., 20000.], &[0; 4], 4);
        let ions = analysis.analyse_ions(&raw, &mut counters);
        let times: Vec<Float> = ions.iter().map(|hit| hit.t).collect();
        assert_eq!(times.len(), 3);
        assert!((times[0] - 5101.590).abs() < 1e-9);
        assert_eq!(counters.ions.dead_time, 1);
    }

    #[test]
    fn two_ions_are_rejected() {
        let analysis = analysis();
        let mut counters = AnalysisCounters::default();
        let raw = arm(&[5000., 6000., 7000.], &[0, 0, 15], 3);
        assert!(analysis.analyse_ions(&raw, &mut counters).is_empty());
        assert_eq!(counters.coincidence_rejected, 1);
        assert_eq!(counters.ions.bad_flag, 1);
    }

    #[test]
    fn only_good_signal_electrons_are_reconstructed() {
        let analysis = analysis();
        let mut counters = AnalysisCounters::default();
        let raw = arm(&[electron_time(30.), electron_time(10.)], &[0, 0], 2);
        let electrons = analysis.analyse_electrons(&raw, &mut counters);
        assert_eq!(electrons.len(), 2);
        assert!(electrons[0].reconstruction.momentum().is_some());
        assert_eq!(electrons[1].reconstruction, Reconstruction::NotAttempted);
        assert_eq!(counters.reconstructed, 1);
        assert_eq!(counters.not_attempted, 1);
    }

    #[test]
    fn events_need_both_arms() {
        let analysis = analysis();
        let ions = arm(&[5000., 6000., 7000.], &[0; 3], 3);
        let mut counters = AnalysisCounters::default();

        let no_electrons = RawEvent {
            ions: ions.clone(),
            electrons: arm(&[electron_time(100.)], &[0], 1),
        };
        assert_eq!(analysis.analyse(&no_electrons, &mut counters), None);
        assert_eq!(counters.no_electrons, 1);

        let no_ions = RawEvent {
            ions: arm(&[5000., 6000.], &[0; 2], 2),
            electrons: arm(&[electron_time(30.)], &[0], 1),
        };
        assert_eq!(analysis.analyse(&no_ions, &mut counters), None);
        assert_eq!(counters.no_ions, 1);

        let good = RawEvent {
            ions,
            electrons: arm(&[electron_time(30.)], &[0], 1),
        };
        let event = analysis.analyse(&good, &mut counters).unwrap();
        assert_eq!(event.ions.len(), 3);
        assert_eq!(event.electrons.len(), 1);
        assert_eq!(counters.events_read, 3);
        assert_eq!(counters.events_kept, 1);
    }

    #[test]
    fn flight_times_at_rest_fit_the_windows() {
        let (ion, electron) = analysis().flight_times_at_rest().unwrap();
        let (ion, electron) = (ion.unwrap(), electron.unwrap());
        assert!(ion > 0. && ion < 18000.);
        assert!(electron > 20. && electron < 40.);
    }
}
