//! Forward and inverse model of one arm of the spectrometer
//!
//! A `Spectrometer` combines a beamline, an optional uniform magnetic field
//! along the beam axis, and the species of particle being detected. It can
//! simulate where and when a particle of given initial momentum lands on the
//! detector, and reconstruct the initial momentum of a particle from its hit.
//!
//! # Revolution branches
//!
//! With a magnetic field, the transverse motion is a cyclotron rotation, and
//! the hit position alone does not tell how many revolutions were completed.
//! This model always resolves the branch from the flight time: since the
//! longitudinal motion does not depend on the magnetic field, the flight time
//! determines the initial longitudinal momentum, and with it the cyclotron
//! phase `ωt` at arrival. The branch of a hit is `floor(|ω|·t / 2π)`, for the
//! forward and the inverse model alike.
//!
//! The only genuinely ambiguous hits are those whose cyclotron phase is close
//! to a whole, non-zero number of revolutions: all particles then land near
//! the axis whatever their transverse momentum, and reconstruction gives up
//! with `ReconstructionFailure::BranchAmbiguous`.
//!
//! # Backward launches
//!
//! A particle launched backwards must first be turned around by the first
//! region. Behind a long drift region, a faster backward launch can then make
//! up for the detour, so that several longitudinal momenta share one flight
//! time. Reconstruction reports these hits as
//! `ReconstructionFailure::LongitudinalAmbiguous` rather than picking one.

mod longitudinal;
mod transverse;

use crate::{
    field::Beamline,
    hit::Hit,
    momentum::{Momentum, Position, X, Y, Z},
    numeric::{reals::consts::TAU, Float},
    units::{Dimension, Quantity, UnitMismatch, ATOMIC_MASS_UNIT},
};

use thiserror::Error;

use std::fmt::{self, Display};

use self::transverse::Velocity;

/// Default tolerance on |sin(ωt/2)| below which transverse momentum is
/// considered unrecoverable
pub const DEFAULT_NODE_TOLERANCE: Float = 1e-3;

/// Species of particle flying through the spectrometer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// Mass (electron masses)
    pub mass: Float,

    /// Charge (elementary charges)
    pub charge: Float,
}
//
impl Particle {
    /// The electron
    pub const ELECTRON: Self = Self {
        mass: 1.,
        charge: -1.,
    };

    /// An ion of given mass (atomic mass units) and charge
    pub fn ion(mass_amu: Float, charge: Float) -> Self {
        Self {
            mass: mass_amu * ATOMIC_MASS_UNIT,
            charge,
        }
    }

    fn charge_over_mass(&self) -> Float {
        self.charge / self.mass
    }
}

/// The particle never reaches the detector
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("particle with initial momentum ({px}, {py}, {pz}) a.u. never reaches the detector")]
pub struct SimulationFailure {
    pub px: Float,
    pub py: Float,
    pub pz: Float,
}

/// Reason why a hit lies outside of the domain of the inverse model
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomainViolation {
    /// Flight time is zero or negative
    NonPositiveTime,

    /// Flight time exceeds the longest reachable one
    BeyondMaxFlightTime,

    /// No real initial velocity matches the flight time
    NoSolution,
}

impl Display for DomainViolation {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DomainViolation::NonPositiveTime => "non-positive flight time",
            DomainViolation::BeyondMaxFlightTime => "flight time beyond the longest reachable one",
            DomainViolation::NoSolution => "no initial momentum matches the flight time",
        };
        write!(fmt, "{reason}")
    }
}

/// Reason why the initial momentum of a hit could not be reconstructed
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReconstructionFailure {
    /// No physical trajectory ends on this hit
    #[error("hit is out of domain: {0}")]
    OutOfDomain(DomainViolation),

    /// The flight ends too close to a whole number of cyclotron revolutions
    #[error("flight time is too close to {revolutions} full cyclotron revolution(s)")]
    BranchAmbiguous {
        /// Whole number of revolutions closest to the flight
        revolutions: u32,
    },

    /// Several longitudinal momenta lead to the same flight time
    #[error("{solutions} longitudinal momenta match the flight time")]
    LongitudinalAmbiguous {
        /// Number of matching longitudinal momenta
        solutions: u32,
    },
}

/// Forward and inverse model of one spectrometer arm
#[derive(Clone, Debug)]
pub struct Spectrometer {
    /// Field regions traversed by the particle
    beamline: Beamline,

    /// Signed cyclotron angular frequency, if there is a magnetic field
    omega: Option<Float>,

    /// Species being detected
    particle: Particle,

    /// Longest flight time of any particle reaching the detector
    max_flight_time: Float,

    /// Tolerance on |sin(ωt/2)| used to detect ambiguous branches
    node_tolerance: Float,
}
//
impl Spectrometer {
    /// Set up a spectrometer arm
    pub fn new(
        beamline: Beamline,
        magnetic_field: Option<Quantity>,
        particle: Particle,
    ) -> Result<Self, UnitMismatch> {
        let omega = magnetic_field
            .map(|b| b.value_as(Dimension::MAGNETIC_FIELD))
            .transpose()?
            .filter(|&b| b != 0.)
            .map(|b| particle.charge_over_mass() * b);
        let max_flight_time = longitudinal::max_flight_time(&beamline, particle.charge_over_mass());
        Ok(Self {
            beamline,
            omega,
            particle,
            max_flight_time,
            node_tolerance: DEFAULT_NODE_TOLERANCE,
        })
    }

    /// Electron arm of the spectrometer
    pub fn electron(beamline: Beamline, magnetic_field: Option<Quantity>) -> Result<Self, UnitMismatch> {
        Self::new(beamline, magnetic_field, Particle::ELECTRON)
    }

    /// Change the tolerance used to detect ambiguous revolution branches
    pub fn with_node_tolerance(mut self, node_tolerance: Float) -> Self {
        self.node_tolerance = node_tolerance;
        self
    }

    /// Beamline of this arm
    pub fn beamline(&self) -> &Beamline {
        &self.beamline
    }

    /// Species detected by this arm
    pub fn particle(&self) -> Particle {
        self.particle
    }

    /// Longest flight time of any particle reaching the detector (may be +inf)
    pub fn max_flight_time(&self) -> Quantity {
        Quantity::internal(self.max_flight_time, Dimension::TIME)
    }

    /// Cyclotron period, if there is a magnetic field
    pub fn cyclotron_period(&self) -> Option<Quantity> {
        self.omega
            .map(|omega| Quantity::internal(TAU / omega.abs(), Dimension::TIME))
    }

    /// Number of complete cyclotron revolutions for a given flight time
    pub fn revolutions(&self, t: Quantity) -> Result<u32, UnitMismatch> {
        Ok(transverse::revolutions(self.omega, t.value_as(Dimension::TIME)?))
    }

    /// Simulate the hit of a particle with some initial momentum (a.u.),
    /// starting from some transverse position
    pub fn simulate(&self, momentum: &Momentum, start: &Position) -> Result<Hit, SimulationFailure> {
        let velocity = momentum / self.particle.mass;
        let time = longitudinal::flight_time(&self.beamline, self.particle.charge_over_mass(), velocity[Z])
            .ok_or(SimulationFailure {
                px: momentum[X],
                py: momentum[Y],
                pz: momentum[Z],
            })?;
        let v_perp = Velocity::new(velocity[X], velocity[Y]);
        let end = transverse::propagate(start, &v_perp, self.omega, time);
        Ok(Hit::from_internal(time, end[X], end[Y]))
    }

    /// Reconstruct the initial momentum (a.u.) of a particle emitted from the
    /// origin, given its hit
    pub fn reconstruct(&self, hit: &Hit) -> Result<Momentum, ReconstructionFailure> {
        let time = hit.time_au();
        if !(time > 0.) {
            return Err(ReconstructionFailure::OutOfDomain(DomainViolation::NonPositiveTime));
        }
        if time >= self.max_flight_time {
            return Err(ReconstructionFailure::OutOfDomain(DomainViolation::BeyondMaxFlightTime));
        }
        let solutions = longitudinal::solve_initial_velocities(&self.beamline, self.particle.charge_over_mass(), time);
        let vz = match solutions[..] {
            [vz] => vz,
            [] => return Err(ReconstructionFailure::OutOfDomain(DomainViolation::NoSolution)),
            _ => {
                return Err(ReconstructionFailure::LongitudinalAmbiguous {
                    solutions: solutions.len() as u32,
                })
            }
        };
        let v_perp = transverse::initial_velocity(&hit.position_au(), self.omega, time, self.node_tolerance)
            .map_err(|revolutions| ReconstructionFailure::BranchAmbiguous { revolutions })?;
        Ok(self.particle.mass * Momentum::new(v_perp[X], v_perp[Y], vz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        field::{compose, FieldSegment},
        units::{in_gauss, in_millimeter, in_nanosecond, in_volt},
    };
    use float_eq::assert_float_eq;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    /// Electron arm of the SP8 spectrometer
    fn electron_beamline() -> Beamline {
        compose([
            FieldSegment::uniform_electric(in_millimeter(33.), in_volt(-285. - -200.) / in_millimeter(16.5 + 33.))
                .unwrap(),
            FieldSegment::none(in_millimeter(67.4)).unwrap(),
        ])
        .unwrap()
    }

    fn assert_momentum_eq(actual: &Momentum, expected: &Momentum) {
        for coord in [X, Y, Z] {
            assert_float_eq!(actual[coord], expected[coord], abs <= 1e-6);
        }
    }

    #[test]
    fn round_trip_without_magnetic_field() {
        let spectrometer = Spectrometer::electron(electron_beamline(), None).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        for _ in 0..200 {
            let p = Momentum::from_fn(|_, _| rng.gen_range(-1.0..1.0));
            let hit = spectrometer.simulate(&p, &Position::zeros()).unwrap();
            let reco = spectrometer.reconstruct(&hit).unwrap();
            assert_momentum_eq(&reco, &p);
        }
    }

    #[test]
    fn round_trip_within_one_cyclotron_period() {
        let spectrometer = Spectrometer::electron(electron_beamline(), Some(in_gauss(6.843))).unwrap();
        let period = spectrometer.cyclotron_period().unwrap();
        let period = period.value_as(Dimension::TIME).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut tested = 0;
        while tested < 100 {
            let p = Momentum::from_fn(|_, _| rng.gen_range(-1.0..1.0));
            let hit = spectrometer.simulate(&p, &Position::zeros()).unwrap();
            let phase = hit.time_au() / period;
            // Stay clear of the nodes at 0 and 1 revolution
            if !(0.05..0.95).contains(&phase) {
                continue;
            }
            assert_eq!(spectrometer.revolutions(hit.t()), Ok(0));
            assert_momentum_eq(&spectrometer.reconstruct(&hit).unwrap(), &p);
            tested += 1;
        }
    }

    #[test]
    fn beyond_one_cyclotron_period() {
        // A stronger field makes the slowest electrons go around several times
        let spectrometer = Spectrometer::electron(electron_beamline(), Some(in_gauss(30.))).unwrap();
        let period = spectrometer.cyclotron_period().unwrap();
        let period = period.value_as(Dimension::TIME).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1234);
        let (mut recovered, mut ambiguous) = (0, 0);
        for _ in 0..500 {
            let p = Momentum::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5), rng.gen_range(-1.0..0.));
            let hit = spectrometer.simulate(&p, &Position::zeros()).unwrap();
            let turns = hit.time_au() / period;
            if turns < 1. {
                continue;
            }
            assert_eq!(spectrometer.revolutions(hit.t()), Ok(turns.floor() as u32));
            match spectrometer.reconstruct(&hit) {
                Ok(reco) => {
                    assert_momentum_eq(&reco, &p);
                    recovered += 1;
                }
                Err(ReconstructionFailure::BranchAmbiguous { revolutions }) => {
                    assert_eq!(revolutions, turns.round() as u32);
                    ambiguous += 1;
                }
                Err(other) => panic!("unexpected failure {other}"),
            }
        }
        assert!(recovered > 0);
        assert!(recovered > ambiguous);
    }

    #[test]
    fn fast_electrons_are_recovered() {
        // Lands after a tiny fraction of a cyclotron period
        let spectrometer = Spectrometer::electron(electron_beamline(), Some(in_gauss(6.843))).unwrap();
        let period = spectrometer.cyclotron_period().unwrap();
        let period = period.value_as(Dimension::TIME).unwrap();
        let p = Momentum::new(0.5, -0.3, 5000.);
        let hit = spectrometer.simulate(&p, &Position::zeros()).unwrap();
        assert!(hit.time_au() / period < 1e-3);
        assert_eq!(spectrometer.revolutions(hit.t()), Ok(0));
        let reco = spectrometer.reconstruct(&hit).unwrap();
        for coord in [X, Y, Z] {
            assert_float_eq!(reco[coord], p[coord], rmax <= 1e-7);
        }
    }

    #[test]
    fn whole_revolution_is_ambiguous() {
        let spectrometer = Spectrometer::electron(electron_beamline(), Some(in_gauss(30.))).unwrap();
        let period = spectrometer.cyclotron_period().unwrap();
        let hit = Hit::new(period * 2., in_millimeter(0.), in_millimeter(0.)).unwrap();
        assert_eq!(
            spectrometer.reconstruct(&hit),
            Err(ReconstructionFailure::BranchAmbiguous { revolutions: 2 })
        );
    }

    #[test]
    fn node_tolerance_widens_the_ambiguous_region() {
        let spectrometer = Spectrometer::electron(electron_beamline(), Some(in_gauss(30.))).unwrap();
        let period = spectrometer.cyclotron_period().unwrap();
        let hit = Hit::new(period * 2.02, in_millimeter(1.), in_millimeter(0.)).unwrap();
        assert!(spectrometer.reconstruct(&hit).is_ok());
        let strict = spectrometer.with_node_tolerance(0.1);
        assert_eq!(
            strict.reconstruct(&hit),
            Err(ReconstructionFailure::BranchAmbiguous { revolutions: 2 })
        );
    }

    #[test]
    fn non_positive_time_is_out_of_domain() {
        let spectrometer = Spectrometer::electron(electron_beamline(), Some(in_gauss(6.843))).unwrap();
        for t in [0., -1., -30.] {
            let hit = Hit::in_experimental_units(t, 1., 1.);
            assert_eq!(
                spectrometer.reconstruct(&hit),
                Err(ReconstructionFailure::OutOfDomain(DomainViolation::NonPositiveTime))
            );
        }
    }

    #[test]
    fn unreachable_flight_time_is_out_of_domain() {
        // Ions pushed against a retarding region, then accelerated
        let beamline = compose([
            FieldSegment::uniform_electric(in_millimeter(10.), in_volt(-50.) / in_millimeter(10.)).unwrap(),
            FieldSegment::uniform_electric(in_millimeter(50.), in_volt(2000.) / in_millimeter(50.)).unwrap(),
        ])
        .unwrap();
        let spectrometer = Spectrometer::new(beamline, None, Particle::ion(1., 1.)).unwrap();
        let t_max = spectrometer.max_flight_time();
        let t_max = t_max.value_as(Dimension::TIME).unwrap();
        assert!(t_max.is_finite());
        let hit = Hit::new(
            Quantity::internal(1.5 * t_max, Dimension::TIME),
            in_millimeter(0.),
            in_millimeter(0.),
        )
        .unwrap();
        assert_eq!(
            spectrometer.reconstruct(&hit),
            Err(ReconstructionFailure::OutOfDomain(DomainViolation::BeyondMaxFlightTime))
        );

        // ...but anything faster is fine
        let hit = Hit::new(
            Quantity::internal(0.5 * t_max, Dimension::TIME),
            in_millimeter(1.),
            in_millimeter(-2.),
        )
        .unwrap();
        let p = spectrometer.reconstruct(&hit).unwrap();
        let back = spectrometer.simulate(&p, &Position::zeros()).unwrap();
        assert_float_eq!(back.time_au(), hit.time_au(), rmax <= 1e-8);
        assert_float_eq!(back.position_au()[X], hit.position_au()[X], rmax <= 1e-8);
    }

    #[test]
    fn backward_electrons_arrive_later() {
        let spectrometer = Spectrometer::electron(electron_beamline(), None).unwrap();
        let forward = spectrometer.simulate(&Momentum::new(0., 0., 0.3), &Position::zeros()).unwrap();
        let backward = spectrometer.simulate(&Momentum::new(0., 0., -0.3), &Position::zeros()).unwrap();
        assert!(backward.time_au() > forward.time_au());
        assert!(forward.time_au() < in_nanosecond(60.).value_as(Dimension::TIME).unwrap());
    }

    #[test]
    fn long_drift_is_longitudinally_ambiguous() {
        // Backward electrons which gain enough speed on the way back catch
        // up with slower ones launched forward
        let beamline = compose([
            FieldSegment::uniform_electric(in_millimeter(10.), in_volt(-20.) / in_millimeter(10.)).unwrap(),
            FieldSegment::none(in_millimeter(300.)).unwrap(),
        ])
        .unwrap();
        let spectrometer = Spectrometer::electron(beamline, None).unwrap();
        for pz in [-0.6, -0.1, 0.] {
            let hit = spectrometer.simulate(&Momentum::new(0.1, 0.1, pz), &Position::zeros()).unwrap();
            assert_eq!(
                spectrometer.reconstruct(&hit),
                Err(ReconstructionFailure::LongitudinalAmbiguous { solutions: 3 })
            );
        }
    }

    #[test]
    fn start_position_shifts_the_hit() {
        let spectrometer = Spectrometer::electron(electron_beamline(), Some(in_gauss(6.843))).unwrap();
        let p = Momentum::new(0.2, -0.1, 0.4);
        let start = Position::new(1e6, -2e6);
        let from_origin = spectrometer.simulate(&p, &Position::zeros()).unwrap();
        let shifted = spectrometer.simulate(&p, &start).unwrap();
        assert_eq!(from_origin.time_au(), shifted.time_au());
        let offset = shifted.position_au() - from_origin.position_au();
        assert_float_eq!(offset[X], start[X], rmax <= 1e-9);
        assert_float_eq!(offset[Y], start[Y], rmax <= 1e-9);
    }

    #[test]
    fn stalled_particles_never_arrive() {
        let beamline = compose([
            FieldSegment::uniform_electric(in_millimeter(10.), in_volt(-50.) / in_millimeter(10.)).unwrap(),
            FieldSegment::none(in_millimeter(20.)).unwrap(),
        ])
        .unwrap();
        let spectrometer = Spectrometer::new(beamline, None, Particle::ion(1., 1.)).unwrap();
        assert!(spectrometer.simulate(&Momentum::new(0., 0., 1.), &Position::zeros()).is_err());
        assert!(spectrometer.max_flight_time().value_as(Dimension::TIME).unwrap().is_infinite());
    }
}
