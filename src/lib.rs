//! sp8export: momentum reconstruction for the SP8 coincidence spectrometer
//!
//!
//! # Introduction (for the physicist)
//!
//! In a coincidence experiment, a molecule is ionised at the reaction point of
//! a spectrometer. The resulting ions and electrons are pulled apart by
//! electric fields, and fly towards two position-sensitive detectors which
//! record where and when each particle landed. A uniform magnetic field along
//! the spectrometer axis keeps fast electrons from escaping sideways.
//!
//! From the flight time and landing position of an electron, and a model of the
//! fields it crossed, one can work back to the momentum it had when it was
//! emitted. That is what this program does, for every event of a run.
//!
//!
//! # Introduction (for the numerical guy)
//!
//! The longitudinal motion is piecewise uniformly accelerated, so the flight
//! time is a closed-form function of the initial velocity, which is inverted
//! with a safeguarded Newton iteration. The transverse motion is a cyclotron
//! rotation whose phase is fixed by the flight time, so its inversion is a
//! linear solve, which becomes singular after a whole number of revolutions.
//! All physics is done in Hartree atomic units.
//!
//!
//! # Introduction (for the computer guy)
//!
//! The program is a straightforward batch pipeline:
//!
//! * read in the configuration and set up the spectrometer model
//! * read in the raw detector events
//! * for each event,
//!     * restructure, filter and calibrate the ion and electron hits,
//!     * apply the ion coincidence cut,
//!     * reconstruct the momentum of electrons with a good signal,
//!     * keep the event if both arms still have hits
//! * then write out the analysed events and a run summary.
//!
//! Every event is analysed independently of the others, so batches of events
//! may be analysed in parallel (see the `multi-threading` feature).

#![warn(missing_docs)]

pub mod analysis;
pub mod calib;
pub mod config;
pub mod evcut;
pub mod event;
pub mod field;
pub mod hit;
pub mod input;
pub mod momentum;
pub mod numeric;
pub mod output;
pub mod resacc;
pub mod resfin;
pub mod scheduling;
pub mod spectrometer;
pub mod units;

/// We'll use eyre's type-erased result type throughout the application
pub type Result<T> = eyre::Result<T>;
