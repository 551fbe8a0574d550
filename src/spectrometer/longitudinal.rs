//! Motion along the beam axis
//!
//! Longitudinal motion is independent of the magnetic field (which is aligned
//! with the beam axis), so the flight time only depends on the initial
//! longitudinal velocity. Within each region, the acceleration is constant and
//! the kinematics have a closed form. Across regions, the flight time is a
//! strictly decreasing function of the initial velocity for particles launched
//! forward, but not always for particles launched backwards. It is inverted
//! piece by piece, with a bracketed Newton search on each monotonic piece.

use crate::{
    field::Beamline,
    numeric::{functions::*, Float},
};

/// Maximal number of bracket expansion or refinement steps
const MAX_ITERATIONS: usize = 256;

/// Relative tolerance on the flight time of a solution
const TIME_TOLERANCE: Float = 1e-10;

/// Number of samples used to locate the turning points of the flight time
const TURNING_POINT_SAMPLES: usize = 1024;

/// Outcome of a single region traversal
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Traversal {
    /// Velocity on exit
    pub v_out: Float,

    /// Time spent in the region
    pub time: Float,
}

/// Traverse one region of length `length` with constant acceleration `accel`,
/// starting at velocity `v_in`. Returns None if the particle never exits.
///
/// Solves `length = v_in·t + accel·t²/2` for its first positive root. The root
/// is written as `2·length / (v_in + v_out)` to avoid the cancellation that
/// the textbook `(v_out - v_in) / accel` suffers from at low acceleration, and
/// to cover field-free regions with the same expression.
///
pub(super) fn traverse(v_in: Float, accel: Float, length: Float) -> Option<Traversal> {
    let discriminant = v_in * v_in + 2. * accel * length;
    if discriminant < 0. {
        // Turned back before the end of the region
        return None;
    }
    let v_out = sqrt(discriminant);
    let denom = v_in + v_out;
    if !(denom > 0.) {
        // Not moving forward in a field-free or retarding region
        return None;
    }
    Some(Traversal {
        v_out,
        time: 2. * length / denom,
    })
}

/// Flight time from the start to the end of a beamline
pub(super) fn flight_time(beamline: &Beamline, charge_over_mass: Float, v0: Float) -> Option<Float> {
    flight_time_and_slope(beamline, charge_over_mass, v0).map(|(time, _slope)| time)
}

/// Flight time and its derivative with respect to the initial velocity
///
/// In one region, `dt/dv_in = -t/v_out` and `dv_out/dv_in = v_in/v_out`,
/// which are chained across regions.
///
fn flight_time_and_slope(
    beamline: &Beamline,
    charge_over_mass: Float,
    v0: Float,
) -> Option<(Float, Float)> {
    let mut v = v0;
    let mut dv = 1.;
    let mut time = 0.;
    let mut slope = 0.;
    for segment in beamline.segments() {
        let accel = segment.acceleration(charge_over_mass);
        let traversal = traverse(v, accel, segment.length_au())?;
        time += traversal.time;
        slope -= traversal.time / traversal.v_out * dv;
        dv *= v / traversal.v_out;
        v = traversal.v_out;
    }
    Some((time, slope))
}

/// Lowest initial velocity of the family of trajectories that reach the
/// detector and extends to arbitrarily fast particles, or -inf if particles
/// going backwards are eventually pulled forward and always make it.
pub(super) fn min_initial_velocity(beamline: &Beamline, charge_over_mass: Float) -> Float {
    threshold(beamline, charge_over_mass).0
}

/// Backward pass behind min_initial_velocity()
///
/// Works backwards from the detector: each region turns a lower bound on its
/// exit velocity into a lower bound on its entry velocity. Also tells whether
/// a particle launched exactly at the threshold would come to rest before a
/// field-free region, which it would then take forever to cross.
///
fn threshold(beamline: &Beamline, charge_over_mass: Float) -> (Float, bool) {
    let segments = beamline.segments().collect::<Vec<_>>();
    let mut min_exit = 0.;
    let mut stalls_in_drift = false;
    for (idx, segment) in segments.iter().enumerate().rev() {
        let accel = segment.acceleration(charge_over_mass);
        if accel == 0. {
            stalls_in_drift |= min_exit == 0.;
            continue;
        }
        let remainder = min_exit * min_exit - 2. * accel * segment.length_au();
        if remainder > 0. {
            min_exit = sqrt(remainder);
        } else if idx == 0 {
            return (Float::NEG_INFINITY, false);
        } else {
            min_exit = 0.;
            stalls_in_drift = false;
        }
    }
    (min_exit, stalls_in_drift)
}

/// Longest flight time of the trajectories described by min_initial_velocity()
pub(super) fn max_flight_time(beamline: &Beamline, charge_over_mass: Float) -> Float {
    let (v_min, stalls_in_drift) = threshold(beamline, charge_over_mass);
    if v_min == Float::NEG_INFINITY || stalls_in_drift {
        return Float::INFINITY;
    }
    // Nudge away from the boundary, where round-off may turn the particle back
    let v_min = v_min + abs(v_min) * 1e-12;
    flight_time(beamline, charge_over_mass, v_min).unwrap_or(Float::INFINITY)
}

/// Initial velocities for which the flight time is `target`, in increasing
/// order
///
/// The caller is expected to have checked that `target` is positive and below
/// max_flight_time(). Particles which never reach the detector are treated as
/// having an infinite flight time.
///
/// A particle launched forward keeps a positive velocity all along, so the
/// faster it starts, the earlier it arrives. A particle launched backwards is
/// turned around by the first region, and may then arrive either later or
/// earlier as it starts faster: behind a long drift region, the speed it
/// gains on the way back can win over the time lost turning around. The
/// flight time is therefore split into monotonic pieces, each of which holds
/// at most one solution.
///
pub(super) fn solve_initial_velocities(beamline: &Beamline, charge_over_mass: Float, target: Float) -> Vec<Float> {
    let length = beamline.segments().map(|s| s.length_au()).sum::<Float>();
    let excess = |v: Float| flight_time(beamline, charge_over_mass, v).map_or(Float::INFINITY, |t| t - target);

    // Find a velocity that is too fast...
    let v_min = min_initial_velocity(beamline, charge_over_mass);
    let floor = if v_min.is_finite() { v_min.max(0.) } else { 0. };
    let mut step = length / target;
    let mut hi = floor + step;
    let mut iterations = 0;
    while excess(hi) >= 0. {
        step *= 2.;
        hi = floor + step;
        iterations += 1;
        if iterations > MAX_ITERATIONS || !hi.is_finite() {
            return Vec::new();
        }
    }

    // ...and split the range of useful velocities into monotonic pieces
    let mut bounds = if v_min.is_finite() {
        vec![v_min]
    } else {
        // Launched backwards at -u, a particle is back at its starting point
        // with velocity +u after 2u/a, and arrives later than that
        let first_accel = beamline
            .segments()
            .next()
            .map_or(0., |s| s.acceleration(charge_over_mass));
        let lo = -0.5 * first_accel * target;
        let mut bounds = vec![lo];
        bounds.extend(turning_points(beamline, charge_over_mass, lo));
        bounds
    };
    bounds.push(hi);

    // Each piece holds a solution if the flight time crosses the target on it
    bounds
        .windows(2)
        .filter_map(|piece| {
            let (start, end) = (piece[0], piece[1]);
            let (start_excess, end_excess) = (excess(start), excess(end));
            if end_excess == 0. {
                Some(end)
            } else if start_excess != 0. && (start_excess > 0.) != (end_excess > 0.) {
                let (late, early) = if start_excess > 0. { (start, end) } else { (end, start) };
                refine(beamline, charge_over_mass, target, late, early)
            } else {
                None
            }
        })
        .collect()
}

/// Initial velocities in [lo, 0] where the flight time switches between
/// increasing and decreasing
///
/// The sign of the slope is sampled on a regular grid, and each sign change
/// is then located by bisection. Two turning points closer than one grid step
/// may go unnoticed.
///
fn turning_points(beamline: &Beamline, charge_over_mass: Float, lo: Float) -> Vec<Float> {
    let slope = |v: Float| flight_time_and_slope(beamline, charge_over_mass, v).map(|(_time, slope)| slope);
    let samples = (0..=TURNING_POINT_SAMPLES)
        .map(|i| lo * (1. - i as Float / TURNING_POINT_SAMPLES as Float))
        .filter_map(|v| slope(v).map(|s| (v, s)))
        .collect::<Vec<_>>();
    samples
        .windows(2)
        .filter(|pair| (pair[0].1 > 0.) != (pair[1].1 > 0.))
        .map(|pair| {
            let ((mut a, slope_a), (mut b, _)) = (pair[0], pair[1]);
            for _ in 0..MAX_ITERATIONS {
                let mid = 0.5 * (a + b);
                if mid <= a || mid >= b {
                    break;
                }
                match slope(mid) {
                    Some(s) if (s > 0.) == (slope_a > 0.) => a = mid,
                    _ => b = mid,
                }
            }
            0.5 * (a + b)
        })
        .collect()
}

/// Refine a bracket of the solution, where a particle launched at `late`
/// arrives after `target` and one launched at `early` arrives before it
///
/// Uses Newton steps, falling back to bisection whenever a Newton step would
/// leave the bracket.
///
fn refine(
    beamline: &Beamline,
    charge_over_mass: Float,
    target: Float,
    mut late: Float,
    mut early: Float,
) -> Option<Float> {
    let mut v = 0.5 * (late + early);
    for _ in 0..MAX_ITERATIONS {
        match flight_time_and_slope(beamline, charge_over_mass, v) {
            Some((time, slope)) => {
                let residual = time - target;
                if abs(residual) <= TIME_TOLERANCE * target {
                    return Some(v);
                }
                if residual > 0. {
                    late = v;
                } else {
                    early = v;
                }
                let newton = v - residual / slope;
                v = if newton > late.min(early) && newton < late.max(early) {
                    newton
                } else {
                    0.5 * (late + early)
                };
            }
            None => {
                late = v;
                v = 0.5 * (late + early);
            }
        }
        if abs(early - late) <= Float::EPSILON * abs(v) {
            break;
        }
    }

    // The bracket collapsed: accept the result only if it hits the target
    flight_time(beamline, charge_over_mass, v)
        .filter(|t| abs(t - target) <= 1e3 * TIME_TOLERANCE * target)
        .map(|_| v)
}
