//! Motion in the detector plane
//!
//! Transverse motion only couples to longitudinal motion through the elapsed
//! time. Without a magnetic field it is a straight drift. With a uniform field
//! along the beam axis, the transverse velocity rotates at the cyclotron
//! angular frequency `ω = q·B/m`:
//!
//! ```text
//! x(t) = x₀ + (vx·sin(ωt) + vy·(1 - cos(ωt))) / ω
//! y(t) = y₀ + (vy·sin(ωt) - vx·(1 - cos(ωt))) / ω
//! ```
//!
//! For a known flight time, this is a linear map of the initial transverse
//! velocity, whose inverse is
//!
//! ```text
//! vx = ω/2 · (Δx·cot(ωt/2) - Δy)
//! vy = ω/2 · (Δx + Δy·cot(ωt/2))
//! ```
//!
//! which is singular whenever ωt is a multiple of 2π: after a whole number of
//! revolutions, every particle is back on the axis whatever its transverse
//! momentum.

use crate::{
    momentum::{Position, X, Y},
    numeric::{
        functions::*,
        reals::consts::{PI, TAU},
        Float,
    },
};

use nalgebra::Vector2;

/// Transverse velocity
pub(super) type Velocity = Vector2<Float>;

/// Transverse position after a flight of duration `time`
pub(super) fn propagate(start: &Position, v0: &Velocity, omega: Option<Float>, time: Float) -> Position {
    match omega {
        None => start + v0 * time,
        Some(omega) => {
            let theta = omega * time;
            let (sin_th, cos_th) = (sin(theta), cos(theta));
            let shift = Vector2::new(
                v0[X] * sin_th + v0[Y] * (1. - cos_th),
                v0[Y] * sin_th - v0[X] * (1. - cos_th),
            );
            start + shift / omega
        }
    }
}

/// Number of complete revolutions during a flight of duration `time`
pub(super) fn revolutions(omega: Option<Float>, time: Float) -> u32 {
    omega.map_or(0, |omega| (abs(omega * time) / TAU).floor() as u32)
}

/// Initial transverse velocity for a particle which landed at `end` after a
/// flight of duration `time`, starting from the origin
///
/// Fails with the number of revolutions closest to the flight when the
/// cyclotron phase is within `node_tolerance` (in |sin(ωt/2)|) of a node.
/// The start of the first revolution is not a node: short flights tend to
/// the field-free drift.
///
pub(super) fn initial_velocity(
    end: &Position,
    omega: Option<Float>,
    time: Float,
    node_tolerance: Float,
) -> Result<Velocity, u32> {
    match omega {
        None => Ok(end / time),
        Some(omega) => {
            let half_theta = 0.5 * omega * time;
            let sin_half = sin(half_theta);
            let nearest_node = (abs(half_theta) / PI).round() as u32;
            if nearest_node >= 1 && abs(sin_half) < node_tolerance {
                return Err(nearest_node);
            }
            let cot_half = cos(half_theta) / sin_half;
            Ok(0.5 * omega * Vector2::new(end[X] * cot_half - end[Y], end[X] + end[Y] * cot_half))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn drift_without_field() {
        let end = propagate(&Position::new(1., -1.), &Velocity::new(0.5, 2.), None, 4.);
        assert_eq!(end, Position::new(3., 7.));
        assert_eq!(revolutions(None, 1e30), 0);
    }

    #[test]
    fn full_revolution_returns_to_start() {
        let omega = 0.25;
        let period = TAU / omega;
        let start = Position::new(0.3, -0.7);
        let end = propagate(&start, &Velocity::new(1., 2.), Some(omega), period);
        assert_float_eq!(end[X], start[X], abs <= 1e-12);
        assert_float_eq!(end[Y], start[Y], abs <= 1e-12);
        assert_eq!(revolutions(Some(omega), 0.99 * period), 0);
        assert_eq!(revolutions(Some(-omega), 2.5 * period), 2);
    }

    #[test]
    fn half_revolution_lands_on_the_diameter() {
        // After half a turn, the particle sits one diameter (2v/ω) away
        let omega = 2.;
        let end = propagate(&Position::zeros(), &Velocity::new(3., 0.), Some(omega), PI / omega);
        assert_float_eq!(end[X], 0., abs <= 1e-12);
        assert_float_eq!(end[Y], -3., abs <= 1e-12);
    }

    #[test]
    fn inverse_matches_forward() {
        for &omega in &[None, Some(0.3), Some(-0.3)] {
            for &time in &[1., 7., 25.] {
                let v0 = Velocity::new(-0.4, 1.1);
                let end = propagate(&Position::zeros(), &v0, omega, time);
                let v = initial_velocity(&end, omega, time, 1e-3).unwrap();
                assert_float_eq!(v[X], v0[X], abs <= 1e-10);
                assert_float_eq!(v[Y], v0[Y], abs <= 1e-10);
            }
        }
    }

    #[test]
    fn nodes_are_ambiguous() {
        let omega = 0.5;
        let end = Position::new(1e-9, 0.);
        assert_eq!(initial_velocity(&end, Some(omega), 2. * TAU / omega, 1e-3), Err(2));
        assert_eq!(initial_velocity(&end, Some(omega), 0.9999 * TAU / omega, 1e-3), Err(1));
    }

    #[test]
    fn short_flights_are_not_ambiguous() {
        let omega = 0.5;
        let v0 = Velocity::new(0.5, -0.3);
        for time in [1e-6, 1e-4 * TAU / omega] {
            let end = propagate(&Position::zeros(), &v0, Some(omega), time);
            let v = initial_velocity(&end, Some(omega), time, 1e-3).unwrap();
            assert_float_eq!(v[X], v0[X], rmax <= 1e-8);
            assert_float_eq!(v[Y], v0[Y], rmax <= 1e-8);
        }
    }
}
