//! Bundled lunar phase oracle.
//!
//! Times of the cardinal phases from the mean-phase polynomial and periodic
//! terms of Meeus, *Astronomical Algorithms* (2nd ed.), chapter 49. The
//! series is accurate to well under a minute for several centuries around
//! the present, which is far finer than the whole-day classification the
//! resolver applies.

use chrono::{DateTime, Utc};

use crate::error::{MoonCalError, Result};
use crate::models::{CardinalPhase, Transition};
use crate::oracle::{CardinalSearch, PhaseOracle, walk_transitions};
use crate::time::{instant_to_jde, jde_to_instant};

/// Mean length of a lunation in days.
pub const SYNODIC_MONTH_DAYS: f64 = 29.530588861;

/// JDE of the mean new moon of 2000-01-06 (lunation index k = 0).
const EPOCH_NEW_MOON_JDE: f64 = 2_451_550.09766;

/// After seeding, the search is within a lunation or two of the answer.
const MAX_SEARCH_STEPS: usize = 8;

/// Cardinal phase oracle computed from the Meeus series.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeeusOracle;

impl MeeusOracle {
    pub fn new() -> Self {
        Self
    }
}

impl CardinalSearch for MeeusOracle {
    fn at_or_after(&self, phase: CardinalPhase, instant: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let fraction = phase.lunation_fraction();
        let target = instant_to_jde(&instant);

        // Mean-phase seed, corrected once for the secular terms that
        // dominate far from the epoch.
        let lunations = (target - EPOCH_NEW_MOON_JDE) / SYNODIC_MONTH_DAYS;
        let mut k = (lunations - fraction).floor() + fraction;
        k += ((target - phase_jde(k, phase)) / SYNODIC_MONTH_DAYS).round();

        for _ in 0..MAX_SEARCH_STEPS {
            match jde_to_instant(phase_jde(k - 1.0, phase)) {
                Ok(previous) if previous >= instant => k -= 1.0,
                _ => break,
            }
        }

        for _ in 0..MAX_SEARCH_STEPS {
            let candidate = jde_to_instant(phase_jde(k, phase))?;
            if candidate >= instant {
                return Ok(candidate);
            }
            k += 1.0;
        }

        Err(MoonCalError::OracleUnavailable(format!(
            "No {} found after {}",
            phase, instant
        )))
    }
}

impl PhaseOracle for MeeusOracle {
    fn transitions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transition>> {
        walk_transitions(self, start, end)
    }
}

/// JDE (TT) of the cardinal phase with lunation index `k`.
///
/// `k` is an integer for new moons and offset by the phase's lunation
/// fraction (0.25, 0.5, 0.75) for the others.
pub fn phase_jde(k: f64, phase: CardinalPhase) -> f64 {
    let t = k / 1236.85;
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;

    let mean = EPOCH_NEW_MOON_JDE + SYNODIC_MONTH_DAYS * k + 0.00015437 * t2 - 0.000000150 * t3
        + 0.00000000073 * t4;

    let args = Arguments {
        e: 1.0 - 0.002516 * t - 0.0000074 * t2,
        m: radians(2.5534 + 29.10535670 * k - 0.0000014 * t2 - 0.00000011 * t3),
        mp: radians(
            201.5643 + 385.81693528 * k + 0.0107582 * t2 + 0.00001238 * t3 - 0.000000058 * t4,
        ),
        f: radians(
            160.7108 + 390.67050284 * k - 0.0016118 * t2 - 0.00000227 * t3 + 0.000000011 * t4,
        ),
        omega: radians(124.7746 - 1.56375588 * k + 0.0020672 * t2 + 0.00000215 * t3),
    };

    let periodic = match phase {
        CardinalPhase::New => syzygy_terms(&args, &NEW_MOON_LEADING),
        CardinalPhase::Full => syzygy_terms(&args, &FULL_MOON_LEADING),
        CardinalPhase::FirstQuarter => quarter_terms(&args) + quarter_w(&args),
        CardinalPhase::LastQuarter => quarter_terms(&args) - quarter_w(&args),
    };

    mean + periodic + planetary_terms(k, t2)
}

struct Arguments {
    /// Eccentricity of Earth's orbit factor.
    e: f64,
    /// Sun's mean anomaly.
    m: f64,
    /// Moon's mean anomaly.
    mp: f64,
    /// Moon's argument of latitude.
    f: f64,
    /// Longitude of the ascending node.
    omega: f64,
}

/// Coefficients that differ between new and full moon; the tail is shared.
const NEW_MOON_LEADING: [f64; 7] = [
    -0.40720, 0.17241, 0.01608, 0.01039, 0.00739, -0.00514, 0.00208,
];
const FULL_MOON_LEADING: [f64; 7] = [
    -0.40614, 0.17302, 0.01614, 0.01043, 0.00734, -0.00515, 0.00209,
];

fn syzygy_terms(a: &Arguments, leading: &[f64; 7]) -> f64 {
    let Arguments { e, m, mp, f, omega } = *a;

    leading[0] * mp.sin()
        + leading[1] * e * m.sin()
        + leading[2] * (2.0 * mp).sin()
        + leading[3] * (2.0 * f).sin()
        + leading[4] * e * (mp - m).sin()
        + leading[5] * e * (mp + m).sin()
        + leading[6] * e * e * (2.0 * m).sin()
        - 0.00111 * (mp - 2.0 * f).sin()
        - 0.00057 * (mp + 2.0 * f).sin()
        + 0.00056 * e * (2.0 * mp + m).sin()
        - 0.00042 * (3.0 * mp).sin()
        + 0.00042 * e * (m + 2.0 * f).sin()
        + 0.00038 * e * (m - 2.0 * f).sin()
        - 0.00024 * e * (2.0 * mp - m).sin()
        - 0.00017 * omega.sin()
        - 0.00007 * (mp + 2.0 * m).sin()
        + 0.00004 * (2.0 * mp - 2.0 * f).sin()
        + 0.00004 * (3.0 * m).sin()
        + 0.00003 * (mp + m - 2.0 * f).sin()
        + 0.00003 * (2.0 * mp + 2.0 * f).sin()
        - 0.00003 * (mp + m + 2.0 * f).sin()
        + 0.00003 * (mp - m + 2.0 * f).sin()
        - 0.00002 * (mp - m - 2.0 * f).sin()
        - 0.00002 * (3.0 * mp + m).sin()
        + 0.00002 * (4.0 * mp).sin()
}

fn quarter_terms(a: &Arguments) -> f64 {
    let Arguments { e, m, mp, f, omega } = *a;

    -0.62801 * mp.sin() + 0.17172 * e * m.sin() - 0.01183 * e * (mp + m).sin()
        + 0.00862 * (2.0 * mp).sin()
        + 0.00804 * (2.0 * f).sin()
        + 0.00454 * e * (mp - m).sin()
        + 0.00204 * e * e * (2.0 * m).sin()
        - 0.00180 * (mp - 2.0 * f).sin()
        - 0.00070 * (mp + 2.0 * f).sin()
        - 0.00040 * (3.0 * mp).sin()
        - 0.00034 * e * (2.0 * mp - m).sin()
        + 0.00032 * e * (m + 2.0 * f).sin()
        + 0.00032 * e * (m - 2.0 * f).sin()
        - 0.00028 * e * e * (mp + 2.0 * m).sin()
        + 0.00027 * e * (2.0 * mp + m).sin()
        - 0.00017 * omega.sin()
        - 0.00005 * (mp - m - 2.0 * f).sin()
        + 0.00004 * (2.0 * mp + 2.0 * f).sin()
        - 0.00004 * (mp + m + 2.0 * f).sin()
        + 0.00004 * (mp - 2.0 * m).sin()
        + 0.00003 * (mp + m - 2.0 * f).sin()
        + 0.00003 * (3.0 * m).sin()
        + 0.00002 * (2.0 * mp - 2.0 * f).sin()
        + 0.00002 * (mp - m + 2.0 * f).sin()
        - 0.00002 * (3.0 * mp + m).sin()
}

/// Added for first quarter, subtracted for last quarter.
fn quarter_w(a: &Arguments) -> f64 {
    let Arguments { e, m, mp, f, .. } = *a;

    0.00306 - 0.00038 * e * m.cos() + 0.00026 * mp.cos() - 0.00002 * (mp - m).cos()
        + 0.00002 * (mp + m).cos()
        + 0.00002 * (2.0 * f).cos()
}

/// (A0, rate per lunation, coefficient) for the fourteen planetary arguments.
const PLANETARY: [(f64, f64, f64); 14] = [
    (299.77, 0.107408, 0.000325),
    (251.88, 0.016321, 0.000165),
    (251.83, 26.651886, 0.000164),
    (349.42, 36.412478, 0.000126),
    (84.66, 18.206239, 0.000110),
    (141.74, 53.303771, 0.000062),
    (207.14, 2.453732, 0.000060),
    (154.84, 7.306860, 0.000056),
    (34.52, 27.261239, 0.000047),
    (207.19, 0.121824, 0.000042),
    (291.34, 1.844379, 0.000040),
    (161.72, 24.198154, 0.000037),
    (239.56, 25.513099, 0.000035),
    (331.55, 3.592518, 0.000023),
];

fn planetary_terms(k: f64, t2: f64) -> f64 {
    PLANETARY
        .iter()
        .enumerate()
        .map(|(i, &(a0, rate, coefficient))| {
            // A1 alone carries a secular T² term.
            let secular = if i == 0 { 0.009173 * t2 } else { 0.0 };
            coefficient * radians(a0 + rate * k - secular).sin()
        })
        .sum()
}

fn radians(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0).to_radians()
}
