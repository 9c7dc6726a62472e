//! Phase report assembly.
//!
//! Ties parsing, resolution and image lookup together into a serializable
//! [`PhaseReport`], the unit the CLI prints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::images::PhaseImages;
use crate::models::{CardinalPhase, Phase, YearMonth};
use crate::oracle::PhaseOracle;
use crate::parse::{DateFormat, parse_date};
use crate::resolver::{MoonPhaseResolver, Resolution};
use crate::time::{format_rfc3339_utc, parse_tz};

/// The input as given, and the civil date it was read as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDate {
    pub raw: String,
    pub date: NaiveDate,
}

/// The transition a phase was decided by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionReport {
    /// RFC3339 UTC instant of the transition.
    pub instant: String,
    pub phase: CardinalPhase,
    /// True when the transition lies after the date's end of day.
    pub upcoming: bool,
}

/// Everything known about the phase of one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub input: InputDate,
    pub tz: String,
    pub end_of_day_utc: String,
    pub host_month: YearMonth,
    pub phase: Phase,
    pub image: String,
    pub transition: TransitionReport,
}

impl PhaseReport {
    pub fn new(resolution: &Resolution, raw: &str, images: &PhaseImages) -> Self {
        Self {
            input: InputDate {
                raw: raw.trim().to_string(),
                date: resolution.date,
            },
            tz: resolution.tz.name().to_string(),
            end_of_day_utc: format_rfc3339_utc(&resolution.end_of_day_utc),
            host_month: resolution.host_month,
            phase: resolution.phase,
            image: images.get(resolution.phase).to_string(),
            transition: TransitionReport {
                instant: format_rfc3339_utc(&resolution.transition.instant),
                phase: resolution.transition.phase,
                upcoming: resolution.before_transition,
            },
        }
    }
}

/// Parse `input`, resolve its phase in the zone `tz_name` and build a report.
///
/// # Examples
///
/// ```
/// use mooncal_core::prelude::*;
///
/// let resolver = MoonPhaseResolver::new();
/// let report = compute_phase_from_string(
///     &resolver,
///     "2024-01-11",
///     DateFormat::Date,
///     "UTC",
///     &PhaseImages::default(),
/// )
/// .unwrap();
///
/// assert_eq!(report.phase, Phase::New);
/// assert_eq!(report.image, "new_moon");
/// ```
pub fn compute_phase_from_string<O: PhaseOracle>(
    resolver: &MoonPhaseResolver<O>,
    input: &str,
    format: DateFormat,
    tz_name: &str,
    images: &PhaseImages,
) -> Result<PhaseReport> {
    let tz = parse_tz(tz_name)?;
    let date = parse_date(input, format, tz)?;
    let resolution = resolver.resolve(date, tz)?;
    Ok(PhaseReport::new(&resolution, input, images))
}
