//! Core data types for mooncal.
//!
//! This module defines the primary types used throughout the library:
//! - [`Phase`] - One of the eight named lunar phases, in cyclic order
//! - [`CardinalPhase`] - The four phases an oracle can locate as exact instants
//! - [`YearMonth`] - A calendar month, used as the cache key
//! - [`Transition`] - The instant at which a cardinal phase occurs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{MoonCalError, Result};

/// A named lunar phase.
///
/// Variants are declared in cyclic order starting at [`Phase::New`];
/// [`Phase::successor`] of [`Phase::WaningCrescent`] wraps back to `New`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    New,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    Full,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl Phase {
    /// All phases in cycle order.
    pub const ALL: [Phase; 8] = [
        Phase::New,
        Phase::WaxingCrescent,
        Phase::FirstQuarter,
        Phase::WaxingGibbous,
        Phase::Full,
        Phase::WaningGibbous,
        Phase::LastQuarter,
        Phase::WaningCrescent,
    ];

    /// Position of this phase in [`Phase::ALL`].
    pub fn index(self) -> usize {
        match self {
            Phase::New => 0,
            Phase::WaxingCrescent => 1,
            Phase::FirstQuarter => 2,
            Phase::WaxingGibbous => 3,
            Phase::Full => 4,
            Phase::WaningGibbous => 5,
            Phase::LastQuarter => 6,
            Phase::WaningCrescent => 7,
        }
    }

    /// The next phase in the cycle.
    pub fn successor(self) -> Phase {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// The previous phase in the cycle.
    pub fn predecessor(self) -> Phase {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// The cardinal phase this value names, if any.
    pub fn cardinal(self) -> Option<CardinalPhase> {
        match self {
            Phase::New => Some(CardinalPhase::New),
            Phase::FirstQuarter => Some(CardinalPhase::FirstQuarter),
            Phase::Full => Some(CardinalPhase::Full),
            Phase::LastQuarter => Some(CardinalPhase::LastQuarter),
            _ => None,
        }
    }

    pub fn is_cardinal(self) -> bool {
        self.cardinal().is_some()
    }

    /// Canonical spelling, e.g. `WAXING_GIBBOUS`.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::New => "NEW",
            Phase::WaxingCrescent => "WAXING_CRESCENT",
            Phase::FirstQuarter => "FIRST_QUARTER",
            Phase::WaxingGibbous => "WAXING_GIBBOUS",
            Phase::Full => "FULL",
            Phase::WaningGibbous => "WANING_GIBBOUS",
            Phase::LastQuarter => "LAST_QUARTER",
            Phase::WaningCrescent => "WANING_CRESCENT",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = MoonCalError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        if let Some(phase) = Phase::ALL.iter().find(|p| p.as_str() == normalized) {
            return Ok(*phase);
        }
        // Long forms used by the calendar screen's phase picker.
        match normalized.as_str() {
            "NEW_MOON" => Ok(Phase::New),
            "FULL_MOON" => Ok(Phase::Full),
            _ => Err(MoonCalError::ParseError(format!(
                "Unknown phase '{}'. Expected one of: {}",
                s,
                Phase::ALL.map(Phase::as_str).join(", ")
            ))),
        }
    }
}

/// A phase whose instant is astronomically defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardinalPhase {
    New,
    FirstQuarter,
    Full,
    LastQuarter,
}

impl CardinalPhase {
    /// All cardinal phases in cycle order.
    pub const ALL: [CardinalPhase; 4] = [
        CardinalPhase::New,
        CardinalPhase::FirstQuarter,
        CardinalPhase::Full,
        CardinalPhase::LastQuarter,
    ];

    /// Fraction of a lunation at which this phase occurs (0, ¼, ½, ¾).
    pub fn lunation_fraction(self) -> f64 {
        match self {
            CardinalPhase::New => 0.0,
            CardinalPhase::FirstQuarter => 0.25,
            CardinalPhase::Full => 0.5,
            CardinalPhase::LastQuarter => 0.75,
        }
    }

    /// The eight-phase value for this cardinal phase.
    pub fn phase(self) -> Phase {
        match self {
            CardinalPhase::New => Phase::New,
            CardinalPhase::FirstQuarter => Phase::FirstQuarter,
            CardinalPhase::Full => Phase::Full,
            CardinalPhase::LastQuarter => Phase::LastQuarter,
        }
    }
}

impl From<CardinalPhase> for Phase {
    fn from(cardinal: CardinalPhase) -> Self {
        cardinal.phase()
    }
}

impl fmt::Display for CardinalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.phase().as_str())
    }
}

impl FromStr for CardinalPhase {
    type Err = MoonCalError;

    fn from_str(s: &str) -> Result<Self> {
        let phase: Phase = s.parse()?;
        phase.cardinal().ok_or_else(|| {
            MoonCalError::ParseError(format!(
                "'{}' is not a cardinal phase. Expected: NEW, FIRST_QUARTER, FULL, LAST_QUARTER",
                s
            ))
        })
    }
}

/// A calendar month of the proleptic Gregorian calendar.
///
/// Always holds a representable first day, so every accessor is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first_day: NaiveDate,
}

impl YearMonth {
    /// Build a month from its year and month-of-year (1..=12).
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first_day| Self { first_day })
            .ok_or_else(|| {
                MoonCalError::OutOfRange(format!("Invalid year-month: {}-{:02}", year, month))
            })
    }

    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            first_day: date - Days::new(u64::from(date.day0())),
        }
    }

    /// The UTC calendar month containing `instant`.
    pub fn from_instant(instant: &DateTime<Utc>) -> Self {
        Self::from_date(instant.date_naive())
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn last_day(&self) -> NaiveDate {
        self.days().last().unwrap_or(self.first_day)
    }

    /// Every civil date of the month, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let month = self.month();
        self.first_day
            .iter_days()
            .take_while(move |d| d.month() == month)
    }

    pub fn checked_add_months(&self, months: u32) -> Option<Self> {
        self.first_day
            .checked_add_months(Months::new(months))
            .map(|first_day| Self { first_day })
    }

    pub fn checked_sub_months(&self, months: u32) -> Option<Self> {
        self.first_day
            .checked_sub_months(Months::new(months))
            .map(|first_day| Self { first_day })
    }

    /// The following month, if representable.
    pub fn succ(&self) -> Option<Self> {
        self.checked_add_months(1)
    }

    /// The preceding month, if representable.
    pub fn pred(&self) -> Option<Self> {
        self.checked_sub_months(1)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = MoonCalError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || {
            MoonCalError::ParseError(format!(
                "Invalid year-month '{}'. Expected format: YYYY-MM",
                s
            ))
        };

        let (year, month) = trimmed.rsplit_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        YearMonth::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A cardinal phase transition at an exact instant.
///
/// Orders by instant first, which is the order an oracle reports them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub instant: DateTime<Utc>,
    pub phase: CardinalPhase,
}

impl Transition {
    pub fn new(instant: DateTime<Utc>, phase: CardinalPhase) -> Self {
        Self { instant, phase }
    }
}
