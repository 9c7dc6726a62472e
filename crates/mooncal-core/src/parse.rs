//! Input parsing for civil dates.
//!
//! Dates can be given in several formats:
//! - `date`: an ISO calendar date (e.g., `2024-01-25`, the default)
//! - `rfc3339`: an RFC3339 instant, read as the civil date it falls on in the zone
//! - `epoch_s`: Unix epoch seconds, read the same way

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

use crate::error::{MoonCalError, Result};
use crate::models::YearMonth;

/// Supported date input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    /// Calendar date (e.g., "2024-01-25")
    #[default]
    Date,
    /// RFC3339 instant (e.g., "2024-01-25T17:54:00Z" or "2024-01-25T18:54:00+01:00")
    Rfc3339,
    /// Unix epoch seconds (e.g., "1706205240")
    EpochS,
}

impl std::fmt::Display for DateFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateFormat::Date => write!(f, "date"),
            DateFormat::Rfc3339 => write!(f, "rfc3339"),
            DateFormat::EpochS => write!(f, "epoch_s"),
        }
    }
}

impl FromStr for DateFormat {
    type Err = MoonCalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "date" => Ok(DateFormat::Date),
            "rfc3339" => Ok(DateFormat::Rfc3339),
            "epoch_s" => Ok(DateFormat::EpochS),
            _ => Err(MoonCalError::ParseError(format!(
                "Unknown format: '{}'. Expected 'date', 'rfc3339', or 'epoch_s'",
                s
            ))),
        }
    }
}

/// Parse a civil date according to the specified format.
///
/// Instant formats are converted to the civil date they fall on in `tz`.
///
/// # Examples
///
/// ```
/// use mooncal_core::parse::{parse_date, DateFormat};
/// use chrono::NaiveDate;
/// use chrono_tz::Tz;
///
/// let date = parse_date("2024-01-25", DateFormat::Date, Tz::UTC).unwrap();
/// assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 25).unwrap());
///
/// // 23:30 UTC is already the next day in Tokyo.
/// let tokyo: Tz = "Asia/Tokyo".parse().unwrap();
/// let date = parse_date("2024-01-25T23:30:00Z", DateFormat::Rfc3339, tokyo).unwrap();
/// assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 26).unwrap());
/// ```
pub fn parse_date(input: &str, format: DateFormat, tz: Tz) -> Result<NaiveDate> {
    let trimmed = input.trim();

    match format {
        DateFormat::Date => parse_calendar_date(trimmed),
        DateFormat::Rfc3339 => parse_rfc3339(trimmed).map(|dt| local_date(dt, tz)),
        DateFormat::EpochS => parse_epoch_s(trimmed).map(|dt| local_date(dt, tz)),
    }
}

fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

fn parse_calendar_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|e| {
        MoonCalError::ParseError(format!(
            "Invalid date: '{}'. Expected YYYY-MM-DD ({})",
            input, e
        ))
    })
}

fn parse_epoch_s(input: &str) -> Result<DateTime<Utc>> {
    let s: i64 = input.parse().map_err(|_| {
        MoonCalError::ParseError(format!(
            "Invalid epoch seconds: '{}'. Expected integer value.",
            input
        ))
    })?;

    DateTime::from_timestamp(s, 0)
        .ok_or_else(|| MoonCalError::ParseError(format!("Epoch seconds out of range: {}", s)))
}

fn parse_rfc3339(input: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            MoonCalError::ParseError(format!(
                "Invalid RFC3339 timestamp: '{}'. Error: {}",
                input, e
            ))
        })
}

/// Parse a date, detecting the format.
///
/// Anything containing a `T` is read as RFC3339, a bare integer as epoch
/// seconds, and everything else as a calendar date.
pub fn parse_date_auto(input: &str, tz: Tz) -> Result<NaiveDate> {
    let trimmed = input.trim();

    if trimmed.contains('T') {
        return parse_date(trimmed, DateFormat::Rfc3339, tz);
    }
    if trimmed.parse::<i64>().is_ok() {
        return parse_date(trimmed, DateFormat::EpochS, tz);
    }
    parse_date(trimmed, DateFormat::Date, tz)
}

/// Parse a `YYYY-MM` month.
pub fn parse_year_month(input: &str) -> Result<YearMonth> {
    input.parse()
}
