//! Time primitives.
//!
//! This module provides functions for parsing timezone names, computing the
//! UTC instants that bound a calendar month, converting a civil date's end of
//! day in a zone to UTC, and converting instants to and from the Julian day
//! numbers the bundled phase oracle works in.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, SecondsFormat,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{MoonCalError, Result};
use crate::models::YearMonth;

/// Julian day number of 1970-01-01T00:00:00Z.
pub const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_587.5;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

const SECONDS_PER_YEAR: f64 = 365.2425 * SECONDS_PER_DAY;

/// Parse an IANA timezone name into a [`chrono_tz::Tz`].
///
/// # Examples
///
/// ```
/// use mooncal_core::time::parse_tz;
///
/// let tz = parse_tz("America/Los_Angeles").unwrap();
/// assert_eq!(tz.to_string(), "America/Los_Angeles");
/// ```
pub fn parse_tz(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| MoonCalError::InvalidTimezone(name.to_string()))
}

/// The host's zone: the `TZ` environment variable when it names an IANA
/// zone, otherwise UTC.
pub fn system_tz() -> Tz {
    let Ok(raw) = std::env::var("TZ") else {
        return Tz::UTC;
    };

    let name = raw.trim().trim_start_matches(':');
    match parse_tz(name) {
        Ok(tz) => tz,
        Err(_) => {
            debug!(tz = %raw, "TZ is not an IANA zone name, using UTC");
            Tz::UTC
        }
    }
}

/// 23:59:59.999999999, the last representable time of a civil day.
pub fn end_of_day_time() -> NaiveTime {
    NaiveTime::default() - Duration::nanoseconds(1)
}

/// The first day of `month` at 00:00:00.000000000 UTC.
pub fn start_of_month_utc(month: YearMonth) -> DateTime<Utc> {
    month.first_day().and_time(NaiveTime::default()).and_utc()
}

/// The last day of `month` at 23:59:59.999999999 UTC.
///
/// Together with [`start_of_month_utc`] this makes adjacent months disjoint
/// and gap-free at nanosecond resolution.
pub fn end_of_month_utc(month: YearMonth) -> DateTime<Utc> {
    month.last_day().and_time(end_of_day_time()).and_utc()
}

/// The instant of `date` at local 23:59:59.999999999 in `tz`, together with
/// the UTC calendar month that instant falls in.
///
/// The returned month is the UTC-side month of the instant, which differs
/// from the civil date's month when the zone's end of day crosses a UTC
/// month boundary.
///
/// Fails with [`MoonCalError::OutOfRange`] when the instant is not
/// representable, which only happens at the extremes of `NaiveDate`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use mooncal_core::time::{end_of_day_zoned_to_utc, parse_tz};
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
/// let tz = parse_tz("America/Los_Angeles").unwrap();
/// let (instant, month) = end_of_day_zoned_to_utc(date, tz).unwrap();
///
/// assert_eq!(instant.to_rfc3339(), "2024-02-01T07:59:59.999999999+00:00");
/// assert_eq!(month.to_string(), "2024-02");
/// ```
pub fn end_of_day_zoned_to_utc(date: NaiveDate, tz: Tz) -> Result<(DateTime<Utc>, YearMonth)> {
    let instant = local_to_utc(date.and_time(end_of_day_time()), tz)?;
    Ok((instant, YearMonth::from_instant(&instant)))
}

/// Convert a local datetime in `tz` to UTC.
///
/// Ambiguous times (DST fall back) resolve to the later instant. Nonexistent
/// times (DST spring forward, or a skipped civil day) are read with the
/// offset in force before the gap, which shifts them forward by the length
/// of the gap. A local time whose UTC instant cannot be represented is
/// [`MoonCalError::OutOfRange`].
pub fn local_to_utc(local: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>> {
    if let Some(dt) = tz.from_local_datetime(&local).latest() {
        return Ok(dt.with_timezone(&Utc));
    }

    let offset = offset_before_gap(local, tz);
    local
        .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
        .map(|utc| utc.and_utc())
        .ok_or_else(|| {
            MoonCalError::OutOfRange(format!("{} in {} has no UTC instant", local, tz.name()))
        })
}

fn offset_before_gap(local: NaiveDateTime, tz: Tz) -> FixedOffset {
    // Two days covers the widest historical gap (a whole skipped civil day).
    let max_minutes = 2 * 24 * 60;

    for minutes in 1..=max_minutes {
        let Some(candidate) = local.checked_sub_signed(Duration::minutes(minutes)) else {
            break;
        };
        if let Some(dt) = tz.from_local_datetime(&candidate).latest() {
            return dt.offset().fix();
        }
    }

    tz.offset_from_utc_datetime(&local).fix()
}

/// Julian day (UT) of an instant, including its sub-second part.
pub fn instant_to_julian_day(instant: &DateTime<Utc>) -> f64 {
    UNIX_EPOCH_JULIAN_DAY + unix_seconds(instant) / SECONDS_PER_DAY
}

/// The instant of a Julian day (UT), rounded to the whole second.
pub fn julian_day_to_instant(jd: f64) -> Result<DateTime<Utc>> {
    seconds_to_instant((jd - UNIX_EPOCH_JULIAN_DAY) * SECONDS_PER_DAY)
}

/// Julian Ephemeris Day (TT) of an instant: the Julian day plus ΔT.
pub fn instant_to_jde(instant: &DateTime<Utc>) -> f64 {
    let seconds = unix_seconds(instant);
    let delta_t = delta_t_seconds(decimal_year(seconds));
    UNIX_EPOCH_JULIAN_DAY + (seconds + delta_t) / SECONDS_PER_DAY
}

/// The UTC instant of a Julian Ephemeris Day (TT), rounded to the whole second.
pub fn jde_to_instant(jde: f64) -> Result<DateTime<Utc>> {
    let seconds = (jde - UNIX_EPOCH_JULIAN_DAY) * SECONDS_PER_DAY;
    seconds_to_instant(seconds - delta_t_seconds(decimal_year(seconds)))
}

fn unix_seconds(instant: &DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) * 1e-9
}

fn decimal_year(unix_seconds: f64) -> f64 {
    1970.0 + unix_seconds / SECONDS_PER_YEAR
}

fn seconds_to_instant(seconds: f64) -> Result<DateTime<Utc>> {
    let rounded = seconds.round();
    if !rounded.is_finite() || rounded.abs() >= i64::MAX as f64 {
        return Err(MoonCalError::OutOfRange(format!(
            "Epoch seconds not representable: {}",
            seconds
        )));
    }

    DateTime::from_timestamp(rounded as i64, 0).ok_or_else(|| {
        MoonCalError::OutOfRange(format!("Epoch seconds out of range: {}", rounded))
    })
}

/// ΔT = TT − UT in seconds for a decimal year.
///
/// Espenak & Meeus piecewise polynomials between 1600 and 2150, and the
/// long-term parabola outside that span.
pub fn delta_t_seconds(year: f64) -> f64 {
    if !(1600.0..2150.0).contains(&year) {
        let u = (year - 1820.0) / 100.0;
        return -20.0 + 32.0 * u * u;
    }

    if year < 1700.0 {
        let t = year - 1600.0;
        120.0 - 0.9808 * t - 0.01532 * t.powi(2) + t.powi(3) / 7129.0
    } else if year < 1800.0 {
        let t = year - 1700.0;
        8.83 + 0.1603 * t - 0.0059285 * t.powi(2) + 0.00013336 * t.powi(3)
            - t.powi(4) / 1_174_000.0
    } else if year < 1860.0 {
        let t = year - 1800.0;
        13.72 - 0.332447 * t + 0.0068612 * t.powi(2) + 0.0041116 * t.powi(3)
            - 0.00037436 * t.powi(4)
            + 0.0000121272 * t.powi(5)
            - 0.0000001699 * t.powi(6)
            + 0.000000000875 * t.powi(7)
    } else if year < 1900.0 {
        let t = year - 1860.0;
        7.62 + 0.5737 * t - 0.251754 * t.powi(2) + 0.01680668 * t.powi(3)
            - 0.0004473624 * t.powi(4)
            + t.powi(5) / 233_174.0
    } else if year < 1920.0 {
        let t = year - 1900.0;
        -2.79 + 1.494119 * t - 0.0598939 * t.powi(2) + 0.0061966 * t.powi(3)
            - 0.000197 * t.powi(4)
    } else if year < 1941.0 {
        let t = year - 1920.0;
        21.20 + 0.84493 * t - 0.076100 * t.powi(2) + 0.0020936 * t.powi(3)
    } else if year < 1961.0 {
        let t = year - 1950.0;
        29.07 + 0.407 * t - t.powi(2) / 233.0 + t.powi(3) / 2547.0
    } else if year < 1986.0 {
        let t = year - 1975.0;
        45.45 + 1.067 * t - t.powi(2) / 260.0 - t.powi(3) / 718.0
    } else if year < 2005.0 {
        let t = year - 2000.0;
        63.86 + 0.3345 * t - 0.060374 * t.powi(2)
            + 0.0017275 * t.powi(3)
            + 0.000651814 * t.powi(4)
            + 0.00002373599 * t.powi(5)
    } else if year < 2050.0 {
        let t = year - 2000.0;
        62.92 + 0.32217 * t + 0.005589 * t.powi(2)
    } else {
        let u = (year - 1820.0) / 100.0;
        -20.0 + 32.0 * u * u - 0.5628 * (2150.0 - year)
    }
}

/// Format a datetime as RFC3339 with timezone offset.
///
/// An RFC3339 formatted string (e.g., "2024-01-11T12:57:18+01:00").
pub fn format_rfc3339<T: TimeZone>(dt: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Format a UTC datetime as RFC3339 with Z suffix, keeping only the
/// sub-second digits that are non-zero (e.g. "2024-01-11T11:57:18Z",
/// "2024-01-11T23:59:59.999999999Z").
pub fn format_rfc3339_utc(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn eod(y: i32, m: u32, d: u32, zone: &str) -> (String, String) {
        let (instant, month) =
            end_of_day_zoned_to_utc(date(y, m, d), parse_tz(zone).unwrap()).unwrap();
        (format_rfc3339_utc(&instant), month.to_string())
    }

    #[test]
    fn parse_valid_timezone() {
        let tz = parse_tz("Europe/Berlin").unwrap();
        assert_eq!(tz.to_string(), "Europe/Berlin");
    }

    #[test]
    fn parse_invalid_timezone() {
        let result = parse_tz("Invalid/Timezone");
        if let Err(MoonCalError::InvalidTimezone(name)) = result {
            assert_eq!(name, "Invalid/Timezone");
        } else {
            panic!("Expected InvalidTimezone error");
        }
    }

    #[test]
    fn end_of_day_time_is_last_nanosecond() {
        assert_eq!(end_of_day_time().format("%H:%M:%S%.9f").to_string(), "23:59:59.999999999");
    }

    #[test]
    fn month_bounds_leap_february() {
        let feb = YearMonth::new(2024, 2).unwrap();
        assert_eq!(format_rfc3339_utc(&start_of_month_utc(feb)), "2024-02-01T00:00:00Z");
        assert_eq!(
            format_rfc3339_utc(&end_of_month_utc(feb)),
            "2024-02-29T23:59:59.999999999Z"
        );
    }

    #[test]
    fn month_bounds_are_adjacent() {
        let dec = YearMonth::new(2023, 12).unwrap();
        let jan = dec.succ().unwrap();
        let gap = start_of_month_utc(jan) - end_of_month_utc(dec);
        assert_eq!(gap, Duration::nanoseconds(1));
    }

    #[test]
    fn end_of_day_in_utc() {
        assert_eq!(
            eod(2024, 1, 11, "UTC"),
            ("2024-01-11T23:59:59.999999999Z".to_string(), "2024-01".to_string())
        );
    }

    #[test]
    fn end_of_day_west_of_utc_spills_into_next_month() {
        assert_eq!(
            eod(2024, 1, 31, "America/Los_Angeles"),
            ("2024-02-01T07:59:59.999999999Z".to_string(), "2024-02".to_string())
        );
        assert_eq!(
            eod(2024, 1, 1, "America/Los_Angeles"),
            ("2024-01-02T07:59:59.999999999Z".to_string(), "2024-01".to_string())
        );
    }

    #[test]
    fn end_of_day_east_of_utc() {
        assert_eq!(
            eod(2024, 2, 1, "Asia/Tokyo"),
            ("2024-02-01T14:59:59.999999999Z".to_string(), "2024-02".to_string())
        );
    }

    #[test]
    fn end_of_day_on_dst_transition_days() {
        // Spring forward: 23-hour day, end of day already at +02:00
        assert_eq!(eod(2026, 3, 29, "Europe/Berlin").0, "2026-03-29T21:59:59.999999999Z");
        // Fall back: 25-hour day, end of day back at +01:00
        assert_eq!(eod(2026, 10, 25, "Europe/Berlin").0, "2026-10-25T22:59:59.999999999Z");
    }

    #[test]
    fn ambiguous_end_of_day_takes_later_instant() {
        // Santiago leaves DST at 24:00 -> 23:00, so 23:59:59 occurs twice.
        assert_eq!(eod(2024, 4, 6, "America/Santiago").0, "2024-04-07T03:59:59.999999999Z");
    }

    #[test]
    fn skipped_civil_day_uses_offset_before_gap() {
        // Samoa skipped 2011-12-30 entirely when moving across the date line.
        let skipped = eod(2011, 12, 30, "Pacific/Apia");
        let next = eod(2011, 12, 31, "Pacific/Apia");
        assert_eq!(skipped.0, "2011-12-31T09:59:59.999999999Z");
        assert_eq!(skipped, next);
    }

    #[test]
    fn unrepresentable_end_of_day_is_out_of_range() {
        let la = parse_tz("America/Los_Angeles").unwrap();
        assert!(matches!(
            end_of_day_zoned_to_utc(NaiveDate::MAX, la),
            Err(MoonCalError::OutOfRange(_))
        ));
        assert!(matches!(
            local_to_utc(NaiveDate::MAX.and_time(end_of_day_time()), la),
            Err(MoonCalError::OutOfRange(_))
        ));
    }

    #[test]
    fn julian_day_of_j2000() {
        let j2000 = DateTime::parse_from_rfc3339("2000-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(instant_to_julian_day(&j2000), 2_451_545.0);
        assert_eq!(julian_day_to_instant(2_451_545.0).unwrap(), j2000);
    }

    #[test]
    fn jde_is_ahead_of_julian_day_by_delta_t() {
        let instant = DateTime::parse_from_rfc3339("2024-01-11T11:57:18Z")
            .unwrap()
            .with_timezone(&Utc);
        let lead_seconds = (instant_to_jde(&instant) - instant_to_julian_day(&instant)) * SECONDS_PER_DAY;
        assert!((lead_seconds - 73.8).abs() < 0.5, "ΔT was {lead_seconds}");
        assert_eq!(jde_to_instant(instant_to_jde(&instant)).unwrap(), instant);
    }

    #[test]
    fn julian_day_out_of_range() {
        assert!(julian_day_to_instant(f64::NAN).is_err());
        assert!(julian_day_to_instant(1e300).is_err());
    }

    #[test]
    fn delta_t_known_values() {
        assert!((delta_t_seconds(2000.0) - 63.86).abs() < 1e-9);
        assert!((delta_t_seconds(2024.0) - 73.871344).abs() < 1e-6);
        // Long-term parabola outside the polynomial span.
        assert!((delta_t_seconds(1500.0) - 307.68).abs() < 1e-9);
        assert!(delta_t_seconds(1000.0) > 1000.0);
    }

    #[test]
    fn format_rfc3339_with_offset() {
        let tz = parse_tz("Europe/Berlin").unwrap();
        let dt = tz.with_ymd_and_hms(2024, 1, 11, 12, 57, 18).single().unwrap();
        assert_eq!(format_rfc3339(&dt), "2024-01-11T12:57:18+01:00");
    }
}
