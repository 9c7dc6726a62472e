//! Month grids for a phase calendar.
//!
//! A month is laid out as six weeks of seven days starting on a configurable
//! weekday, with the leading and trailing days borrowed from the neighbouring
//! months. [`MonthView`] attaches a phase and image to every cell.

use std::cmp::Ordering;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{MoonCalError, Result};
use crate::images::PhaseImages;
use crate::models::{Phase, YearMonth};
use crate::oracle::PhaseOracle;
use crate::resolver::MoonPhaseResolver;

/// How many years either side of the current month a calendar can scroll.
pub const CALENDAR_RANGE_YEARS: u32 = 20;

pub const DAYS_PER_WEEK: usize = 7;
pub const WEEKS_PER_GRID: usize = 6;
pub const CELLS_PER_GRID: usize = DAYS_PER_WEEK * WEEKS_PER_GRID;

/// An inclusive span of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarRange {
    pub first: YearMonth,
    pub last: YearMonth,
}

impl CalendarRange {
    /// `current` minus `years` through `current` plus `years`.
    pub fn around(current: YearMonth, years: u32) -> Result<Self> {
        let months = years
            .checked_mul(12)
            .ok_or_else(|| MoonCalError::OutOfRange(format!("{} years", years)))?;
        let first = current.checked_sub_months(months).ok_or_else(|| {
            MoonCalError::OutOfRange(format!("{} minus {} years", current, years))
        })?;
        let last = current.checked_add_months(months).ok_or_else(|| {
            MoonCalError::OutOfRange(format!("{} plus {} years", current, years))
        })?;
        Ok(Self { first, last })
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.first <= month && month <= self.last
    }

    /// Number of months in the range.
    pub fn len(&self) -> usize {
        let span = (self.last.year() - self.first.year()) * 12 + self.last.month() as i32
            - self.first.month() as i32;
        usize::try_from(span + 1).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn months(&self) -> impl Iterator<Item = YearMonth> + use<> {
        let last = self.last;
        std::iter::successors(Some(self.first), |m| m.succ()).take_while(move |m| *m <= last)
    }
}

/// The seven weekdays in legend order, starting at `first`.
pub fn days_of_week(first: Weekday) -> [Weekday; DAYS_PER_WEEK] {
    let mut day = first;
    std::array::from_fn(|_| {
        let current = day;
        day = day.succ();
        current
    })
}

/// Which month a grid cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOwner {
    PreviousMonth,
    ThisMonth,
    NextMonth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub owner: DayOwner,
}

/// The 42 days shown for `month` when weeks start on `first`.
pub fn month_grid(month: YearMonth, first: Weekday) -> Result<Vec<CalendarDay>> {
    let first_day = month.first_day();
    let lead = (first_day.weekday().num_days_from_monday() + 7 - first.num_days_from_monday()) % 7;
    let start = first_day
        .checked_sub_days(Days::new(u64::from(lead)))
        .ok_or_else(|| MoonCalError::OutOfRange(format!("Grid start before {}", month)))?;

    let cells: Vec<CalendarDay> = start
        .iter_days()
        .take(CELLS_PER_GRID)
        .map(|date| {
            let owner = match YearMonth::from_date(date).cmp(&month) {
                Ordering::Less => DayOwner::PreviousMonth,
                Ordering::Equal => DayOwner::ThisMonth,
                Ordering::Greater => DayOwner::NextMonth,
            };
            CalendarDay { date, owner }
        })
        .collect();

    if cells.len() < CELLS_PER_GRID {
        return Err(MoonCalError::OutOfRange(format!("Grid end after {}", month)));
    }
    Ok(cells)
}

/// One rendered calendar cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub owner: DayOwner,
    pub phase: Phase,
    pub image: String,
    pub today: bool,
}

/// A month grid with the phase of every day resolved in one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub month: YearMonth,
    pub tz: String,
    pub legend: [Weekday; DAYS_PER_WEEK],
    pub cells: Vec<DayCell>,
}

impl MonthView {
    pub fn build<O: PhaseOracle>(
        resolver: &MoonPhaseResolver<O>,
        month: YearMonth,
        first: Weekday,
        tz: Tz,
        today: NaiveDate,
        images: &PhaseImages,
    ) -> Result<Self> {
        let cells = month_grid(month, first)?
            .into_iter()
            .map(|day| {
                let phase = resolver.phase(day.date, tz)?;
                Ok(DayCell {
                    date: day.date,
                    owner: day.owner,
                    phase,
                    image: images.get(phase).to_string(),
                    today: day.date == today,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            month,
            tz: tz.name().to_string(),
            legend: days_of_week(first),
            cells,
        })
    }

    /// The grid as rows of seven cells.
    pub fn weeks(&self) -> impl Iterator<Item = &[DayCell]> {
        self.cells.chunks(DAYS_PER_WEEK)
    }
}
