//! Moon phase resolution.
//!
//! Classifies a civil date in a zone into one of the eight [`Phase`]s by
//! looking at the cardinal transitions around the date's end of day:
//!
//! 1. Compute the end-of-day instant in UTC and its host UTC month.
//! 2. Fetch that month's transitions from the cache (or the oracle).
//! 3. Find the latest transition at or before the end of day.
//! 4. No such transition: the date precedes the month's first transition
//!    and lies in the intermediate phase before it. Within 24 hours of it:
//!    the cardinal phase itself. Later: the intermediate phase after it.

use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::cache::{CachedMonth, MonthCache};
use crate::error::{MoonCalError, Result};
use crate::meeus::MeeusOracle;
use crate::models::{Phase, Transition, YearMonth};
use crate::oracle::PhaseOracle;
use crate::time::{end_of_day_zoned_to_utc, end_of_month_utc, parse_tz, start_of_month_utc};

/// Resolver tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum number of months kept; `None` keeps all of them.
    pub cache_capacity: Option<NonZeroUsize>,
}

/// The outcome of resolving one date, with the facts it was decided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub date: NaiveDate,
    pub tz: Tz,
    /// `date` at 23:59:59.999999999 local time, in UTC.
    pub end_of_day_utc: DateTime<Utc>,
    /// UTC month of `end_of_day_utc`; the cache key consulted.
    pub host_month: YearMonth,
    /// The latest transition at or before the end of day, or the month's
    /// first transition when none precedes it.
    pub transition: Transition,
    /// True when `transition` lies after the end of day.
    pub before_transition: bool,
    pub phase: Phase,
}

/// Maps `(date, zone)` to a [`Phase`], caching transitions per UTC month.
///
/// ```
/// use chrono::NaiveDate;
/// use mooncal_core::prelude::*;
///
/// let resolver = MoonPhaseResolver::new();
/// let date = NaiveDate::from_ymd_opt(2024, 1, 25).unwrap();
/// let phase = resolver.phase_in(date, "UTC").unwrap();
/// assert_eq!(phase, Phase::Full);
/// ```
#[derive(Debug)]
pub struct MoonPhaseResolver<O = MeeusOracle> {
    oracle: O,
    cache: MonthCache,
}

impl MoonPhaseResolver<MeeusOracle> {
    /// A resolver over the bundled oracle with an unbounded cache.
    pub fn new() -> Self {
        Self::with_oracle(MeeusOracle)
    }
}

impl Default for MoonPhaseResolver<MeeusOracle> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: PhaseOracle> MoonPhaseResolver<O> {
    pub fn with_oracle(oracle: O) -> Self {
        Self::with_config(oracle, ResolverConfig::default())
    }

    pub fn with_config(oracle: O, config: ResolverConfig) -> Self {
        Self {
            oracle,
            cache: MonthCache::new(config.cache_capacity),
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn cache(&self) -> &MonthCache {
        &self.cache
    }

    /// The phase of `date` at its end of day in `tz`.
    pub fn phase(&self, date: NaiveDate, tz: Tz) -> Result<Phase> {
        Ok(self.resolve(date, tz)?.phase)
    }

    /// Like [`phase`](Self::phase), taking an IANA zone name.
    pub fn phase_in(&self, date: NaiveDate, tz_name: &str) -> Result<Phase> {
        let tz = parse_tz(tz_name)?;
        self.phase(date, tz)
    }

    /// Resolve `date` in `tz`, reporting the instant, month and transition
    /// the decision was based on.
    pub fn resolve(&self, date: NaiveDate, tz: Tz) -> Result<Resolution> {
        let (end_of_day_utc, host_month) = end_of_day_zoned_to_utc(date, tz)?;
        let month = self.month(host_month)?;
        let (phase, transition, before_transition) = classify(&month, end_of_day_utc)?;

        Ok(Resolution {
            date,
            tz,
            end_of_day_utc,
            host_month,
            transition,
            before_transition,
            phase,
        })
    }

    /// The cached transitions of `month`, asking the oracle on a miss.
    pub fn month(&self, month: YearMonth) -> Result<Arc<CachedMonth>> {
        self.cache.get_or_try_insert_with(month, || {
            self.oracle
                .transitions_between(start_of_month_utc(month), end_of_month_utc(month))
        })
    }
}

/// Classify an end-of-day instant against its host month.
///
/// Returns the phase, the transition it was decided by, and whether that
/// transition lies after the instant.
pub fn classify(
    month: &CachedMonth,
    end_of_day: DateTime<Utc>,
) -> Result<(Phase, Transition, bool)> {
    let Some(last) = month.last_at_or_before(end_of_day) else {
        let first = month
            .first()
            .ok_or_else(|| MoonCalError::EmptyMonth(month.month()))?;
        return Ok((first.phase.phase().predecessor(), *first, true));
    };

    let phase = if end_of_day - last.instant < Duration::days(1) {
        last.phase.phase()
    } else {
        last.phase.phase().successor()
    };
    Ok((phase, *last, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardinalPhase;
    use crate::oracle::TableOracle;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).single().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    /// Published cardinal instants, December 2023 through March 2024.
    fn canonical_table() -> TableOracle {
        use CardinalPhase::*;
        TableOracle::new([
            Transition::new(at(2023, 12, 5, 5, 49, 0), LastQuarter),
            Transition::new(at(2023, 12, 12, 23, 32, 0), New),
            Transition::new(at(2023, 12, 19, 18, 39, 0), FirstQuarter),
            Transition::new(at(2023, 12, 27, 0, 33, 0), Full),
            Transition::new(at(2024, 1, 4, 3, 30, 0), LastQuarter),
            Transition::new(at(2024, 1, 11, 11, 57, 17), New),
            Transition::new(at(2024, 1, 18, 3, 53, 0), FirstQuarter),
            Transition::new(at(2024, 1, 25, 17, 54, 0), Full),
            Transition::new(at(2024, 2, 2, 23, 18, 0), LastQuarter),
            Transition::new(at(2024, 2, 9, 22, 59, 0), New),
            Transition::new(at(2024, 2, 16, 15, 1, 0), FirstQuarter),
            Transition::new(at(2024, 2, 24, 12, 30, 0), Full),
            Transition::new(at(2024, 3, 3, 15, 23, 0), LastQuarter),
            Transition::new(at(2024, 3, 10, 9, 0, 0), New),
            Transition::new(at(2024, 3, 17, 4, 11, 0), FirstQuarter),
            Transition::new(at(2024, 3, 25, 7, 0, 0), Full),
        ])
    }

    fn resolver() -> MoonPhaseResolver<TableOracle> {
        MoonPhaseResolver::with_oracle(canonical_table())
    }

    /// Table oracle that counts calls and can be switched to fail.
    struct CountingOracle {
        inner: TableOracle,
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl CountingOracle {
        fn new() -> Self {
            Self {
                inner: canonical_table(),
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            }
        }
    }

    impl PhaseOracle for CountingOracle {
        fn transitions_between(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Transition>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(MoonCalError::OracleUnavailable("offline".to_string()));
            }
            self.inner.transitions_between(start, end)
        }
    }

    #[test]
    fn new_moon_same_day() {
        assert_eq!(resolver().phase(date(2024, 1, 11), Tz::UTC).unwrap(), Phase::New);
    }

    #[test]
    fn day_after_new_moon_is_waxing_crescent() {
        assert_eq!(
            resolver().phase(date(2024, 1, 12), Tz::UTC).unwrap(),
            Phase::WaxingCrescent
        );
    }

    #[test]
    fn full_moon_same_day() {
        assert_eq!(resolver().phase(date(2024, 1, 25), Tz::UTC).unwrap(), Phase::Full);
    }

    #[test]
    fn day_after_full_moon_is_waning_gibbous() {
        assert_eq!(
            resolver().phase(date(2024, 1, 26), Tz::UTC).unwrap(),
            Phase::WaningGibbous
        );
    }

    #[test]
    fn before_first_transition_of_month_is_predecessor() {
        let resolution = resolver().resolve(date(2024, 2, 1), Tz::UTC).unwrap();
        assert_eq!(resolution.phase, Phase::WaningGibbous);
        assert!(resolution.before_transition);
        assert_eq!(resolution.transition.phase, CardinalPhase::LastQuarter);
    }

    #[test]
    fn los_angeles_new_year_uses_january_host_month() {
        let resolver = resolver();
        let resolution = resolver
            .resolve(date(2024, 1, 1), chrono_tz::America::Los_Angeles)
            .unwrap();
        assert_eq!(resolution.phase, Phase::WaningGibbous);
        assert_eq!(resolution.host_month, month(2024, 1));
        assert_eq!(resolution.end_of_day_utc.to_rfc3339(), "2024-01-02T07:59:59.999999999+00:00");
    }

    #[test]
    fn exactly_one_day_after_is_successor() {
        // Full moon at 2024-01-25T17:54Z; a zone whose end of day lands
        // exactly 24h later sits on the boundary.
        let entry = CachedMonth::new(
            month(2024, 1),
            vec![Transition::new(at(2024, 1, 25, 17, 54, 0), CardinalPhase::Full)],
        );
        let just_under = at(2024, 1, 26, 17, 53, 59) + Duration::nanoseconds(999_999_999);
        let exact = at(2024, 1, 26, 17, 54, 0);

        assert_eq!(classify(&entry, just_under).unwrap().0, Phase::Full);
        assert_eq!(classify(&entry, exact).unwrap().0, Phase::WaningGibbous);
    }

    /// Ignores the requested range and returns the whole table.
    struct WholeTable(TableOracle);

    impl PhaseOracle for WholeTable {
        fn transitions_between(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<Transition>> {
            let mut all = self.0.transitions().to_vec();
            all.extend_from_slice(self.0.transitions());
            Ok(all)
        }
    }

    #[test]
    fn cache_holds_only_the_month_when_oracle_overreaches() {
        let resolver = MoonPhaseResolver::with_oracle(WholeTable(canonical_table()));

        let january = resolver.month(month(2024, 1)).unwrap();
        assert_eq!(january.len(), 4);
        assert_eq!(january.first().unwrap().phase, CardinalPhase::LastQuarter);

        assert_eq!(resolver.phase(date(2024, 2, 1), Tz::UTC).unwrap(), Phase::WaningGibbous);
        assert_eq!(resolver.phase(date(2024, 1, 11), Tz::UTC).unwrap(), Phase::New);
    }

    #[test]
    fn unrepresentable_end_of_day_is_an_error() {
        let resolver = resolver();
        let la: Tz = "America/Los_Angeles".parse().unwrap();
        assert!(matches!(
            resolver.phase(NaiveDate::MAX, la),
            Err(MoonCalError::OutOfRange(_))
        ));
        assert!(resolver.cache().is_empty());
    }

    #[test]
    fn transition_at_end_of_day_counts() {
        let eod = end_of_day_zoned_to_utc(date(2024, 1, 25), Tz::UTC).unwrap().0;
        let entry = CachedMonth::new(
            month(2024, 1),
            vec![Transition::new(eod, CardinalPhase::Full)],
        );
        let (phase, transition, before) = classify(&entry, eod).unwrap();
        assert_eq!(phase, Phase::Full);
        assert_eq!(transition.instant, eod);
        assert!(!before);
    }

    #[test]
    fn empty_month_is_reported() {
        let resolver = MoonPhaseResolver::with_oracle(TableOracle::default());
        let result = resolver.phase(date(2024, 1, 15), Tz::UTC);
        assert!(matches!(result, Err(MoonCalError::EmptyMonth(m)) if m == month(2024, 1)));
    }

    #[test]
    fn invalid_zone_name_is_rejected() {
        let result = resolver().phase_in(date(2024, 1, 15), "Moon/Tranquility");
        assert!(matches!(result, Err(MoonCalError::InvalidTimezone(_))));
    }

    #[test]
    fn only_host_month_is_cached() {
        let resolver = resolver();
        // End of day in Los Angeles on Jan 31 is already February in UTC.
        resolver
            .phase(date(2024, 1, 31), chrono_tz::America::Los_Angeles)
            .unwrap();
        assert_eq!(resolver.cache().months(), vec![month(2024, 2)]);
    }

    #[test]
    fn month_is_populated_once() {
        let resolver = MoonPhaseResolver::with_oracle(CountingOracle::new());
        for day in 1..=31 {
            resolver.phase(date(2024, 1, day), Tz::UTC).unwrap();
        }
        assert_eq!(resolver.oracle().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn oracle_failure_propagates_and_is_retried() {
        let resolver = MoonPhaseResolver::with_oracle(CountingOracle::new());
        resolver.oracle().failing.store(true, Ordering::SeqCst);

        let result = resolver.phase(date(2024, 1, 11), Tz::UTC);
        assert!(matches!(result, Err(MoonCalError::OracleUnavailable(_))));
        assert!(resolver.cache().is_empty());

        resolver.oracle().failing.store(false, Ordering::SeqCst);
        assert_eq!(resolver.phase(date(2024, 1, 11), Tz::UTC).unwrap(), Phase::New);
        assert_eq!(resolver.oracle().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn bounded_cache_still_resolves() {
        let resolver = MoonPhaseResolver::with_config(
            canonical_table(),
            ResolverConfig {
                cache_capacity: NonZeroUsize::new(1),
            },
        );
        assert_eq!(resolver.phase(date(2024, 1, 11), Tz::UTC).unwrap(), Phase::New);
        assert_eq!(resolver.phase(date(2024, 2, 24), Tz::UTC).unwrap(), Phase::Full);
        assert_eq!(resolver.cache().months(), vec![month(2024, 2)]);
        assert_eq!(resolver.phase(date(2024, 1, 11), Tz::UTC).unwrap(), Phase::New);
    }

    #[test]
    fn zones_with_equal_end_of_day_agree() {
        let resolver = resolver();
        for day in 1..=31 {
            let d = date(2024, 1, day);
            assert_eq!(
                resolver.phase(d, Tz::UTC).unwrap(),
                resolver.phase(d, chrono_tz::Europe::London).unwrap()
            );
            assert_eq!(
                resolver.phase(d, chrono_tz::America::Los_Angeles).unwrap(),
                resolver.phase(d, chrono_tz::Etc::GMTPlus8).unwrap()
            );
        }
    }

    #[test]
    fn concurrent_queries_agree() {
        let resolver = resolver();
        let expected: Vec<Phase> = (1..=29)
            .map(|d| resolver.phase(date(2024, 2, d), Tz::UTC).unwrap())
            .collect();
        resolver.cache().clear();
        let shared = &resolver;

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(move || {
                        (1..=29)
                            .map(|d| shared.phase(date(2024, 2, d), Tz::UTC).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
        assert_eq!(resolver.cache().months(), vec![month(2024, 2)]);
    }

    const ZONES: [Tz; 6] = [
        Tz::UTC,
        chrono_tz::America::Los_Angeles,
        chrono_tz::Asia::Tokyo,
        chrono_tz::Pacific::Kiritimati,
        chrono_tz::Pacific::Pago_Pago,
        chrono_tz::Europe::Berlin,
    ];

    proptest! {
        #[test]
        fn prop_resolution_is_deterministic(offset in 0u64..50, zone in 0usize..ZONES.len()) {
            let d = date(2024, 1, 5) + chrono::Days::new(offset);
            let resolver = resolver();
            let first = resolver.phase(d, ZONES[zone]).unwrap();
            let second = resolver.phase(d, ZONES[zone]).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_prepopulated_cache_is_coherent(offset in 0u64..50, zone in 0usize..ZONES.len()) {
            let d = date(2024, 1, 5) + chrono::Days::new(offset);
            let cold = resolver();
            let warm = resolver();
            for m in [month(2024, 1), month(2024, 2), month(2024, 3)] {
                warm.month(m).unwrap();
            }
            prop_assert_eq!(cold.phase(d, ZONES[zone]).unwrap(), warm.phase(d, ZONES[zone]).unwrap());
        }

        #[test]
        fn prop_utc_days_advance_by_at_most_one_phase(offset in 0u64..80) {
            let resolver = resolver();
            let d = date(2024, 1, 1) + chrono::Days::new(offset);
            let today = resolver.phase(d, Tz::UTC).unwrap();
            let tomorrow = resolver.phase(d + chrono::Days::new(1), Tz::UTC).unwrap();
            prop_assert!(tomorrow == today || tomorrow == today.successor());
        }
    }
}
