//! Month-keyed cache of cardinal transitions.
//!
//! Each [`YearMonth`] cell starts unpopulated and becomes populated the first
//! time a query lands in it; a populated cell never changes. The cache is a
//! coarse lock around an LRU map: lookups and inserts hold the lock, the
//! oracle call that fills a missing cell does not. Two threads missing the
//! same month may both compute it; the first insert wins and both observe
//! the same entry.

use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::Result;
use crate::models::{Transition, YearMonth};
use crate::time::{end_of_month_utc, start_of_month_utc};

/// The sorted cardinal transitions of one UTC calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMonth {
    month: YearMonth,
    transitions: Vec<Transition>,
}

impl CachedMonth {
    /// Sorts `transitions`, drops repeated instants and anything outside
    /// the month's UTC bounds.
    pub fn new(month: YearMonth, mut transitions: Vec<Transition>) -> Self {
        let (start, end) = (start_of_month_utc(month), end_of_month_utc(month));
        let received = transitions.len();

        transitions.retain(|t| t.instant >= start && t.instant <= end);
        transitions.sort();
        transitions.dedup_by_key(|t| t.instant);

        if transitions.len() != received {
            debug!(
                %month,
                dropped = received - transitions.len(),
                "discarded transitions outside the month or at a repeated instant"
            );
        }
        Self { month, transitions }
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn first(&self) -> Option<&Transition> {
        self.transitions.first()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// The transition with the largest instant `<= instant`.
    pub fn last_at_or_before(&self, instant: DateTime<Utc>) -> Option<&Transition> {
        let after = self.transitions.partition_point(|t| t.instant <= instant);
        after.checked_sub(1).map(|i| &self.transitions[i])
    }
}

/// Thread-safe map from month to its cached transitions.
pub struct MonthCache {
    entries: Mutex<LruCache<YearMonth, Arc<CachedMonth>>>,
    capacity: Option<NonZeroUsize>,
}

impl MonthCache {
    /// `None` keeps every month ever populated; `Some(n)` evicts the least
    /// recently used month beyond `n`.
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        let entries = match capacity {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(entries),
            capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self::new(Some(capacity))
    }

    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    /// The cached entry for `month`, marking it recently used.
    pub fn get(&self, month: YearMonth) -> Option<Arc<CachedMonth>> {
        self.entries.lock().get(&month).cloned()
    }

    /// Store an entry unless its month is already present; returns the
    /// entry the cache holds afterwards.
    pub fn insert(&self, entry: CachedMonth) -> Arc<CachedMonth> {
        let month = entry.month();
        let mut entries = self.entries.lock();

        if let Some(existing) = entries.get(&month) {
            trace!(%month, "month already cached");
            return Arc::clone(existing);
        }

        let entry = Arc::new(entry);
        if let Some((evicted, _)) = entries.push(month, Arc::clone(&entry)) {
            debug!(%evicted, %month, "evicted least recently used month");
        }
        entry
    }

    /// The entry for `month`, populating it with `populate` on a miss.
    ///
    /// A failing `populate` leaves the month unpopulated so a later call
    /// retries.
    pub fn get_or_try_insert_with<F>(&self, month: YearMonth, populate: F) -> Result<Arc<CachedMonth>>
    where
        F: FnOnce() -> Result<Vec<Transition>>,
    {
        if let Some(entry) = self.get(month) {
            trace!(%month, "month cache hit");
            return Ok(entry);
        }

        let transitions = populate()?;
        debug!(%month, transitions = transitions.len(), "populated month cache");
        Ok(self.insert(CachedMonth::new(month, transitions)))
    }

    /// Whether `month` is populated, without touching recency.
    pub fn contains(&self, month: YearMonth) -> bool {
        self.entries.lock().contains(&month)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Populated months in ascending order.
    pub fn months(&self) -> Vec<YearMonth> {
        let mut months: Vec<YearMonth> = self.entries.lock().iter().map(|(m, _)| *m).collect();
        months.sort();
        months
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for MonthCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Debug for MonthCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonthCache")
            .field("months", &self.months())
            .field("capacity", &self.capacity)
            .finish()
    }
}
