//! The phase oracle seam.
//!
//! The resolver only ever asks one question of an astronomical backend:
//! which cardinal transitions fall in an inclusive UTC interval. That is
//! [`PhaseOracle`]. Backends that can instead answer "when is the next
//! `phase` at or after `t`" implement [`CardinalSearch`] and get the interval
//! form from [`walk_transitions`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::error::{MoonCalError, Result};
use crate::models::{CardinalPhase, Transition};

/// Source of exact cardinal phase transition instants.
///
/// Implementations must be deterministic: identical ranges yield identical
/// results.
pub trait PhaseOracle: Send + Sync {
    /// Every cardinal transition with `start <= instant <= end`, sorted
    /// strictly ascending by instant.
    fn transitions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transition>>;
}

impl<O: PhaseOracle + ?Sized> PhaseOracle for Box<O> {
    fn transitions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transition>> {
        (**self).transitions_between(start, end)
    }
}

impl<O: PhaseOracle + ?Sized> PhaseOracle for Arc<O> {
    fn transitions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transition>> {
        (**self).transitions_between(start, end)
    }
}

/// Point search for a single cardinal phase.
pub trait CardinalSearch {
    /// The first occurrence of `phase` at or after `instant`.
    fn at_or_after(&self, phase: CardinalPhase, instant: DateTime<Utc>) -> Result<DateTime<Utc>>;

    /// The first occurrence of `phase` strictly after `instant`.
    fn after(&self, phase: CardinalPhase, instant: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let next = instant
            .checked_add_signed(Duration::nanoseconds(1))
            .ok_or_else(|| MoonCalError::OutOfRange(format!("No instant after {}", instant)))?;
        self.at_or_after(phase, next)
    }
}

/// Enumerate transitions in `[start, end]` by walking each cardinal phase
/// forward from `start` and merging the four sequences.
pub fn walk_transitions<S: CardinalSearch + ?Sized>(
    search: &S,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Transition>> {
    let mut transitions = Vec::new();

    for phase in CardinalPhase::ALL {
        let mut instant = search.at_or_after(phase, start)?;
        while instant <= end {
            transitions.push(Transition::new(instant, phase));
            instant = search.after(phase, instant)?;
        }
    }

    transitions.sort();
    debug_assert!(
        transitions.windows(2).all(|w| w[0].instant < w[1].instant),
        "cardinal transitions must be strictly ascending"
    );
    Ok(transitions)
}

/// An oracle backed by a fixed table of transitions.
///
/// Useful for published ephemeris tables and as a deterministic stand-in in
/// tests. Asking for a transition beyond the end of the table is reported as
/// [`MoonCalError::OracleUnavailable`].
#[derive(Debug, Clone, Default)]
pub struct TableOracle {
    transitions: Vec<Transition>,
}

#[derive(Debug, Deserialize)]
struct TableEntry {
    instant: DateTime<Utc>,
    phase: CardinalPhase,
}

impl TableOracle {
    /// Build a table; entries are sorted and duplicates dropped.
    pub fn new(transitions: impl IntoIterator<Item = Transition>) -> Self {
        let mut transitions: Vec<Transition> = transitions.into_iter().collect();
        transitions.sort();
        transitions.dedup_by_key(|t| t.instant);
        Self { transitions }
    }

    /// Parse a JSON array of `{"instant": RFC3339, "phase": "FULL"}` objects.
    ///
    /// ```
    /// use mooncal_core::oracle::TableOracle;
    ///
    /// let table = TableOracle::from_json(
    ///     r#"[{"instant": "2024-01-25T17:54:00Z", "phase": "FULL"}]"#,
    /// ).unwrap();
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<TableEntry> = serde_json::from_str(json)
            .map_err(|e| MoonCalError::ParseError(format!("Invalid transition table: {}", e)))?;
        Ok(Self::new(
            entries
                .into_iter()
                .map(|e| Transition::new(e.instant, e.phase)),
        ))
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl CardinalSearch for TableOracle {
    fn at_or_after(&self, phase: CardinalPhase, instant: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let from = self.transitions.partition_point(|t| t.instant < instant);
        self.transitions[from..]
            .iter()
            .find(|t| t.phase == phase)
            .map(|t| t.instant)
            .ok_or_else(|| {
                MoonCalError::OracleUnavailable(format!(
                    "No {} at or after {} in transition table",
                    phase, instant
                ))
            })
    }
}

impl PhaseOracle for TableOracle {
    fn transitions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transition>> {
        let from = self.transitions.partition_point(|t| t.instant < start);
        let to = self.transitions.partition_point(|t| t.instant <= end);
        Ok(self.transitions[from..to.max(from)].to_vec())
    }
}
