//! # mooncal-core
//!
//! A moon phase calendar library for Rust.
//!
//! This library classifies any civil date, in any IANA timezone, into one of
//! eight named lunar phases, using exact instants of the four cardinal phase
//! transitions from an astronomical oracle.
//!
//! ## Features
//!
//! - **End-of-day semantics**: A date is classified by the moon's state at
//!   its last nanosecond, 23:59:59.999999999 local time, so a full moon at
//!   any hour of the day makes the whole day "full".
//! - **DST Safety**: Ambiguous and nonexistent local times resolve
//!   deterministically, including whole skipped civil days.
//! - **Month Cache**: Transitions are fetched once per UTC month and shared
//!   across threads, with optional LRU bounding.
//! - **Bundled Oracle**: A deterministic Meeus phase series with ΔT, or any
//!   [`PhaseOracle`] such as a published ephemeris table.
//! - **Calendar Views**: Month grids with a configurable first weekday, and
//!   phase alerts driven by observable date state.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use mooncal_core::prelude::*;
//!
//! let resolver = MoonPhaseResolver::new();
//! let tz = parse_tz("America/Los_Angeles").unwrap();
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 25).unwrap();
//! let resolution = resolver.resolve(date, tz).unwrap();
//!
//! println!("Phase: {}", resolution.phase);
//! println!("End of day (UTC): {}", resolution.end_of_day_utc);
//! println!("Host month: {}", resolution.host_month);
//! ```

pub mod alert;
pub mod cache;
pub mod calendar;
pub mod compute;
pub mod error;
pub mod images;
pub mod meeus;
pub mod models;
pub mod notifier;
pub mod oracle;
pub mod parse;
pub mod resolver;
pub mod time;

// Re-export commonly used types at the crate root
pub use compute::{PhaseReport, compute_phase_from_string};
pub use error::{MoonCalError, Result};
pub use images::PhaseImages;
pub use meeus::MeeusOracle;
pub use models::{CardinalPhase, Phase, Transition, YearMonth};
pub use oracle::{PhaseOracle, TableOracle};
pub use parse::{DateFormat, parse_date, parse_date_auto, parse_year_month};
pub use resolver::{MoonPhaseResolver, Resolution, ResolverConfig};

/// Prelude module for convenient imports.
///
/// ```
/// use mooncal_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::alert::{Notification, NotificationSink, PhaseAlert};
    pub use crate::calendar::{CALENDAR_RANGE_YEARS, CalendarRange, DayOwner, MonthView};
    pub use crate::compute::{PhaseReport, compute_phase_from_string};
    pub use crate::error::{MoonCalError, Result};
    pub use crate::images::PhaseImages;
    pub use crate::meeus::MeeusOracle;
    pub use crate::models::*;
    pub use crate::oracle::{PhaseOracle, TableOracle};
    pub use crate::parse::{DateFormat, parse_date, parse_date_auto, parse_year_month};
    pub use crate::resolver::{MoonPhaseResolver, Resolution, ResolverConfig};
    pub use crate::time::{end_of_day_zoned_to_utc, parse_tz, system_tz};
}
