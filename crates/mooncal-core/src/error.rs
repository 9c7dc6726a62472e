//! Error types for mooncal-core.
//!
//! The resolver itself is total for well-formed input; these variants cover
//! the edges around it: bad textual input, unknown zones, a fallible oracle,
//! and calendar arithmetic at the limits of the representable range.

use thiserror::Error;

use crate::models::YearMonth;

/// The main error type for mooncal operations.
#[derive(Debug, Error)]
pub enum MoonCalError {
    /// Invalid timezone name provided.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Error parsing a date, month, phase or format name.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The phase oracle could not produce a transition.
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Calendar or instant arithmetic left the representable range.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// A month holds no cardinal transition, so no phase can be classified.
    #[error("No cardinal phase transition in {0}")]
    EmptyMonth(YearMonth),
}

/// Result type alias for mooncal operations.
pub type Result<T> = std::result::Result<T, MoonCalError>;
