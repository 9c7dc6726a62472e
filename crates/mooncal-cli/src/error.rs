use std::fmt;
use std::process::ExitCode;
use std::str::FromStr;

use mooncal_core::MoonCalError;
use serde::Serialize;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_INPUT_ERROR: u8 = 2;
pub const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Input,
    Runtime,
}

#[derive(Debug)]
pub struct CliError {
    kind: ErrorKind,
    message: String,
}

impl CliError {
    pub fn input(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Input,
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            message: message.into(),
        }
    }

    /// Prefix the message with what was being done.
    pub fn context(self, what: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{}: {}", what, self.message),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.kind {
            ErrorKind::Input => EXIT_INPUT_ERROR,
            ErrorKind::Runtime => EXIT_RUNTIME_ERROR,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Bad zones and unparsable text are the caller's fault; everything else
/// is a failure to compute.
impl From<MoonCalError> for CliError {
    fn from(err: MoonCalError) -> Self {
        match err {
            MoonCalError::InvalidTimezone(_) | MoonCalError::ParseError(_) => {
                CliError::input(err.to_string())
            }
            MoonCalError::OracleUnavailable(_)
            | MoonCalError::OutOfRange(_)
            | MoonCalError::EmptyMonth(_) => CliError::runtime(err.to_string()),
        }
    }
}

pub type CliResult<T> = std::result::Result<T, CliError>;

impl OutputFormat {
    /// Best guess for rendering an error about an unparsable format value.
    pub fn hint(s: &str) -> Self {
        s.parse().unwrap_or(OutputFormat::Text)
    }
}

impl FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> CliResult<Self> {
        if s.eq_ignore_ascii_case("json") {
            Ok(OutputFormat::Json)
        } else if s.eq_ignore_ascii_case("text") {
            Ok(OutputFormat::Text)
        } else {
            Err(CliError::input(format!(
                "Invalid output_format '{}'. Expected: json, text",
                s
            )))
        }
    }
}

/// JSON shape of an error on stderr.
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    error: &'a str,
    kind: ErrorKind,
    exit_code: u8,
}

impl CliError {
    /// Print the error to stderr and return the matching exit code.
    pub fn report(&self, output_format: OutputFormat) -> ExitCode {
        let rendered = match output_format {
            OutputFormat::Json => serde_json::to_string_pretty(&Envelope {
                error: &self.message,
                kind: self.kind,
                exit_code: self.exit_code(),
            })
            .ok(),
            OutputFormat::Text => None,
        };
        eprintln!(
            "{}",
            rendered.unwrap_or_else(|| format!("Error: {}", self.message))
        );

        ExitCode::from(self.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mooncal_core::YearMonth;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let input: CliError = MoonCalError::InvalidTimezone("Mars/Base".to_string()).into();
        assert_eq!(input.exit_code(), EXIT_INPUT_ERROR);

        let empty = MoonCalError::EmptyMonth(YearMonth::new(2024, 3).unwrap());
        let runtime: CliError = empty.into();
        assert_eq!(runtime.exit_code(), EXIT_RUNTIME_ERROR);
        assert_eq!(runtime.to_string(), "No cardinal phase transition in 2024-03");
    }

    #[test]
    fn context_keeps_kind() {
        let err = CliError::input("bad").context("Error processing 'x'");
        assert_eq!(err.to_string(), "Error processing 'x': bad");
        assert_eq!(err.exit_code(), EXIT_INPUT_ERROR);
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::hint("yaml"), OutputFormat::Text);
        assert_eq!(OutputFormat::hint("Json"), OutputFormat::Json);
    }
}
