use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;
use mooncal_core::{
    DateFormat, MeeusOracle, MoonPhaseResolver, Phase, PhaseImages, PhaseOracle, ResolverConfig,
    TableOracle, YearMonth,
};
use tracing::debug;

use crate::cli::OracleArgs;
use crate::error::{CliError, CliResult};

/// Resolver over whichever oracle the command line selected.
pub type Resolver = MoonPhaseResolver<Box<dyn PhaseOracle>>;

pub fn parse_tz_or_input_error(name: &str) -> CliResult<Tz> {
    mooncal_core::time::parse_tz(name)
        .map_err(|e| CliError::input(format!("Invalid timezone '{}': {}", name, e)))
}

pub fn parse_format(s: &str) -> CliResult<DateFormat> {
    s.parse::<DateFormat>().map_err(CliError::from)
}

pub fn parse_week_start(s: &str) -> CliResult<Weekday> {
    s.trim().parse::<Weekday>().map_err(|_| {
        CliError::input(format!(
            "Invalid week_start '{}'. Expected a weekday, e.g. monday, sun",
            s
        ))
    })
}

pub fn parse_month(s: &str) -> CliResult<YearMonth> {
    mooncal_core::parse_year_month(s).map_err(CliError::from)
}

pub fn parse_civil_date(s: &str) -> CliResult<NaiveDate> {
    mooncal_core::parse_date(s, DateFormat::Date, Tz::UTC).map_err(CliError::from)
}

/// A phase name, or `off` / `none` for no target.
pub fn parse_target(s: &str) -> CliResult<Option<Phase>> {
    match s.trim().to_lowercase().as_str() {
        "off" | "none" => Ok(None),
        _ => s.parse::<Phase>().map(Some).map_err(CliError::from),
    }
}

pub fn open_input(input: &str, stdin: bool) -> CliResult<Box<dyn BufRead>> {
    if stdin || input == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }

    let file = File::open(input)
        .map_err(|e| CliError::runtime(format!("Failed to open file '{}': {}", input, e)))?;
    Ok(Box::new(BufReader::new(file)))
}

pub fn build_resolver(args: &OracleArgs) -> CliResult<Resolver> {
    let cache_capacity = match args.cache_capacity {
        None => None,
        Some(n) => Some(NonZeroUsize::new(n).ok_or_else(|| {
            CliError::input("Invalid cache_capacity '0'. Expected at least 1")
        })?),
    };

    let oracle: Box<dyn PhaseOracle> = match &args.ephemeris {
        Some(path) => {
            let table = load_ephemeris(path).map_err(|e| CliError::input(format!("{:#}", e)))?;
            debug!(path = %path.display(), transitions = table.len(), "loaded ephemeris table");
            Box::new(table)
        }
        None => Box::new(MeeusOracle::new()),
    };

    Ok(MoonPhaseResolver::with_config(
        oracle,
        ResolverConfig { cache_capacity },
    ))
}

pub fn load_images(args: &OracleArgs) -> CliResult<PhaseImages> {
    match &args.images {
        Some(path) => read_images(path).map_err(|e| CliError::input(format!("{:#}", e))),
        None => Ok(PhaseImages::default()),
    }
}

fn load_ephemeris(path: &Path) -> anyhow::Result<TableOracle> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read ephemeris file: {}", path.display()))?;
    TableOracle::from_json(&json)
        .with_context(|| format!("Failed to load ephemeris file: {}", path.display()))
}

fn read_images(path: &Path) -> anyhow::Result<PhaseImages> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read image table: {}", path.display()))?;
    PhaseImages::from_json(&json)
        .with_context(|| format!("Failed to load image table: {}", path.display()))
}

/// Short label used in calendar grids.
pub fn phase_abbreviation(phase: Phase) -> &'static str {
    match phase {
        Phase::New => "NM",
        Phase::WaxingCrescent => "WXC",
        Phase::FirstQuarter => "FQ",
        Phase::WaxingGibbous => "WXG",
        Phase::Full => "FM",
        Phase::WaningGibbous => "WNG",
        Phase::LastQuarter => "LQ",
        Phase::WaningCrescent => "WNC",
    }
}
