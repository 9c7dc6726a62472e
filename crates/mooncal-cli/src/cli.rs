use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Moon phase calendar tool
#[derive(Parser, Debug)]
#[command(name = "mooncal")]
#[command(version, about = "Moon phase calendar tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug) logging
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the moon phase of dates
    Phase(PhaseArgs),
    /// Show a month grid with the phase of every day
    Calendar(CalendarArgs),
    /// List the cardinal phase transitions of a month
    Transitions(TransitionsArgs),
    /// Check whether a date reaches a target phase
    Alert(AlertArgs),
}

/// Options shared by every command that resolves phases.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct OracleArgs {
    /// Keep at most this many months of transitions cached (default: unbounded)
    #[arg(long)]
    pub cache_capacity: Option<usize>,

    /// JSON transition table to use instead of the built-in phase series
    #[arg(long)]
    pub ephemeris: Option<PathBuf>,

    /// JSON object overriding per-phase image identifiers
    #[arg(long)]
    pub images: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct PhaseArgs {
    /// IANA timezone (e.g., Europe/Berlin)
    #[arg(short, long, default_value = "UTC")]
    pub tz: String,

    /// Input format: date, rfc3339, epoch_s
    #[arg(short = 'f', long, default_value = "date")]
    pub format: String,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,

    /// Input file path (use - for stdin)
    #[arg(long, default_value = "-")]
    pub input: String,

    /// Read from stdin
    #[arg(long)]
    pub stdin: bool,

    #[command(flatten)]
    pub oracle: OracleArgs,
}

#[derive(clap::Args, Debug)]
pub struct CalendarArgs {
    /// Month to show, YYYY-MM (default: the current month)
    #[arg(short, long)]
    pub month: Option<String>,

    /// IANA timezone
    #[arg(short, long, default_value = "UTC")]
    pub tz: String,

    /// First day of the week (e.g., monday, sun)
    #[arg(long, default_value = "monday")]
    pub week_start: String,

    /// Date to mark as today, YYYY-MM-DD (default: today in the zone)
    #[arg(long)]
    pub today: Option<String>,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,

    #[command(flatten)]
    pub oracle: OracleArgs,
}

#[derive(clap::Args, Debug)]
pub struct TransitionsArgs {
    /// Month to list, YYYY-MM
    #[arg(short, long)]
    pub month: String,

    /// IANA timezone for local times
    #[arg(short, long, default_value = "UTC")]
    pub tz: String,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,

    #[command(flatten)]
    pub oracle: OracleArgs,
}

#[derive(clap::Args, Debug)]
pub struct AlertArgs {
    /// Phase to alert on (e.g., full, waxing_gibbous), or "off"
    #[arg(long)]
    pub target: String,

    /// Date to check, YYYY-MM-DD (default: today in the zone)
    #[arg(long)]
    pub date: Option<String>,

    /// IANA timezone
    #[arg(short, long, default_value = "UTC")]
    pub tz: String,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,

    #[command(flatten)]
    pub oracle: OracleArgs,
}
