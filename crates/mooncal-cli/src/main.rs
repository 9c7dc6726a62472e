use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod alert_cmd;
mod calendar_cmd;
mod cli;
mod error;
mod phase_cmd;
mod shared;
mod transitions_cmd;

use alert_cmd::run_alert;
use calendar_cmd::run_calendar;
use cli::{Cli, Commands};
use error::{CliResult, OutputFormat};
use phase_cmd::run_phase;
use transitions_cmd::run_transitions;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Phase(args) => {
            let raw = args.output_format.clone();
            dispatch(&raw, |format| run_phase(args, format))
        }
        Commands::Calendar(args) => {
            let raw = args.output_format.clone();
            dispatch(&raw, |format| run_calendar(args, format))
        }
        Commands::Transitions(args) => {
            let raw = args.output_format.clone();
            dispatch(&raw, |format| run_transitions(args, format))
        }
        Commands::Alert(args) => {
            let raw = args.output_format.clone();
            dispatch(&raw, |format| run_alert(args, format))
        }
    }
}

/// `--verbose` selects debug output; `RUST_LOG` overrides either level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch<F>(output_format: &str, run: F) -> ExitCode
where
    F: FnOnce(OutputFormat) -> CliResult<ExitCode>,
{
    let output_format = match output_format.parse::<OutputFormat>() {
        Ok(format) => format,
        Err(err) => return err.report(OutputFormat::hint(output_format)),
    };

    run(output_format).unwrap_or_else(|err| err.report(output_format))
}
