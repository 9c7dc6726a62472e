use std::process::ExitCode;

use mooncal_core::time::{format_rfc3339, format_rfc3339_utc};
use mooncal_core::{CardinalPhase, YearMonth};
use serde::Serialize;

use crate::cli::TransitionsArgs;
use crate::error::{CliError, CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{build_resolver, parse_month, parse_tz_or_input_error};

pub fn run_transitions(args: TransitionsArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let tz = parse_tz_or_input_error(&args.tz)?;
    let month = parse_month(&args.month)?;
    let resolver = build_resolver(&args.oracle)?;

    let cached = resolver.month(month)?;
    let transitions: Vec<TransitionRow> = cached
        .transitions()
        .iter()
        .map(|t| TransitionRow {
            phase: t.phase,
            utc: format_rfc3339_utc(&t.instant),
            local: format_rfc3339(&t.instant.with_timezone(&tz)),
        })
        .collect();

    match output_format {
        OutputFormat::Json => {
            let output = TransitionsOutput {
                month,
                tz: tz.name().to_string(),
                transitions,
            };
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| CliError::runtime(format!("Failed to serialize JSON: {}", e)))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for row in transitions {
                println!("{:<13} {} {}", row.phase, row.utc, row.local);
            }
        }
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}

#[derive(Debug, Serialize)]
struct TransitionsOutput {
    month: YearMonth,
    tz: String,
    transitions: Vec<TransitionRow>,
}

#[derive(Debug, Serialize)]
struct TransitionRow {
    phase: CardinalPhase,
    utc: String,
    local: String,
}
