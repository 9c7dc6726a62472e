use std::io::BufRead;
use std::process::ExitCode;

use mooncal_core::compute_phase_from_string;
use tracing::debug;

use crate::cli::PhaseArgs;
use crate::error::{CliError, CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{build_resolver, load_images, open_input, parse_format, parse_tz_or_input_error};

pub fn run_phase(args: PhaseArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let tz = parse_tz_or_input_error(&args.tz)?;
    let format = parse_format(&args.format)?;
    let resolver = build_resolver(&args.oracle)?;
    let images = load_images(&args.oracle)?;
    let reader = open_input(&args.input, args.stdin)?;

    for line in reader.lines() {
        let line = line.map_err(|e| CliError::runtime(format!("Failed to read line: {}", e)))?;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let report = compute_phase_from_string(&resolver, trimmed, format, tz.name(), &images)
            .map_err(|e| CliError::from(e).context(format!("Error processing '{}'", trimmed)))?;

        match output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string(&report)
                    .map_err(|e| CliError::runtime(format!("Failed to serialize JSON: {}", e)))?;
                println!("{}", json);
            }
            OutputFormat::Text => {
                println!("{} {}", report.input.date, report.phase);
            }
        }
    }

    debug!(months = resolver.cache().len(), "phase run finished");
    Ok(ExitCode::from(EXIT_SUCCESS))
}
