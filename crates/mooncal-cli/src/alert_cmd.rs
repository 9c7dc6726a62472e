use std::process::ExitCode;
use std::sync::Arc;

use mooncal_core::alert::{CollectingSink, PhaseAlert};
use mooncal_core::notifier::{Clock, DateSource, StateNotifier, SystemClock};
use tracing::debug;

use crate::cli::AlertArgs;
use crate::error::{CliError, CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{
    build_resolver, load_images, parse_civil_date, parse_target, parse_tz_or_input_error,
};

pub fn run_alert(args: AlertArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let tz = parse_tz_or_input_error(&args.tz)?;
    let target = parse_target(&args.target)?;
    let resolver = Arc::new(build_resolver(&args.oracle)?);
    let images = load_images(&args.oracle)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::in_zone(tz));
    let sink = Arc::new(CollectingSink::new());
    let alert = Arc::new(
        PhaseAlert::new(resolver, Arc::clone(&clock), sink.clone())
            .with_images(images)
            .with_target(target),
    );

    match &args.date {
        Some(s) => {
            let date = parse_civil_date(s)?;
            alert.check(date)?;
        }
        None => {
            // Subscribing checks today right away.
            let dates = StateNotifier::new(DateSource::new(clock));
            debug!(today = %dates.current(), "checking today");
            alert.attach(&dates);
        }
    }

    for notification in sink.received() {
        match output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string(&notification)
                    .map_err(|e| CliError::runtime(format!("Failed to serialize JSON: {}", e)))?;
                println!("{}", json);
            }
            OutputFormat::Text => {
                println!("{}", notification.title);
            }
        }
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}
