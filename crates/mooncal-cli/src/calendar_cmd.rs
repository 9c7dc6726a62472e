use std::process::ExitCode;

use chrono::Datelike;
use mooncal_core::YearMonth;
use mooncal_core::calendar::{CALENDAR_RANGE_YEARS, CalendarRange, DayCell, DayOwner, MonthView};
use mooncal_core::notifier::{DateSource, StateSource, SystemClock};

use crate::cli::CalendarArgs;
use crate::error::{CliError, CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{
    build_resolver, load_images, parse_civil_date, parse_month, parse_tz_or_input_error,
    parse_week_start, phase_abbreviation,
};

pub fn run_calendar(args: CalendarArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let tz = parse_tz_or_input_error(&args.tz)?;
    let first = parse_week_start(&args.week_start)?;
    let resolver = build_resolver(&args.oracle)?;
    let images = load_images(&args.oracle)?;

    let today = match &args.today {
        Some(s) => parse_civil_date(s)?,
        None => DateSource::new(SystemClock::in_zone(tz)).read(),
    };
    let month = match &args.month {
        Some(s) => parse_month(s)?,
        None => YearMonth::from_date(today),
    };

    let range = CalendarRange::around(YearMonth::from_date(today), CALENDAR_RANGE_YEARS)?;
    if !range.contains(month) {
        return Err(CliError::input(format!(
            "Month {} is outside the calendar range {} to {}",
            month, range.first, range.last
        )));
    }

    let view = MonthView::build(&resolver, month, first, tz, today, &images)?;

    match output_format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&view)
                .map_err(|e| CliError::runtime(format!("Failed to serialize JSON: {}", e)))?;
            println!("{}", json);
        }
        OutputFormat::Text => print_grid(&view),
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}

fn print_grid(view: &MonthView) {
    let title = view.month.first_day().format("%B %Y").to_string();
    println!("{} ({})", title.to_uppercase(), view.tz);

    let legend: Vec<String> = view
        .legend
        .iter()
        .map(|day| format!("{:<7}", day.to_string().to_uppercase()))
        .collect();
    println!("{}", legend.join(" ").trim_end());

    for week in view.weeks() {
        let cells: Vec<String> = week.iter().map(render_cell).collect();
        println!("{}", cells.join(" ").trim_end());
    }
}

/// `*` marks today, `.` a day of a neighbouring month.
fn render_cell(cell: &DayCell) -> String {
    let marker = if cell.today {
        '*'
    } else if cell.owner != DayOwner::ThisMonth {
        '.'
    } else {
        ' '
    };
    format!(
        "{}{:>2} {:<3}",
        marker,
        cell.date.day(),
        phase_abbreviation(cell.phase)
    )
}
