use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Weekday};
use clap::{Args, Parser, Subcommand, ValueEnum};
use daterange::config::{CalendarConfig, CalendarOptions};
use daterange::core::{CalendarDate, Clock, FixedClock, RangeState, SystemClock};
use daterange::grid::{self, MonthGrid, Selection};
use daterange::parser::{self, ParseContext, RawInput};
use daterange::presets;
use daterange::validate;
use daterange::{Intent, RangeController};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "daterange",
    about = "Date and date-range selection built on the daterange crate",
    version
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(long, global = true)]
    verbose: bool,
    /// Calendar options as JSON. Defaults to a range calendar with stock bounds.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Pretend today is this date (YYYY-MM-DD).
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve typed date input the way the text fields do.
    Parse(ParseArgs),

    /// Print the six-week grid for a month.
    Grid(GridArgs),

    /// List the presets offered for a reference date.
    Presets(PresetsArgs),

    /// Feed a JSON list of intents through a controller and print each view.
    Replay(ReplayArgs),
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Inputs such as "today", "3 weeks ago", "April 5th, 2024".
    #[arg(required = true)]
    inputs: Vec<String>,
    /// Emit JSON instead of one line per input.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct GridArgs {
    /// Any day of the month to show. Defaults to the initial selection's month.
    #[arg(long)]
    month: Option<NaiveDate>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct PresetsArgs {
    /// Reference date; defaults to the configured end date, then today.
    #[arg(long)]
    reference: Option<NaiveDate>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ReplayArgs {
    /// JSON file holding an array of intents.
    script: PathBuf,
    /// Output format for each view.
    #[arg(long, value_enum, default_value_t = ViewFormat::Pretty)]
    emit: ViewFormat,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ViewFormat {
    Pretty,
    Compact,
    Text,
}

#[derive(Debug, Serialize)]
struct ParsedInput {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<CalendarDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<(CalendarDate, CalendarDate)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let clock: Box<dyn Clock> = match cli.today {
        Some(date) => Box::new(FixedClock(CalendarDate(date))),
        None => Box::new(SystemClock),
    };
    let today = clock.today();
    let options = load_options(cli.config.as_deref())?;
    match cli.command {
        Commands::Parse(args) => handle_parse(args, &options, today),
        Commands::Grid(args) => handle_grid(args, &options, today),
        Commands::Presets(args) => handle_presets(args, &options, today),
        Commands::Replay(args) => handle_replay(args, &options, today),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(path: Option<&Path>) -> Result<CalendarOptions> {
    match path {
        Some(path) => {
            debug!(?path, "loading calendar options");
            CalendarOptions::load(path)
        }
        None => Ok(CalendarOptions::default()),
    }
}

fn resolve_config(options: &CalendarOptions, today: CalendarDate) -> Result<CalendarConfig> {
    options
        .resolve(today)
        .context("invalid calendar options")
}

fn handle_parse(args: ParseArgs, options: &CalendarOptions, today: CalendarDate) -> Result<()> {
    let ParseArgs { inputs, json } = args;
    let config = resolve_config(options, today)?;
    let ctx = ParseContext {
        today,
        bounds: config.bounds,
        current_anchor: config.initial.anchor(&config.bounds, today),
        formats: &config.formats,
    };

    let results: Vec<ParsedInput> = inputs
        .into_iter()
        .map(|input| {
            let raw = RawInput::classify(&input);
            if raw.is_ytd() {
                let (start, end) = validate::expand_ytd(today, &config.bounds);
                return ParsedInput {
                    input,
                    date: None,
                    range: Some((start, end)),
                    error: None,
                };
            }
            match parser::resolve(&raw, &ctx) {
                Ok(date) => ParsedInput {
                    input,
                    date: Some(date),
                    range: None,
                    error: None,
                },
                Err(err) => ParsedInput {
                    input,
                    date: None,
                    range: None,
                    error: Some(err.to_string()),
                },
            }
        })
        .collect();

    if json {
        let json = serde_json::to_string_pretty(&results)?;
        println!("{json}");
        return Ok(());
    }
    for parsed in results {
        match (parsed.date, parsed.range, parsed.error) {
            (Some(date), _, _) => println!(
                "{:<24} {}  ({})",
                parsed.input,
                date,
                config.formats.format_date(date)
            ),
            (_, Some((start, end)), _) => println!("{:<24} {} .. {}", parsed.input, start, end),
            (_, _, Some(error)) => println!("{:<24} error: {}", parsed.input, error),
            _ => {}
        }
    }
    Ok(())
}

fn handle_grid(args: GridArgs, options: &CalendarOptions, today: CalendarDate) -> Result<()> {
    let GridArgs { month, json } = args;
    let config = resolve_config(options, today)?;
    let anchor = month
        .map(CalendarDate)
        .unwrap_or_else(|| config.initial.anchor(&config.bounds, today));
    let grid = grid::build(
        &Selection::from(&config.initial),
        anchor,
        &config.bounds,
        config.week_start,
    );

    if json {
        let json = serde_json::to_string_pretty(&grid)?;
        println!("{json}");
    } else {
        println!(
            "{} {}",
            config.formats.format_month(grid.month),
            config.formats.format_year(grid.month)
        );
        print!("{}", render_grid(&grid, config.week_start));
    }
    Ok(())
}

fn handle_presets(args: PresetsArgs, options: &CalendarOptions, today: CalendarDate) -> Result<()> {
    let PresetsArgs { reference, json } = args;
    let config = resolve_config(options, today)?;
    let reference = config.bounds.clamp(
        reference
            .map(CalendarDate)
            .or(config.initial.end)
            .unwrap_or(today),
    );
    let offered = presets::resolve_all(
        &presets::default_catalogue(),
        reference,
        config.bounds.earliest,
    );

    if offered.is_empty() {
        eprintln!("No presets fit between {} and {}.", config.bounds.earliest, reference);
        return Ok(());
    }

    if json {
        let list: Vec<_> = offered.values().collect();
        let json = serde_json::to_string_pretty(&list)?;
        println!("{json}");
    } else {
        for preset in offered.values() {
            println!(
                "{:<14} {:<14} {} .. {}",
                preset.id, preset.label, preset.range.first_day, preset.range.last_day
            );
        }
    }
    Ok(())
}

fn handle_replay(args: ReplayArgs, options: &CalendarOptions, today: CalendarDate) -> Result<()> {
    let ReplayArgs { script, emit } = args;
    let intents = load_script(&script)?;
    let commits = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&commits);
    let mut controller = RangeController::new(options, FixedClock(today))
        .context("invalid calendar options")?
        .on_commit(move |state: &RangeState| sink.borrow_mut().push(state.clone()));

    for (index, intent) in intents.into_iter().enumerate() {
        debug!(index, ?intent, "applying intent");
        let view = controller.apply(intent);
        match emit {
            ViewFormat::Pretty => println!("{}", serde_json::to_string_pretty(&view)?),
            ViewFormat::Compact => println!("{}", serde_json::to_string(&view)?),
            ViewFormat::Text => {
                println!(
                    "#{index} {:?} {} {}",
                    view.phase, view.month_label, view.year_label
                );
                print!("{}", render_grid(&view.grid, controller.config().week_start));
            }
        }
        for state in commits.borrow_mut().drain(..) {
            eprintln!(
                "commit: start={} end={} current={}",
                show(state.start),
                show(state.end),
                show(state.current)
            );
        }
    }
    Ok(())
}

fn load_script(path: &Path) -> Result<Vec<Intent>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("parsing intents in {:?}", path))
}

fn show(date: Option<CalendarDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Plain-text month: `[d]` start/end, `*d` inside the selection, `(d)` other month,
/// `d!` outside the allowed window.
fn render_grid(grid: &MonthGrid, week_start: Weekday) -> String {
    let mut out = String::new();
    let mut day = week_start;
    for _ in 0..grid::DAYS_PER_WEEK {
        out.push_str(&format!("{:>6}", &day.to_string()[..2]));
        day = day.succ();
    }
    out.push('\n');
    for week in grid.weeks() {
        for cell in week {
            let day = cell.day_of_month;
            let text = if cell.is_start || cell.is_end {
                format!("[{day}]")
            } else if cell.is_selected {
                format!("*{day}")
            } else if cell.is_outside_month {
                format!("({day})")
            } else {
                day.to_string()
            };
            let text = if cell.is_outside_bounds {
                format!("{text}!")
            } else {
                text
            };
            out.push_str(&format!("{text:>6}"));
        }
        out.push('\n');
    }
    out
}
