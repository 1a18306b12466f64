use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shipwatch::data::parse_day;
use shipwatch::{
    Dashboard, DashboardState, DateRange, FileSource, HttpSource, Report, Selection, Settings,
    SummarySource,
};

#[derive(Parser, Debug)]
#[command(name = "shipwatch")]
#[command(about = "Aggregate ship sampling data and flag filter samples over MAN limits")]
struct Args {
    /// Ships to include (comma-separated or repeated). Defaults to the
    /// preferred ship, or the first one the service knows.
    #[arg(short, long, value_delimiter = ',')]
    ships: Vec<String>,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    start: Option<NaiveDate>,

    /// Last day of the range (YYYY-MM-DD), defaults to today
    #[arg(long, value_parser = parse_day)]
    end: Option<NaiveDate>,

    /// Range length in days when --start is not given
    #[arg(short, long)]
    days: Option<u32>,

    /// Sampling data service base URL
    #[arg(long, conflicts_with = "file")]
    endpoint: Option<String>,

    /// Read data from a JSON fixture file instead of the service
    #[arg(short, long, conflicts_with = "endpoint")]
    file: Option<PathBuf>,

    /// Settings file (defaults to ./shipwatch.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Also write the JSON report to a file
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// List known ships and exit
    #[arg(long)]
    list_ships: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(endpoint) = &args.endpoint {
        settings.api.endpoint = endpoint.clone();
    }
    debug!(?settings, "Loaded settings");

    let source = build_source(&args, &settings)?;
    info!(source = source.description(), "Using data source");

    let (start, end) = resolve_range(&args, &settings);
    let mut dashboard = Dashboard::new(source, Selection::new(args.ships.clone(), start, end));
    if let Some(ship) = &settings.dashboard.preferred_ship {
        dashboard = dashboard.with_preferred_ship(ship.clone());
    }

    if args.list_ships {
        for ship in dashboard.load_ship_options().await {
            println!("{}", ship);
        }
        print_notice(&dashboard);
        return Ok(());
    }

    if dashboard.selection().ships().is_empty() {
        dashboard.load_ship_options().await;
    }

    dashboard.refresh().await;

    let result = match dashboard.state() {
        DashboardState::Ready(result) => Arc::clone(result),
        DashboardState::AwaitingInput(missing) => {
            print_notice(&dashboard);
            eprintln!("{}", missing);
            return Ok(());
        }
        DashboardState::Loading => return Ok(()),
    };

    let classification = dashboard
        .classify_filter_samples()
        .await
        .unwrap_or_default();
    let report = Report::new(&result, &classification)
        .with_source(dashboard.source_description())
        .with_notice(dashboard.notice());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        print!("{}", report);
    }

    if let Some(path) = &args.export {
        report.export_to_file(path)?;
        eprintln!("Exported report to: {}", path.display());
    }

    Ok(())
}

/// Log to stderr so stdout stays clean for reports.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_source(args: &Args, settings: &Settings) -> Result<Arc<dyn SummarySource>> {
    if let Some(path) = &args.file {
        return Ok(Arc::new(FileSource::new(path)));
    }

    let source = HttpSource::builder()
        .endpoint(settings.api.endpoint.clone())
        .timeout(settings.api.timeout())
        .build()
        .context("Failed to create HTTP client")?;
    Ok(Arc::new(source))
}

/// Explicit dates win. A missing end is today, a missing start is
/// `days` before the end.
fn resolve_range(args: &Args, settings: &Settings) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let end = args.end.unwrap_or_else(|| Utc::now().date_naive());
    let start = args.start.unwrap_or_else(|| {
        let days = args.days.unwrap_or(settings.dashboard.default_days);
        DateRange::ending_at(end, u64::from(days)).start()
    });
    (Some(start), Some(end))
}

fn print_notice(dashboard: &Dashboard) {
    if let Some(notice) = dashboard.notice() {
        eprintln!("{}", notice);
    }
}
