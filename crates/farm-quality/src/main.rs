//! CLI entry point for the smart farming sensor data quality pipeline.

use anyhow::{Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use dotenv::dotenv;
use farm_quality::dashboard::{ALL, Dashboard, DashboardConfig, DashboardFilters, DashboardView};
use farm_quality::{
    DATASET_PATH_ENV, Pipeline, PipelineConfig, PipelineConfigBuilder, PipelineError,
    PipelineRun, ReportArtifacts, ReportGenerator,
};
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Smart farming sensor data cleaning and quality scoring",
    long_about = "Cleans a raw smart farming sensor table, scores its quality and \
                  writes a report, or renders a filtered dashboard view.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  FARM_DATA_PATH    Dataset location tried before the defaults\n  \
                  RUST_LOG          Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Batch report into ./outputs\n  \
                  farm-quality report\n\n  \
                  # Explicit input and output\n  \
                  farm-quality report -i readings.csv -o results/\n\n  \
                  # Dashboard view for one crop\n  \
                  farm-quality dashboard --crop Wheat --points 1000"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all progress logs; only the final JSON is written.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean the dataset, score it and write the batch report
    Report(ReportArgs),
    /// Render one dashboard view for the given filters
    Dashboard(DashboardArgs),
}

#[derive(ClapArgs, Debug)]
struct ReportArgs {
    /// Path to the raw sensor CSV
    ///
    /// Tried before FARM_DATA_PATH and the default locations
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory for the cleaned export, report and charts
    #[arg(short, long, default_value = "outputs")]
    output: PathBuf,

    /// Skip writing cleaned_data.csv
    #[arg(long)]
    no_export: bool,

    /// Skip writing charts.json
    #[arg(long)]
    no_charts: bool,
}

#[derive(ClapArgs, Debug)]
struct DashboardArgs {
    /// Path to the raw sensor CSV
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Crop filter
    #[arg(long, default_value = ALL)]
    crop: String,

    /// Soil type filter
    #[arg(long, default_value = ALL)]
    soil: String,

    /// Seedling stage filter
    #[arg(long, default_value = ALL)]
    stage: String,

    /// Rows shown in the trend chart (100 - 5000)
    #[arg(long)]
    points: Option<usize>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled so stdout
/// only carries JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    let outcome = match &args.command {
        Command::Report(report_args) => run_report(report_args, &args),
        Command::Dashboard(dashboard_args) => run_dashboard(dashboard_args, &args),
    };

    outcome.map_err(|e| {
        error!("[{}] {}", e.error_code(), e);
        if args.json {
            // Presenters show the error as a blocking message
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                println!("{}", json);
            }
        }
        anyhow!(e)
    })
}

/// Build a configuration whose candidate paths are, in order: the explicit
/// `--input`, `FARM_DATA_PATH`, then the default locations.
fn build_config(input: Option<&PathBuf>) -> PipelineConfigBuilder {
    let mut candidates = farm_quality::config::default_candidate_paths();
    if let Ok(env_path) = std::env::var(DATASET_PATH_ENV) {
        debug!("{} set to {}", DATASET_PATH_ENV, env_path);
        candidates.insert(0, PathBuf::from(env_path));
    }

    let mut builder = PipelineConfig::builder().candidate_paths(candidates);
    if let Some(path) = input {
        builder = builder.input_path(path);
    }
    builder
}

fn run_report(report_args: &ReportArgs, args: &Args) -> Result<(), PipelineError> {
    let config = build_config(report_args.input.as_ref())
        .output_dir(&report_args.output)
        .export_cleaned(!report_args.no_export)
        .write_charts(!report_args.no_charts)
        .build()?;

    let pipeline = Pipeline::builder()
        .config(config.clone())
        .on_progress(|update| {
            debug!("[{:.0}%] {}", update.progress * 100.0, update.message);
        })
        .build()?;

    let run = pipeline.run()?;
    let artifacts = ReportGenerator::from_config(&config).generate(&run)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&artifacts.report)?);
    } else if !args.quiet {
        print_report_summary(&run, &artifacts);
    } else {
        println!("Overall quality: {:.3}", run.score.overall);
    }

    Ok(())
}

fn run_dashboard(dashboard_args: &DashboardArgs, args: &Args) -> Result<(), PipelineError> {
    let config = build_config(dashboard_args.input.as_ref()).build()?;
    let pipeline = Pipeline::builder().config(config).build()?;
    let dashboard = Dashboard::open(DashboardConfig::default(), &pipeline)?;

    let filters = DashboardFilters {
        crop: dashboard_args.crop.clone(),
        soil: dashboard_args.soil.clone(),
        stage: dashboard_args.stage.clone(),
    };
    info!(
        "Rendering dashboard for crop={}, soil={}, stage={}",
        filters.crop, filters.soil, filters.stage
    );
    let view = dashboard.render(&filters, dashboard_args.points)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_dashboard(&view);
    }

    Ok(())
}

fn format_option(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

/// Print a human-readable summary of the batch run.
///
/// This is the default output when neither `--json` nor `--quiet` are specified.
fn print_report_summary(run: &PipelineRun, artifacts: &ReportArtifacts) {
    let report = &artifacts.report;
    let cleaning = &report.cleaning;

    println!();
    println!("{}", "=".repeat(80));
    println!("DATA QUALITY REPORT");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.input_file.as_deref().unwrap_or("<in memory>"),
        report.rows,
        report.columns
    );
    println!(
        "Cleaned: {} rows x {} columns",
        run.cleaned.height(),
        run.cleaned.data().width()
    );
    println!();

    println!("Cleaning Summary:");
    println!(
        "  Missing cells: {} -> {}",
        cleaning.missing_before, cleaning.missing_after
    );
    for record in &cleaning.imputations {
        println!(
            "  - {} filled {} cells with {:?} {}",
            record.column, record.cells_filled, record.strategy, record.fill_value
        );
    }
    for record in &cleaning.outliers {
        println!(
            "  - {} clamped to [{:.2}, {:.2}] ({} outliers)",
            record.column, record.lower, record.upper, record.outliers_capped
        );
    }
    if let Some(ref range) = cleaning.timestamps {
        println!(
            "  - timestamps {} .. {} every {} minutes",
            range.start, range.end, range.interval_minutes
        );
    }
    println!();

    println!("Quality Scores:");
    for (metric, value) in run.score.metrics() {
        println!("  {:<14} {:.3}", metric, value);
    }
    println!(
        "  Target {:.2}: {}",
        report.quality_target,
        if report.quality_target_met { "met" } else { "not met" }
    );
    println!();

    let files = &artifacts.files;
    let written: Vec<_> = [&files.cleaned_csv, &files.report_json, &files.charts_json]
        .into_iter()
        .flatten()
        .collect();
    if !written.is_empty() {
        println!("Files Written:");
        for path in written {
            println!("  {}", path.display());
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}

fn print_dashboard(view: &DashboardView) {
    println!();
    println!("{}", "=".repeat(80));
    println!("{}", view.title.to_uppercase());
    println!("{}", "=".repeat(80));
    println!(
        "Filters: crop={} soil={} stage={}",
        view.filters.crop, view.filters.soil, view.filters.stage
    );
    println!();

    let overview = &view.overview;
    println!("Overview ({} rows):", overview.rows);
    println!("  Avg Temperature: {}", format_option(overview.avg_temp));
    println!("  Avg Humidity:    {}", format_option(overview.avg_humidity));
    println!("  Avg Moisture:    {}", format_option(overview.avg_moi));
    println!("  Crops:           {}", overview.distinct_crops);
    println!();

    if !view.crop_stats.is_empty() {
        println!(
            "{:<16} {:>10} {:>10} {:>10}",
            "Crop", "temp", "humidity", "MOI"
        );
        println!("{}", "-".repeat(50));
        for stats in &view.crop_stats {
            println!(
                "{:<16} {:>10.2} {:>10.2} {:>10.2}",
                stats.crop, stats.temp.mean, stats.humidity.mean, stats.moi.mean
            );
        }
        println!();
    }

    println!(
        "Trend: {} points, rolling window {}",
        view.trend.points, view.trend.window
    );
    println!();

    println!("Quality Scores:");
    for (metric, value) in view.quality.score.metrics() {
        println!("  {:<14} {:.3}", metric, value);
    }
    println!(
        "  Target met: {}",
        if view.quality.target_met { "yes" } else { "no" }
    );
    println!("{}", "=".repeat(80));
}
