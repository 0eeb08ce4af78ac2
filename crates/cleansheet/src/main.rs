//! CLI entry point for the table cleaning pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use cleansheet::{
    AnalysisReport, CleaningConfig, CleaningOutcome, CleaningPipeline, MissingValueStrategy,
    OutlierStrategy, ReportBuilder, TableLoader, save_csv,
};
use serde_json::json;
use std::path::Path;
use tracing::info;

/// CLI-compatible missing value strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMissingStrategy {
    /// Median for numeric columns, most frequent value otherwise
    Auto,
    /// Drop rows with missing values
    RemoveRow,
    /// Leave missing values in place
    None,
}

impl From<CliMissingStrategy> for MissingValueStrategy {
    fn from(cli: CliMissingStrategy) -> Self {
        match cli {
            CliMissingStrategy::Auto => MissingValueStrategy::Auto,
            CliMissingStrategy::RemoveRow => MissingValueStrategy::RemoveRow,
            CliMissingStrategy::None => MissingValueStrategy::None,
        }
    }
}

/// CLI-compatible outlier strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierStrategy {
    /// Add a boolean `<column>_outlier` column
    Flag,
    /// Cap outliers at IQR bounds
    Cap,
    /// Remove rows containing outliers
    Remove,
    /// Keep outliers as-is
    None,
}

impl From<CliOutlierStrategy> for OutlierStrategy {
    fn from(cli: CliOutlierStrategy) -> Self {
        match cli {
            CliOutlierStrategy::Flag => OutlierStrategy::Flag,
            CliOutlierStrategy::Cap => OutlierStrategy::Cap,
            CliOutlierStrategy::Remove => OutlierStrategy::Remove,
            CliOutlierStrategy::None => OutlierStrategy::None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Automatic cleaning of tabular data",
    long_about = "Cleans a CSV or spreadsheet file and prints a log of every change.\n\n\
                  EXAMPLES:\n  \
                  # Clean and print the log\n  \
                  cleansheet -i data.csv\n\n  \
                  # Write the cleaned table and an analysis report\n  \
                  cleansheet -i data.xlsx -o clean.csv -r report.json\n\n  \
                  # Cap outliers, drop rows with missing values\n  \
                  cleansheet -i data.csv --outlier-strategy cap --missing-strategy remove-row"
)]
struct Args {
    /// Path to the CSV, TSV, TXT or spreadsheet file to clean
    #[arg(short, long)]
    input: String,

    /// Write the cleaned table to this CSV file
    #[arg(short, long)]
    output: Option<String>,

    /// Write a JSON analysis report of the cleaned table to this file
    #[arg(short, long)]
    report: Option<String>,

    /// Strategy for missing values left after cleaning
    #[arg(long, value_enum, default_value = "auto")]
    missing_strategy: CliMissingStrategy,

    /// Missing column threshold (0.0 - 1.0)
    ///
    /// Columns with a missing share strictly above this value are dropped
    #[arg(long, default_value = "0.8")]
    missing_col_threshold: f64,

    /// Strategy for handling outliers
    #[arg(long, value_enum, default_value = "flag")]
    outlier_strategy: CliOutlierStrategy,

    /// IQR multiplier for the outlier fences
    #[arg(long, default_value = "1.5")]
    iqr_multiplier: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors in the tracing output
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the cleaning log and report.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
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

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = CleaningConfig::builder()
        .missing_value_strategy(args.missing_strategy.into())
        .missing_col_threshold(args.missing_col_threshold)
        .outlier_strategy(args.outlier_strategy.into())
        .iqr_multiplier(args.iqr_multiplier)
        .build()?;

    info!("Loading dataset from: {}", args.input);
    let data = TableLoader::load_path(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let mut outcome = CleaningPipeline::new(config).clean(data)?;

    if let Some(ref output) = args.output {
        save_csv(&mut outcome.table, output)?;
    }

    let report = ReportBuilder::build(&outcome.table);
    if let Some(ref path) = args.report {
        ReportBuilder::write_report_to_file(&report, path)?;
    }

    if args.json {
        let payload = json!({ "log": outcome.log, "report": report });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    print_human_readable_summary(&outcome, &report, &args);
    Ok(())
}

/// Print the cleaning log and a short summary.
///
/// Note: This function uses `println!` intentionally for user-facing CLI output.
fn print_human_readable_summary(outcome: &CleaningOutcome, report: &AnalysisReport, args: &Args) {
    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input, outcome.rows_before, outcome.columns_before
    );
    let (rows, columns) = outcome.shape();
    match args.output {
        Some(ref output) => println!("Output: {} ({} rows x {} columns)", output, rows, columns),
        None => println!("Output: not written ({} rows x {} columns)", rows, columns),
    }
    println!();

    println!("Cleaning Log:");
    for entry in &outcome.log {
        println!("  {}", entry);
    }
    println!();

    if report.duplicate_rows > 0 || !report.missing_values.is_empty() {
        println!("Remaining Issues:");
        if report.duplicate_rows > 0 {
            println!("  ! {} duplicate row(s)", report.duplicate_rows);
        }
        for (column, missing) in &report.missing_values {
            println!(
                "  ! '{}': {} missing ({:.1}%)",
                column, missing.count, missing.percentage
            );
        }
        println!();
    }

    let significant: Vec<_> = report
        .significance_tests
        .iter()
        .filter(|t| t.significant)
        .collect();
    if !significant.is_empty() {
        println!("Significant Relationships:");
        for test in significant.iter().take(5) {
            println!(
                "  - {} {} vs {} (p = {:.3})",
                test.test, test.variables.0, test.variables.1, test.p_value
            );
        }
        if significant.len() > 5 {
            println!("  ... and {} more", significant.len() - 5);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --report to save the detailed JSON report");
    println!("{}", "=".repeat(80));
}
