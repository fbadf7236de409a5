//! CLI entry point for the complaint velocity tool.
//!
//! Provides subcommands for annotating a complaints flat file with cohort
//! velocities, ranking model-year cohorts, and summarizing complaints by make.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use complaint_velocity::analyzers::ranking::{complaints_by_make, rank_cohorts};
use complaint_velocity::analyzers::types::RankingReport;
use complaint_velocity::config::PipelineConfig;
use complaint_velocity::{
    fetch::load_source,
    output::{print_json, print_pretty, write_annotated_file, write_json},
    parser::{ComplaintTable, ReaderOptions, decode_source, read_complaints},
    pipeline::Pipeline,
    stats::IngestStats,
};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "complaint_velocity")]
#[command(about = "Complaint velocity per vehicle make/model/year cohort", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate every dated complaint with cumulative cohort counts and rates
    Velocity {
        #[command(flatten)]
        input: InputArgs,

        /// CSV file to write annotated complaints to
        #[arg(short, long, default_value = "velocities.csv")]
        output: String,
    },
    /// Rank make/model/year cohorts by their latest complaint velocity
    Rank {
        #[command(flatten)]
        input: InputArgs,

        /// Number of cohorts to report
        #[arg(short = 'n', long, default_value_t = 20)]
        top: usize,

        /// Only rank cohorts with a complaint in the last N days of data
        #[arg(short, long, value_parser = clap::value_parser!(i64).range(0..))]
        window_days: Option<i64>,

        /// Optional: JSON file to write the ranking to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Count complaints per make after filtering
    Makes {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Path or URL of the complaints flat file (plain or gzip)
    #[arg(value_name = "FILE_OR_URL", env = "COMPLAINTS_URL")]
    source: String,

    /// Optional: JSON file with pipeline defaults
    #[arg(short, long)]
    config: Option<String>,

    /// First row names the columns
    #[arg(long, default_value_t = false)]
    has_headers: bool,

    /// Field delimiter (default: tab)
    #[arg(long)]
    delimiter: Option<char>,

    /// Score make/model cohorts in parallel
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Lowest model year to keep
    #[arg(long)]
    min_year: Option<i32>,

    /// Highest model year to keep
    #[arg(long)]
    max_year: Option<i32>,

    /// Minimum complaints per make/model/year cohort
    #[arg(long)]
    min_complaints: Option<u64>,

    /// Makes to keep (repeatable)
    #[arg(long = "make")]
    makes: Vec<String>,

    /// Models to keep (repeatable)
    #[arg(long = "model")]
    models: Vec<String>,
}

impl InputArgs {
    /// Merges CLI flags over the config file; flags win when given.
    fn resolve(&self) -> Result<(PipelineConfig, ReaderOptions)> {
        let mut config = PipelineConfig::load_or_default(self.config.as_deref())?;

        let filter = &mut config.filter;
        filter.min_model_year = self.min_year.or(filter.min_model_year);
        filter.max_model_year = self.max_year.or(filter.max_model_year);
        filter.min_complaints = self.min_complaints.or(filter.min_complaints);
        if !self.makes.is_empty() {
            filter.makes = Some(self.makes.iter().cloned().collect::<HashSet<_>>());
        }
        if !self.models.is_empty() {
            filter.models = Some(self.models.iter().cloned().collect::<HashSet<_>>());
        }
        config.parallel |= self.parallel;
        config.has_headers |= self.has_headers;

        let delimiter = u8::try_from(self.delimiter.unwrap_or('\t'))
            .map_err(|_| anyhow::anyhow!("Delimiter must be a single-byte character"))?;
        let options = ReaderOptions {
            delimiter,
            has_headers: config.has_headers,
        };
        Ok((config, options))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/complaint_velocity.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("complaint_velocity.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Velocity { input, output } => {
            let (config, options) = input.resolve()?;
            let (table, mut stats) = load_table(&input.source, &options).await?;

            let pipeline = Pipeline::new(config.filter, config.parallel);
            let annotated = pipeline.run(table, &mut stats);

            write_annotated_file(&output, &annotated.schema, &annotated.records)?;
            print_json(&stats)?;
        }
        Commands::Rank {
            input,
            top,
            window_days,
            output,
        } => {
            let (config, options) = input.resolve()?;
            let (table, mut stats) = load_table(&input.source, &options).await?;

            let pipeline = Pipeline::new(config.filter, config.parallel);
            let annotated = pipeline.run(table, &mut stats);

            let window_days = window_days.or(config.window_days);
            let mut cohorts = rank_cohorts(&annotated.records, window_days);
            cohorts.truncate(top);
            info!(cohorts = cohorts.len(), ?window_days, "Cohorts ranked");

            let report = RankingReport {
                schema_version: 1,
                generated_at: Utc::now(),
                window_days,
                cohorts,
            };
            match output {
                Some(path) => write_json(&path, &report)?,
                None => print_json(&report)?,
            }
        }
        Commands::Makes { input } => {
            let (config, options) = input.resolve()?;
            let (table, mut stats) = load_table(&input.source, &options).await?;

            let pipeline = Pipeline::new(config.filter, config.parallel);
            let prepared = pipeline.select(table, &mut stats);

            for share in complaints_by_make(&prepared.records) {
                info!(make = %share.make, complaints = share.complaints, "Make");
            }
            info!(complaints = prepared.records.len(), "Make summary");
            print_pretty(&stats);
        }
    }

    Ok(())
}

/// Loads, decompresses and parses the raw table.
#[tracing::instrument(skip_all, fields(source = %source))]
async fn load_table(
    source: &str,
    options: &ReaderOptions,
) -> Result<(ComplaintTable, IngestStats)> {
    let bytes = decode_source(load_source(source).await?)?;
    let table = read_complaints(bytes.as_slice(), options)?;
    let stats = IngestStats::new().with_source(source);
    Ok((table, stats))
}
