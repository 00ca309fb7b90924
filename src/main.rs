//! CLI entry point for the Scorecard Rater tool.
//!
//! Provides subcommands for downloading the College Scorecard institution
//! table, deriving the cleaned model inputs, and ranking schools by
//! value-added earnings.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use scorecard_rater::{
    config::PipelineConfig,
    fetch::scorecard::run_fetch,
    fields::FieldKeys,
    prepare::run_prepare,
    ranking::analyzer::run_rank,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "scorecard_rater")]
#[command(about = "Rank colleges by earnings relative to their student body", long_about = None)]
struct Cli {
    /// Directory holding the raw, cleaned and ranked tables
    #[arg(short = 'd', long, global = true, default_value = ".")]
    data_dir: PathBuf,

    /// Optional JSON config file overriding the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct YearArg {
    /// Outcome year (earnings); cohort fields use ten years earlier
    #[arg(short, long)]
    year: Option<i32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the institution table from the College Scorecard API
    Fetch {
        #[command(flatten)]
        year: YearArg,

        /// File holding the api.data.gov key (used when DATA_GOV_API_KEY is unset)
        #[arg(long)]
        api_key_file: Option<PathBuf>,
    },
    /// Derive the cleaned table from the raw table
    Prepare {
        #[command(flatten)]
        year: YearArg,
    },
    /// Fit the earnings model and write rankings and per-rating means
    Rank {
        #[command(flatten)]
        year: YearArg,
    },
    /// Run fetch, prepare and rank in order
    Run {
        #[command(flatten)]
        year: YearArg,

        /// Reuse the existing raw table instead of downloading it
        #[arg(long, default_value_t = false)]
        skip_fetch: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/scorecard_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("scorecard_rater.log"));

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
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let data_dir = cli.data_dir.as_path();

    match cli.command {
        Commands::Fetch { year, api_key_file } => {
            apply_year(&mut config, &year);
            if let Some(file) = api_key_file {
                config.api_key_file = file;
            }
            fetch(data_dir, &config).await?;
        }
        Commands::Prepare { year } => {
            apply_year(&mut config, &year);
            prepare(data_dir, &config)?;
        }
        Commands::Rank { year } => {
            apply_year(&mut config, &year);
            run_rank(data_dir, &config)?;
        }
        Commands::Run { year, skip_fetch } => {
            apply_year(&mut config, &year);
            if skip_fetch {
                info!("Skipping fetch, reusing existing raw table");
            } else {
                fetch(data_dir, &config).await?;
            }
            prepare(data_dir, &config)?;
            let outcome = run_rank(data_dir, &config)?;
            info!(
                ranked = outcome.rankings.len(),
                year = config.year,
                "Pipeline complete"
            );
        }
    }

    Ok(())
}

fn apply_year(config: &mut PipelineConfig, arg: &YearArg) {
    if let Some(year) = arg.year {
        config.year = year;
    }
}

async fn fetch(data_dir: &Path, config: &PipelineConfig) -> Result<()> {
    let api_key = config.api_key()?;
    let keys = FieldKeys::new(config.year);
    run_fetch(config.resolve(data_dir, &config.raw_file), &keys, api_key).await?;
    Ok(())
}

fn prepare(data_dir: &Path, config: &PipelineConfig) -> Result<()> {
    let keys = FieldKeys::new(config.year);
    run_prepare(
        config.resolve(data_dir, &config.raw_file),
        config.resolve(data_dir, &config.cleaned_file),
        &keys,
    )?;
    Ok(())
}
