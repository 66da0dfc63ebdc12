//! fxlayer CLI: FX rates pipeline and reports.
//!
//! Commands:
//! - `ingest` / `transform` / `load` / `enrich` / `all`: daily pipeline stages
//! - `backfill`: re-process a date range through raw → silver → gold
//! - `view` / `view-silver` / `compare` / `history`: tables on stdout
//! - `export`: selected rows as CSV
//! - `summary`: the generated daily summary
//! - `status`: available dates per layer

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fxlayer_core::config::{Credentials, PipelineConfig};
use fxlayer_core::data::{ExchangeRateApi, DATE_FORMAT};
use fxlayer_core::textgen::{ChatCompletions, GenerationParams, TextGenerator};
use fxlayer_runner::reporting::{
    compare_rows, currency_history, day_summary, history::DEFAULT_HISTORY_DAYS, render_comparison,
    render_history, render_status, render_summary, render_view, select_rows, store_status,
    write_layer_csv,
};
use fxlayer_runner::{load_layer, Enricher, Layer, Pipeline, StageError, StdoutProgress};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fxlayer", about = "fxlayer: FX rates raw/silver/gold pipeline")]
struct Cli {
    /// TOML config file. Defaults to ./fxlayer.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch today's latest rates into the raw layer.
    Ingest,
    /// Build the silver layer from a raw snapshot.
    Transform {
        /// Date (YYYY-MM-DD). Defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Build the gold layer from a silver file.
    Load {
        /// Date (YYYY-MM-DD). Defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Generate the daily summary for a date or an inclusive range.
    Enrich {
        /// Date (YYYY-MM-DD). Defaults to today.
        #[arg(long, value_parser = parse_date, conflicts_with_all = ["start", "end"])]
        date: Option<NaiveDate>,

        /// Range start (YYYY-MM-DD), used with --end.
        #[arg(long, value_parser = parse_date, requires = "end")]
        start: Option<NaiveDate>,

        /// Range end (YYYY-MM-DD), used with --start.
        #[arg(long, value_parser = parse_date, requires = "start")]
        end: Option<NaiveDate>,
    },
    /// Run ingest, transform, load and enrich for today.
    All,
    /// Fetch historical rates for each day of a range and build all layers.
    Backfill {
        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
    },
    /// Show a gold file (values in the pivot currency).
    View(ViewArgs),
    /// Show a silver file (rates per fetch-base unit).
    ViewSilver(ViewArgs),
    /// Compare two dates of one layer.
    Compare {
        /// Earlier date (YYYY-MM-DD).
        #[arg(value_parser = parse_date)]
        date1: NaiveDate,

        /// Later date (YYYY-MM-DD).
        #[arg(value_parser = parse_date)]
        date2: NaiveDate,

        /// Layer to compare: gold or silver.
        #[arg(long, default_value = "gold")]
        layer: Layer,

        /// Currency codes to include.
        #[arg(long, num_args = 0..)]
        curr: Option<Vec<String>>,

        /// Keep the N largest moves.
        #[arg(long)]
        top: Option<usize>,
    },
    /// One currency's value over the most recent days.
    History {
        /// Currency code.
        #[arg(long)]
        curr: String,

        /// Number of most recent files to read.
        #[arg(long, default_value_t = DEFAULT_HISTORY_DAYS)]
        days: usize,

        /// Layer to read: gold or silver.
        #[arg(long, default_value = "gold")]
        layer: Layer,
    },
    /// Write selected rows of one file as CSV.
    Export {
        /// Date (YYYY-MM-DD). Defaults to the latest file.
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Layer to export: gold or silver.
        #[arg(long, default_value = "gold")]
        layer: Layer,

        /// Currency codes to include. Defaults to all.
        #[arg(long, num_args = 0..)]
        curr: Option<Vec<String>>,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
    /// Show the daily summary (JSON, else Markdown).
    Summary {
        /// Date (YYYY-MM-DD). Defaults to the latest summary.
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// List available dates per layer.
    Status,
}

#[derive(clap::Args)]
struct ViewArgs {
    /// Date (YYYY-MM-DD). Defaults to the latest file.
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Currency codes to show.
    #[arg(long, num_args = 0..)]
    curr: Option<Vec<String>>,

    /// Keep the N highest values.
    #[arg(long)]
    top: Option<usize>,
}

fn main() -> ExitCode {
    // RUST_LOG may come from .env
    let _ = dotenvy::dotenv();
    init_logging(log_filter());
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            if let Some(stage) = e.downcast_ref::<StageError>() {
                if stage.is_missing_artifact() {
                    println!("Nothing to show: {stage}.");
                    return ExitCode::FAILURE;
                }
            }
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG`, else `info`.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_logging(filter: EnvFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = PipelineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Ingest => {
            let provider = build_provider(&config)?;
            Pipeline::new(&config).ingest(&provider, today)?;
        }
        Commands::Transform { date } => {
            let report = Pipeline::new(&config).transform(date.unwrap_or(today))?;
            println!(
                "Silver {}: {} records ({} dropped) -> {}",
                report.date,
                report.kept,
                report.dropped,
                report.path.display()
            );
        }
        Commands::Load { date } => {
            let report = Pipeline::new(&config).load(date.unwrap_or(today))?;
            println!(
                "Gold {}: {} currencies -> {}",
                report.date,
                report.currencies,
                report.path.display()
            );
        }
        Commands::Enrich { date, start, end } => {
            if !run_enrich(&config, date, start.zip(end), today)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::All => {
            let provider = build_provider(&config)?;
            let pipeline = Pipeline::new(&config);
            pipeline.ingest(&provider, today)?;
            pipeline.transform(today)?;
            pipeline.load(today)?;
            if !run_enrich(&config, Some(today), None, today)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Backfill { start, end } => {
            let provider = build_provider(&config)?;
            let summary = Pipeline::new(&config).backfill(&provider, start, end, &StdoutProgress)?;
            if !summary.all_succeeded() {
                for (day, err) in &summary.errors {
                    eprintln!("Error for {day}: {err}");
                }
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::View(args) => run_view(&config, Layer::Gold, args)?,
        Commands::ViewSilver(args) => run_view(&config, Layer::Silver, args)?,
        Commands::Compare {
            date1,
            date2,
            layer,
            curr,
            top,
        } => {
            let store = config.store();
            let first = load_layer(&store, layer, Some(date1))?;
            let second = load_layer(&store, layer, Some(date2))?;
            let top = if curr.is_none() && top.is_none() {
                Some(config.compare_top)
            } else {
                top
            };
            let codes = non_empty(curr);
            let cmp = compare_rows(&first.rows, &second.rows, codes.as_deref(), top);
            print!("{}", render_comparison(&first, &second, &cmp));
        }
        Commands::History { curr, days, layer } => {
            if days == 0 {
                bail!("--days must be at least 1");
            }
            let points = currency_history(&config.store(), layer, &curr, days)?;
            if points.is_empty() {
                println!("Currency {} not found in the last {days} {layer} files.", curr.to_uppercase());
                return Ok(ExitCode::FAILURE);
            }
            print!("{}", render_history(&curr, layer, &points));
        }
        Commands::Export {
            date,
            layer,
            curr,
            out,
        } => {
            let table = load_layer(&config.store(), layer, date)?;
            let codes = non_empty(curr);
            let view = select_rows(&table.rows, codes.as_deref(), None);
            if !view.missing.is_empty() {
                warn!(missing = %view.missing.join(", "), "currencies not found in {}", table.file_name());
            }
            write_layer_csv(&out, &table, &view.rows)?;
            println!("Exported {} rows to {}", view.rows.len(), out.display());
        }
        Commands::Summary { date } => {
            let summary = day_summary(&config.store(), date)?;
            print!("{}", render_summary(&summary));
            if summary.attachment.is_none() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Status => {
            let store = config.store();
            print!("{}", render_status(&store, &store_status(&store)));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_view(config: &PipelineConfig, layer: Layer, args: ViewArgs) -> Result<()> {
    let table = load_layer(&config.store(), layer, args.date)?;
    let codes = if args.curr.is_none() && args.top.is_none() {
        Some(config.view_currencies.clone())
    } else {
        non_empty(args.curr)
    };
    let view = select_rows(&table.rows, codes.as_deref(), args.top);
    print!("{}", render_view(&table, &view));
    Ok(())
}

fn run_enrich(
    config: &PipelineConfig,
    date: Option<NaiveDate>,
    range: Option<(NaiveDate, NaiveDate)>,
    today: NaiveDate,
) -> Result<bool> {
    let generator = match build_generator(config) {
        Ok(g) => Some(g),
        Err(e) => {
            error!("{e:#}");
            None
        }
    };
    let enricher = Enricher::new(
        config,
        generator.as_ref().map(|g| g as &dyn TextGenerator),
    );

    let succeeded = match range {
        Some((start, end)) => enricher.enrich_range(start, end)?,
        None => enricher.enrich_day(date.unwrap_or(today)).is_success(),
    };
    if succeeded {
        info!("enrichment finished");
    } else {
        warn!("no summary was generated");
    }
    Ok(succeeded)
}

fn build_provider(config: &PipelineConfig) -> Result<ExchangeRateApi> {
    let credentials = Credentials::from_env();
    let key = credentials.require_provider_key()?;
    Ok(ExchangeRateApi::new(config.provider_url.as_str(), key)?)
}

fn build_generator(config: &PipelineConfig) -> Result<ChatCompletions> {
    let credentials = Credentials::from_env();
    let key = credentials.require_textgen_key()?;
    Ok(ChatCompletions::new(
        config.textgen_url.as_str(),
        key,
        config.textgen_model.as_str(),
        GenerationParams::default(),
    )?)
}

/// `--curr` given without values means no filter.
fn non_empty(codes: Option<Vec<String>>) -> Option<Vec<String>> {
    codes.filter(|c| !c.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| format!("invalid date '{s}' (expected YYYY-MM-DD): {e}"))
}
