use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lagoon::cache::Cache;
use lagoon::config::Config;
use lagoon::crawler::{DelayedFetcher, IngestionPipeline, SourceScraper, StepOutcome};
use lagoon::feeds::LiveFeeds;
use lagoon::models::TrainDirection;
use lagoon::storage::{MemorySink, RecordSink, RestTreeSink};
use lagoon::time::TimeService;

#[derive(Parser)]
#[command(
    name = "lagoon",
    version,
    about = "Scrape-and-cache pipeline for Venice public information dashboards",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML config file; environment variables are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one ingestion cycle into the record store
    Ingest,

    /// Print the cached flight boards
    Airplanes,

    /// Print the cached train board
    Trains {
        /// Departures instead of arrivals
        #[arg(long, default_value = "false")]
        departures: bool,
    },

    /// Seconds until the next occurrence of a civil time of day
    Ttl {
        /// Hour (0-24)
        #[arg(long)]
        hour: u32,

        /// Minute
        #[arg(long, default_value = "0")]
        minute: u32,

        /// Second
        #[arg(long, default_value = "0")]
        second: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate().context("Invalid configuration")?;

    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    tracing::info!(timezone = %config.time.timezone, "lagoon starting");

    let time = Arc::new(TimeService::new(&config.time.timezone)?);

    match cli.command {
        Commands::Ingest => {
            tracing::info!(sink = ?config.sink.url, "Starting ingest command");
            ingest(&config, time).await?;
        }

        Commands::Airplanes => {
            tracing::info!("Starting airplanes command");
            let feeds = live_feeds(&config, time).await?;
            let boards = feeds.airplanes().await?;
            println!("{}", serde_json::to_string_pretty(&boards)?);
        }

        Commands::Trains { departures } => {
            let direction = if departures {
                TrainDirection::Departures
            } else {
                TrainDirection::Arrivals
            };
            tracing::info!(direction = %direction, "Starting trains command");
            let feeds = live_feeds(&config, time).await?;
            let board = feeds.trains(direction).await?;
            println!("{}", serde_json::to_string_pretty(&board)?);
        }

        Commands::Ttl {
            hour,
            minute,
            second,
        } => {
            let now = time.now();
            tracing::debug!(
                date = %now.iso_date(),
                seconds_since_midnight = now.seconds_since_midnight(),
                "Computing TTL from local time"
            );
            let ttl = time.dynamic_ttl(hour, minute, second)?;
            println!("{ttl}");
        }
    }

    tracing::info!("lagoon completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("lagoon=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("lagoon={level},warn"))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lagoon=info,warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn scraper(config: &Config, time: Arc<TimeService>) -> Result<SourceScraper> {
    let fetcher = Arc::new(DelayedFetcher::new(&config.fetch)?);
    Ok(SourceScraper::new(fetcher, time, &config.sources, &config.batch)?)
}

async fn live_feeds(config: &Config, time: Arc<TimeService>) -> Result<LiveFeeds> {
    let scraper = scraper(config, Arc::clone(&time))?;
    let cache = Cache::from_config(&config.cache, time).await?;
    Ok(LiveFeeds::new(Arc::new(cache), Arc::new(scraper)))
}

async fn ingest(config: &Config, time: Arc<TimeService>) -> Result<()> {
    let scraper = Arc::new(scraper(config, Arc::clone(&time))?);

    let memory = if config.sink.url.is_none() {
        tracing::warn!("DATABASE_URL not set, writing to an in-memory sink");
        Some(Arc::new(MemorySink::new()))
    } else {
        None
    };

    let sink: Arc<dyn RecordSink> = match &memory {
        Some(sink) => Arc::clone(sink) as Arc<dyn RecordSink>,
        None => Arc::new(RestTreeSink::new(&config.sink)?),
    };

    let pipeline = IngestionPipeline::new(scraper, sink, time);
    let report = pipeline.run_cycle().await;

    println!("Ingestion cycle finished");
    for (step, outcome) in &report.steps {
        match outcome {
            StepOutcome::Persisted { writes } => println!("  {step:<12} persisted ({writes} writes)"),
            StepOutcome::Skipped => println!("  {step:<12} skipped"),
            StepOutcome::Failed(reason) => println!("  {step:<12} failed: {reason}"),
        }
    }

    if let Some(sink) = memory {
        println!(
            "  in-memory records: {} bus, {} boat",
            sink.child_count("busData"),
            sink.child_count("boatData")
        );
    }

    Ok(())
}
