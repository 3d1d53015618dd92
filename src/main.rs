//! # review-aggregator CLI
//!
//! Command-line front end for the review pipeline.
//!
//! - `reviews`: Search, scrape every product found and aggregate the reviews
//! - `extract`: Scrape a single product page into intermediate storage
//! - `aggregate`: Merge whatever batches intermediate storage currently holds

mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use review_aggregator::request::ReviewRequest;
use review_aggregator::reviews::{
    Aggregator, FsStore, JobOutcome, JobReport, Orchestrator, ReviewRecord, ScraperConfig,
    StorageConfig,
};
use telemetry::TelemetryOptions;
use tokio::sync::mpsc;
use tracing::instrument;

#[derive(Parser)]
#[command(author, version, about = "Scrape and aggregate product reviews for a search query", long_about = None)]
struct Cli {
    /// Export traces and metrics over OTLP
    #[arg(long, global = true)]
    otlp: bool,

    /// Directory for a log file next to stderr output
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect reviews for every product matching a search query
    Reviews(ReviewsArgs),

    /// Scrape one product page into intermediate storage
    Extract(ExtractArgs),

    /// Aggregate the batches currently in intermediate storage
    Aggregate(AggregateArgs),
}

#[derive(Args, Debug)]
struct SiteArgs {
    /// Base URL product links are resolved against
    #[arg(long, default_value = review_aggregator::reviews::FLIPKART_BASE_URL)]
    site_base: String,

    /// URL the search query is appended to
    #[arg(long, default_value = review_aggregator::reviews::FLIPKART_SEARCH_URL)]
    search_base: String,

    /// Timeout for a single page fetch in seconds
    #[arg(short, long, default_value = "30")]
    timeout_secs: u64,
}

#[derive(Args, Debug)]
struct StorageArgs {
    /// Directory for intermediate review batches
    #[arg(long, default_value = ".reviews/tmp")]
    temp_dir: PathBuf,

    /// Directory for aggregated results
    #[arg(long, default_value = ".reviews/results")]
    results_dir: PathBuf,
}

#[derive(Args, Debug)]
struct ReviewsArgs {
    /// Product search query
    #[arg(required = true)]
    query: String,

    /// Number of product pages scraped at once (defaults to available parallelism)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Keep intermediate batches after aggregation
    #[arg(short, long)]
    retain: bool,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(flatten)]
    site: SiteArgs,

    #[command(flatten)]
    storage: StorageArgs,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Product page URL
    #[arg(required = true)]
    url: String,

    #[command(flatten)]
    site: SiteArgs,

    #[command(flatten)]
    storage: StorageArgs,
}

#[derive(Args, Debug)]
struct AggregateArgs {
    /// Name the result artifact starts with
    #[arg(required = true)]
    name: String,

    /// Keep intermediate batches after aggregation
    #[arg(short, long)]
    retain: bool,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(flatten)]
    storage: StorageArgs,
}

impl SiteArgs {
    fn config(&self) -> ScraperConfig {
        let fetch_timeout = Duration::from_secs(self.timeout_secs);
        ScraperConfig::builder()
            .site_base(self.site_base.as_str())
            .search_base(self.search_base.as_str())
            .fetch_timeout(fetch_timeout)
            .job_timeout(fetch_timeout * 2)
            .build()
    }
}

impl StorageArgs {
    fn config(&self) -> anyhow::Result<StorageConfig> {
        let config = StorageConfig {
            temp_dir: self.temp_dir.clone(),
            results_dir: self.results_dir.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let _telemetry = telemetry::init_tracing_subscriber(TelemetryOptions {
        otlp: cli.otlp,
        log_dir: cli.log_dir.clone(),
    })?;

    match cli.command {
        Some(Commands::Reviews(args)) => reviews_command(args).await?,
        Some(Commands::Extract(args)) => extract_command(args).await?,
        Some(Commands::Aggregate(args)) => aggregate_command(args).await?,
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["review-aggregator", "--help"]);
        }
    }

    Ok(())
}

#[instrument]
async fn reviews_command(args: ReviewsArgs) -> anyhow::Result<()> {
    let query = ReviewRequest::new(args.query.clone()).into_query()?;

    let mut config = args.site.config();
    config.retain_batches = args.retain;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency.max(1);
    }

    let orchestrator = Orchestrator::from_config(config, args.storage.config()?)?;

    eprintln!("Searching for: {}", query);
    let (links, search) = orchestrator.resolve_product_links(&query).await;
    eprintln!("Found {} product pages", links.len());

    let progress_bar = ProgressBar::new(links.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let (progress_sender, mut progress_receiver) = mpsc::channel::<JobReport>(100);
    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            while let Some(report) = progress_receiver.recv().await {
                progress_bar.inc(1);
                progress_bar.set_message(report.url);
            }
            progress_bar.finish_with_message("Scraping completed");
        }
    });

    let run = orchestrator
        .dispatch(&query, links, search, Some(progress_sender))
        .await?;
    let _ = progress_handle.await;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&run)?),
        _ => {
            let failed: Vec<_> = run
                .jobs
                .iter()
                .filter(|job| {
                    !matches!(
                        job.outcome,
                        JobOutcome::Extracted(_) | JobOutcome::NoReviews
                    )
                })
                .collect();
            print_records(&run.result.records);
            if !failed.is_empty() {
                println!("{} product pages could not be scraped:", failed.len());
                for job in failed {
                    println!("   {} ({:?})", job.url, job.outcome);
                }
            }
            println!("Saved result to {}", run.result.artifact);
        }
    }

    Ok(())
}

#[instrument]
async fn extract_command(args: ExtractArgs) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::from_config(args.site.config(), args.storage.config()?)?;

    let report = orchestrator.extractor().extract(&args.url).await;
    match (&report.key, &report.outcome) {
        (Some(key), outcome) => println!("Stored batch {} ({:?})", key, outcome),
        (None, outcome) => println!("No batch stored ({:?})", outcome),
    }

    Ok(())
}

#[instrument]
async fn aggregate_command(args: AggregateArgs) -> anyhow::Result<()> {
    let store = Arc::new(FsStore::with_config(args.storage.config()?));
    let aggregator = Aggregator::new(store);

    let result = aggregator.aggregate(&args.name, !args.retain).await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            print_records(&result.records);
            println!("Saved result to {}", result.artifact);
        }
    }

    Ok(())
}

fn print_records(records: &[ReviewRecord]) {
    println!("Found {} reviews", records.len());
    for (i, record) in records.iter().enumerate() {
        println!("{}. [{}] {} - {}", i + 1, record.rating, record.heading, record.product);
        println!("   {}", record.comment);
        println!("   by {}", record.name);
        println!();
    }
}
