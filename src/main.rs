//! Placecrawl main entry point
//!
//! This is the command-line interface for the placecrawl business listing crawler.

use anyhow::{bail, Context};
use clap::Parser;
use placecrawl::config::{load_config_with_hash, validate, Config, Credentials};
use placecrawl::crawler::CityCollector;
use placecrawl::output::{load_master_statistics, print_master_statistics, print_summary};
use placecrawl::storage::{merge_region_files, JsonResultStore};
use placecrawl::{DiscoveryCrawler, ResultStore};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Placecrawl: a geo-partitioned business listing crawler
///
/// Placecrawl resolves district or city names to search regions, pages through
/// nearby-search results for a business category, looks up contact details for
/// every hit, and keeps one JSON file per region plus a deduplicated master set.
#[derive(Parser, Debug)]
#[command(name = "placecrawl")]
#[command(version)]
#[command(about = "A geo-partitioned business listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Region to crawl; repeat for several (overrides the configured list)
    #[arg(short, long = "region", value_name = "NAME")]
    regions: Vec<String>,

    /// Business category (overrides the configured one)
    #[arg(long)]
    category: Option<String>,

    /// Country appended to every geocoding query (overrides the configured one)
    #[arg(long)]
    country: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Re-crawl regions whose file already exists
    #[arg(long)]
    fresh: bool,

    /// Collect a single city through the search aggregator instead of region crawling
    #[arg(long, value_name = "CITY", conflicts_with = "regions")]
    city: Option<String>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "merge"])]
    dry_run: bool,

    /// Show master set statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "merge"])]
    stats: bool,

    /// Merge every existing region file into the master set and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    merge: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config, &cli);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.merge {
        handle_merge(&config)
    } else if let Some(city) = cli.city.as_deref() {
        handle_city(&config, city).await
    } else {
        handle_crawl(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("placecrawl=info,warn"),
            1 => EnvFilter::new("placecrawl=debug,info"),
            2 => EnvFilter::new("placecrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if !cli.regions.is_empty() {
        config.crawler.regions = cli.regions.clone();
    }
    if let Some(category) = &cli.category {
        config.crawler.category = category.trim().to_string();
    }
    if let Some(country) = &cli.country {
        config.crawler.country = country.trim().to_string();
    }
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, cli: &Cli) {
    println!("=== Placecrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Country: {}", config.crawler.country);
    println!("  Category: {}", config.crawler.category);
    println!("  Token delay: {}ms", config.crawler.page_token_delay_ms);
    match config.crawler.max_pages_per_region {
        Some(max) => println!("  Max pages per region: {}", max),
        None => println!("  Max pages per region: unbounded"),
    }
    println!("  Retries: {}", config.crawler.max_retries);

    println!("\nOutput:");
    println!("  Region files: {}", config.output.region_dir);
    println!("  Master set: {}", config.output.master_path);
    println!("  Merge into master: {}", config.crawler.merge_into_master);

    if let Some(city) = &cli.city {
        println!("\nSingle-city mode: '{} in {}'", config.crawler.category, city);
        return;
    }

    let store = JsonResultStore::from_config(&config.output);
    let skip_completed = config.crawler.skip_completed_regions && !cli.fresh;
    println!("\nRegions ({}):", config.crawler.regions.len());
    for region in &config.crawler.regions {
        if skip_completed && store.region_exists(region, &config.crawler.category) {
            println!("  - {} (already crawled, will skip)", region);
        } else {
            println!("  - {}", region);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows master set statistics
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Master set: {}\n", config.output.master_path);

    let store = JsonResultStore::from_config(&config.output);
    let stats = load_master_statistics(&store).context("failed to read master set")?;
    print_master_statistics(&stats);

    Ok(())
}

/// Handles the --merge mode: folds every region file into the master set
fn handle_merge(config: &Config) -> anyhow::Result<()> {
    let store = JsonResultStore::from_config(&config.output);
    let outcome = merge_region_files(&store).context("failed to merge region files")?;

    println!(
        "✓ Merged region files from {}: {} added, {} already present, {} total",
        config.output.region_dir, outcome.added, outcome.skipped, outcome.total
    );
    Ok(())
}

/// Handles --city: one aggregator query, saved as a region file
async fn handle_city(config: &Config, city: &str) -> anyhow::Result<()> {
    let credentials = Credentials::from_env(&config.api);
    let api_key = credentials.serper_key()?;

    let collector = CityCollector::new(config, api_key)?;
    let store = JsonResultStore::from_config(&config.output);

    let summary = collector
        .collect(
            &store,
            city,
            &config.crawler.category,
            config.crawler.merge_into_master,
        )
        .await
        .with_context(|| format!("single-city collection for '{}' failed", city))?;

    print_summary(&summary);
    if summary.quota_exhausted {
        bail!("API quota exhausted; rerun later to collect '{}'", city);
    }
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if config.crawler.regions.is_empty() {
        bail!("no regions to crawl: set [crawler] regions or pass --region");
    }

    let credentials = Credentials::from_env(&config.api);
    let api_key = credentials.places_key()?.to_string();

    if fresh {
        tracing::info!("Starting fresh crawl (existing region files will be overwritten)");
    }

    let regions = config.crawler.regions.clone();
    let category = config.crawler.category.clone();
    let store = JsonResultStore::from_config(&config.output);

    let cancel = CancellationToken::new();
    let crawler = DiscoveryCrawler::new(config, &api_key, store)?
        .with_cancellation(cancel.clone())
        .fresh(fresh);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing current request and stopping");
            cancel.cancel();
        }
    });

    match crawler.run(&regions, &category).await {
        Ok(summary) => {
            print_summary(&summary);
            if summary.quota_exhausted {
                bail!("API quota exhausted; rerun later to crawl the remaining regions");
            }
            if summary.cancelled {
                bail!("crawl cancelled; rerun to resume");
            }
            tracing::info!("Crawl completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
