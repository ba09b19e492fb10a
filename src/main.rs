//! Trawler main entry point
//!
//! This is the command-line interface for the Trawler crawl pipeline.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use trawler::config::{load_config_with_hash, validate, Config, OutputFormat};
use trawler::crawler::crawl;
use trawler::output::{load_statistics, print_report, print_statistics};
use trawler::CrawlError;
use tracing_subscriber::EnvFilter;

/// Trawler: a concurrent crawl pipeline
///
/// Trawler crawls outward from a set of seed URLs with a bounded pool of
/// workers, deduplicates discovered links with a bloom filter and streams
/// every fetched page into SQLite or a JSON lines file.
#[derive(Parser, Debug)]
#[command(name = "trawler")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent crawl pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Seed URL to crawl from, replacing the configured seeds (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Override the configured fetch budget
    #[arg(long, value_name = "N")]
    budget: Option<usize>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the result database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if apply_overrides(&mut config, cli.seeds, cli.budget) {
        validate(&config).context("Invalid command-line override")?;
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("trawler=info,warn"),
            1 => EnvFilter::new("trawler=debug,info"),
            2 => EnvFilter::new("trawler=trace,debug"),
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

/// Applies `--seed` and `--budget`; returns whether anything changed
fn apply_overrides(config: &mut Config, seeds: Vec<String>, budget: Option<usize>) -> bool {
    let mut changed = false;

    if !seeds.is_empty() {
        tracing::info!("Using {} seeds from the command line", seeds.len());
        config.crawler.seeds = seeds;
        changed = true;
    }

    if let Some(budget) = budget {
        tracing::info!("Fetch budget overridden to {}", budget);
        config.crawler.fetch_budget = budget;
        changed = true;
    }

    changed
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Trawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Pool size: {}", config.crawler.pool_size);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Fetch budget: {}", config.crawler.fetch_budget);
    println!(
        "  False-positive rate: {}",
        config.crawler.false_positive_rate
    );
    println!("  Poll backoff: {}ms", config.crawler.poll_backoff_ms);
    println!("  Persist backoff: {}ms", config.crawler.persist_backoff_ms);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nExtractor:");
    println!("  Timeout: {}s", config.extractor.timeout_secs);
    println!("  Connect timeout: {}s", config.extractor.connect_timeout_secs);
    println!("  Capture text: {}", config.extractor.capture_text);
    println!("  Capture HTML: {}", config.extractor.capture_html);

    println!("\nOutput:");
    println!("  Format: {:?}", config.output.format);
    println!("  Path: {}", config.output.path);

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would fetch at most {} pages with {} workers",
        config.crawler.fetch_budget, config.crawler.pool_size
    );
}

/// Handles the --stats mode: shows statistics from the result database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    if config.output.format != OutputFormat::Sqlite {
        bail!("--stats needs a sqlite output, configured format is {:?}", config.output.format);
    }

    println!("Database: {}\n", config.output.path);
    let stats = load_statistics(Path::new(&config.output.path))
        .with_context(|| format!("Failed to read {}", config.output.path))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling from {} seeds into {} ({:?})",
        config.crawler.seeds.len(),
        config.output.path,
        config.output.format
    );

    match crawl(config).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(CrawlError::Interrupted { persisted, report }) => {
            tracing::warn!("Crawl interrupted, {} results persisted", persisted);
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
