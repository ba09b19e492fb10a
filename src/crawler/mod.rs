//! Crawler module for the concurrent crawl pipeline
//!
//! This module contains the core crawling logic, including:
//! - The frontier with bloom-filter deduplication
//! - Batch scheduling over a bounded worker pool
//! - The background persister thread
//! - HTTP extraction and HTML parsing
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod frontier;
mod parser;
mod persister;
mod result;
mod scheduler;
mod worker;

pub use coordinator::{Coordinator, CrawlSettings, ShutdownSignal};
pub use extractor::{build_http_client, Extractor, HttpExtractor};
pub use frontier::{Batch, Frontier};
pub use parser::{parse_html, ParsedPage};
pub use persister::{PersistenceQueue, Persister, PersisterReport};
pub use result::{FetchResult, PageContent};
pub use worker::fetch_batch;

use crate::config::Config;
use crate::output::CrawlReport;
use crate::storage::writer_for;
use crate::url::normalize_url;
use crate::CrawlError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Normalize the configured seeds
/// 2. Build the HTTP extractor
/// 3. Open the configured result writer on the persister thread
/// 4. Run the scheduling loop, stopping early on Ctrl-C
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed successfully
/// * `Err(CrawlError)` - Crawl failed or was interrupted
///
/// # Example
///
/// ```no_run
/// use trawler::config::load_config;
/// use trawler::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = crawl(&config).await?;
/// println!("{} pages persisted", report.persisted);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config) -> Result<CrawlReport, CrawlError> {
    let seeds = config
        .crawler
        .seeds
        .iter()
        .map(|seed| normalize_url(seed).map(|url| url.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    let extractor = HttpExtractor::new(&config.user_agent, &config.extractor)?;
    let writer = writer_for(&config.output);
    let coordinator = Coordinator::setup(
        CrawlSettings::from(&config.crawler),
        extractor,
        writer,
        &config.output,
    )?;

    let signal = coordinator.shutdown_signal();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.trigger();
        }
    });

    let report = coordinator.process(seeds).await;
    interrupt.abort();
    report
}
