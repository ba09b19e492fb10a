use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Trawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    pub output: OutputConfig,
}

/// Crawl pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of batches allowed to fetch concurrently
    #[serde(rename = "pool-size", default = "default_pool_size")]
    pub pool_size: usize,

    /// Maximum number of URLs handed to one worker task
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Total number of fetch attempts the crawl may spend
    #[serde(rename = "fetch-budget")]
    pub fetch_budget: usize,

    /// Target false-positive rate of the frontier's bloom filter
    #[serde(rename = "false-positive-rate", default = "default_false_positive_rate")]
    pub false_positive_rate: f64,

    /// Sleep between non-blocking reaps that found nothing (milliseconds)
    #[serde(rename = "poll-backoff-ms", default = "default_backoff_ms")]
    pub poll_backoff_ms: u64,

    /// Sleep of the persister when its queue is empty (milliseconds)
    #[serde(rename = "persist-backoff-ms", default = "default_backoff_ms")]
    pub persist_backoff_ms: u64,

    /// Number of reaped batches between progress lines
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: u64,

    /// URLs the crawl starts from
    #[serde(default)]
    pub seeds: Vec<String>,
}

impl CrawlerConfig {
    pub fn poll_backoff(&self) -> Duration {
        Duration::from_millis(self.poll_backoff_ms)
    }

    pub fn persist_backoff(&self) -> Duration {
        Duration::from_millis(self.persist_backoff_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Page extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Keep the visible text of each page
    #[serde(rename = "capture-text", default)]
    pub capture_text: bool,

    /// Keep the raw HTML of each page
    #[serde(rename = "capture-html", default)]
    pub capture_html: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            capture_text: false,
            capture_html: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Sink format for fetched pages
    #[serde(default)]
    pub format: OutputFormat,

    /// Path to the database or JSON lines file
    pub path: String,
}

/// Supported result sinks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Sqlite,
    Jsonl,
}

fn default_pool_size() -> usize {
    32
}

fn default_batch_size() -> usize {
    10
}

fn default_false_positive_rate() -> f64 {
    0.01
}

fn default_backoff_ms() -> u64 {
    10
}

fn default_progress_interval() -> u64 {
    50
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}
