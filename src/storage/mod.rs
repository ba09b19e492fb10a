//! Storage module for persisting crawl results
//!
//! This module handles every sink the persister can drain into:
//! - The `ResultWriter` trait with its open/write/close lifecycle
//! - A SQLite sink storing pages and their outlinks
//! - A JSON lines sink for line-oriented processing

mod jsonl;
mod schema;
mod sqlite;
mod traits;

pub use jsonl::JsonLinesWriter;
pub use sqlite::SqliteResultWriter;
pub use traits::{ResultWriter, WriterError, WriterResult};

use crate::config::{OutputConfig, OutputFormat};

/// Builds the unopened sink selected by the output configuration
///
/// # Example
///
/// ```
/// use trawler::config::{OutputConfig, OutputFormat};
/// use trawler::storage::writer_for;
///
/// let config = OutputConfig {
///     format: OutputFormat::Jsonl,
///     path: "results.jsonl".to_string(),
/// };
/// let _writer = writer_for(&config);
/// ```
pub fn writer_for(config: &OutputConfig) -> Box<dyn ResultWriter + Send> {
    match config.format {
        OutputFormat::Sqlite => Box::new(SqliteResultWriter::new()),
        OutputFormat::Jsonl => Box::new(JsonLinesWriter::new()),
    }
}
