//! Statistics generation from a result database
//!
//! This module provides functionality for extracting and displaying
//! statistics from a database written by the SQLite result writer.

use crate::storage::WriterResult;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Result database statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Number of stored pages
    pub total_pages: u64,

    /// Pages with a title
    pub titled_pages: u64,

    /// Number of recorded outlinks
    pub total_links: u64,

    /// Distinct outlink targets
    pub distinct_targets: u64,

    /// Timestamp of the earliest fetch, if any
    pub first_fetched_at: Option<String>,

    /// Timestamp of the latest fetch, if any
    pub last_fetched_at: Option<String>,
}

/// Loads statistics from the result database at `path`
///
/// The database is never created here; a missing file is an error.
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(WriterError)` - Failed to open or query the database
pub fn load_statistics(path: &Path) -> WriterResult<CrawlStatistics> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;

    let total_pages = count(&conn, "SELECT COUNT(*) FROM pages")?;
    let titled_pages = count(&conn, "SELECT COUNT(*) FROM pages WHERE title IS NOT NULL")?;
    let total_links = count(&conn, "SELECT COUNT(*) FROM links")?;
    let distinct_targets = count(&conn, "SELECT COUNT(DISTINCT to_url) FROM links")?;

    let (first_fetched_at, last_fetched_at) = conn.query_row(
        "SELECT MIN(fetched_at), MAX(fetched_at) FROM pages",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(CrawlStatistics {
        total_pages,
        titled_pages,
        total_links,
        distinct_targets,
        first_fetched_at,
        last_fetched_at,
    })
}

fn count(conn: &Connection, sql: &str) -> rusqlite::Result<u64> {
    conn.query_row(sql, [], |row| row.get::<_, i64>(0))
        .map(|n| n.max(0) as u64)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages stored: {}", stats.total_pages);
    println!("  Outlinks recorded: {}", stats.total_links);
    println!("  Distinct link targets: {}", stats.distinct_targets);
    println!();

    let titled_rate = if stats.total_pages > 0 {
        (stats.titled_pages as f64 / stats.total_pages as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Titled pages: {:.1}% ({} / {})",
        titled_rate, stats.titled_pages, stats.total_pages
    );

    if let (Some(first), Some(last)) = (&stats.first_fetched_at, &stats.last_fetched_at) {
        println!("Fetched between {} and {}", first, last);
    }
}
