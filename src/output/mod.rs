//! Output module for crawl reports and statistics
//!
//! This module handles:
//! - The end-of-run report returned by the coordinator
//! - Reading statistics back out of a SQLite result database

mod report;
pub mod stats;

pub use report::{print_report, CrawlReport};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
