//! Summary of a single crawl run

use std::time::Duration;

/// What one call to `Coordinator::process` did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// Batches handed to the worker pool
    pub batches_submitted: u64,

    /// URLs charged against the fetch budget
    pub urls_attempted: u64,

    /// Results returned by the extractor
    pub results_fetched: u64,

    /// URLs accepted into the frontier, seeds included
    pub urls_discovered: u64,

    /// Results the persister wrote successfully
    pub persisted: u64,

    /// Results the persister failed to write
    pub write_failures: u64,

    /// Whether the crawl ended on the shutdown signal
    pub interrupted: bool,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,
}

impl CrawlReport {
    /// URLs that were attempted but produced no result
    pub fn failed_attempts(&self) -> u64 {
        self.urls_attempted.saturating_sub(self.results_fetched)
    }

    /// Results fetched per second
    pub fn fetch_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.results_fetched as f64 / secs
        } else {
            0.0
        }
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    if report.interrupted {
        println!("=== Crawl Interrupted ===\n");
    } else {
        println!("=== Crawl Complete ===\n");
    }

    println!("Scheduling:");
    println!("  Batches submitted: {}", report.batches_submitted);
    println!("  URLs attempted: {}", report.urls_attempted);
    println!("  URLs discovered: {}", report.urls_discovered);
    println!();

    println!("Results:");
    println!("  Fetched: {}", report.results_fetched);
    println!("  Failed attempts: {}", report.failed_attempts());
    println!("  Persisted: {}", report.persisted);
    if report.write_failures > 0 {
        println!("  Write failures: {}", report.write_failures);
    }
    println!();

    println!(
        "Elapsed: {:.1}s ({:.2} pages/sec)",
        report.elapsed.as_secs_f64(),
        report.fetch_rate()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_attempts() {
        let report = CrawlReport {
            urls_attempted: 10,
            results_fetched: 7,
            ..CrawlReport::default()
        };
        assert_eq!(report.failed_attempts(), 3);
    }

    #[test]
    fn test_fetch_rate() {
        let report = CrawlReport {
            results_fetched: 50,
            elapsed: Duration::from_secs(10),
            ..CrawlReport::default()
        };
        assert!((report.fetch_rate() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fetch_rate_zero_elapsed() {
        let report = CrawlReport {
            results_fetched: 5,
            ..CrawlReport::default()
        };
        assert_eq!(report.fetch_rate(), 0.0);
    }
}
