//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the scheduling loop that ties the pipeline together:
//! - Seeding the frontier and submitting batches to the worker pool
//! - Reaping completed batches, blocking when too much work is outstanding
//! - Feeding discovered outlinks back into the frontier
//! - Forwarding results to the persister thread
//! - Tearing everything down on completion or interruption

use crate::config::{CrawlerConfig, OutputConfig};
use crate::crawler::extractor::Extractor;
use crate::crawler::frontier::Frontier;
use crate::crawler::persister::{PersistenceQueue, Persister};
use crate::crawler::scheduler::{Completion, Scheduler};
use crate::output::CrawlReport;
use crate::storage::ResultWriter;
use crate::{ConfigError, CrawlError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Tuning knobs of one crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Batches allowed to fetch concurrently
    pub pool_size: usize,

    /// Maximum URLs per batch
    pub batch_size: usize,

    /// Total fetch attempts the crawl may spend
    pub fetch_budget: usize,

    /// False-positive rate of the frontier's membership filter
    pub false_positive_rate: f64,

    /// Sleep after a non-blocking reap that found nothing
    pub poll_backoff: Duration,

    /// Sleep of the persister when its queue is empty
    pub persist_backoff: Duration,

    /// Reaped batches between progress lines
    pub progress_interval: u64,
}

impl CrawlSettings {
    /// Default settings with the given fetch budget
    pub fn new(fetch_budget: usize) -> Self {
        Self {
            pool_size: 32,
            batch_size: 10,
            fetch_budget,
            false_positive_rate: 0.01,
            poll_backoff: Duration::from_millis(10),
            persist_backoff: Duration::from_millis(10),
            progress_interval: 50,
        }
    }
}

impl From<&CrawlerConfig> for CrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            pool_size: config.pool_size,
            batch_size: config.batch_size,
            fetch_budget: config.fetch_budget,
            false_positive_rate: config.false_positive_rate,
            poll_backoff: config.poll_backoff(),
            persist_backoff: config.persist_backoff(),
            progress_interval: config.progress_interval,
        }
    }
}

/// Handle used to interrupt a running crawl
///
/// Cloned handles share the same state; triggering is idempotent.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<SignalState>,
}

#[derive(Default)]
struct SignalState {
    triggered: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the crawl to stop
    pub fn trigger(&self) {
        if !self.inner.triggered.swap(true, Ordering::AcqRel) {
            tracing::info!("Shutdown requested");
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    /// Resolves once the signal has been triggered
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Completed,
    Interrupted,
}

/// Main crawler coordinator structure
///
/// Owns the extractor shared by every worker and the persister thread
/// draining results into the writer.
pub struct Coordinator<E> {
    settings: CrawlSettings,
    extractor: Arc<E>,
    persister: Persister,
    shutdown: ShutdownSignal,
}

impl<E: Extractor + 'static> Coordinator<E> {
    /// Creates a coordinator and starts its persister
    ///
    /// # Arguments
    ///
    /// * `settings` - Pool, batch and budget settings
    /// * `extractor` - Turns URLs into results; shared by every worker
    /// * `writer` - Result sink, opened here and closed when the crawl ends
    /// * `output` - Sink configuration handed to `ResultWriter::open`
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to process seeds
    /// * `Err(CrawlError)` - Invalid settings or the writer failed to open
    pub fn setup<W>(
        settings: CrawlSettings,
        extractor: E,
        writer: W,
        output: &OutputConfig,
    ) -> Result<Self>
    where
        W: ResultWriter + Send + 'static,
    {
        if settings.pool_size == 0 {
            return Err(
                ConfigError::Validation("pool-size must be at least 1".to_string()).into(),
            );
        }
        if settings.batch_size == 0 {
            return Err(
                ConfigError::Validation("batch-size must be at least 1".to_string()).into(),
            );
        }
        // NaN fails both comparisons
        if !(settings.false_positive_rate > 0.0 && settings.false_positive_rate < 1.0) {
            return Err(ConfigError::Validation(format!(
                "false-positive-rate must be within (0, 1), got {}",
                settings.false_positive_rate
            ))
            .into());
        }

        let persister = Persister::start(writer, output, settings.persist_backoff)?;

        Ok(Self {
            settings,
            extractor: Arc::new(extractor),
            persister,
            shutdown: ShutdownSignal::new(),
        })
    }

    /// Returns a handle that interrupts `process` when triggered
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Crawls outward from `seeds` until the budget is spent or nothing is left
    ///
    /// The persister is stopped and the pool shut down before this returns,
    /// on every path. An interrupted crawl returns `CrawlError::Interrupted`,
    /// carrying the report, once everything already fetched has been written.
    pub async fn process<I, S>(self, seeds: I) -> Result<CrawlReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Self {
            settings,
            extractor,
            persister,
            shutdown,
        } = self;
        let started = Instant::now();

        let mut frontier =
            Frontier::with_capacity(settings.fetch_budget, settings.false_positive_rate);
        frontier.seed(seeds);

        let mut report = CrawlReport {
            urls_discovered: frontier.len() as u64,
            ..CrawlReport::default()
        };

        tracing::info!(
            "Starting crawl: {} seeds, budget {}, pool {}, batch {}",
            frontier.len(),
            settings.fetch_budget,
            settings.pool_size,
            settings.batch_size
        );

        let mut scheduler = Scheduler::new(
            frontier,
            settings.fetch_budget,
            settings.pool_size,
            settings.batch_size,
            extractor,
        );

        let queue = persister.queue();
        let outcome = run_loop(
            &mut scheduler,
            &queue,
            &shutdown,
            &settings,
            &mut report,
            started,
        )
        .await;
        drop(queue);

        // Persister first, so everything reaped so far reaches the sink
        let stopped = match tokio::task::spawn_blocking(move || persister.stop()).await {
            Ok(stopped) => stopped,
            Err(e) => {
                tracing::error!("Failed to join persister: {}", e);
                Err(CrawlError::PersisterPanicked)
            }
        };

        let aborted = scheduler.shutdown().await;
        if aborted > 0 {
            tracing::info!("Aborted {} outstanding batches", aborted);
        }

        report.elapsed = started.elapsed();
        let exit = outcome?;
        let persisted = stopped?;
        report.persisted = persisted.written;
        report.write_failures = persisted.write_failures;
        report.interrupted = exit == Exit::Interrupted;

        tracing::info!(
            "Crawl finished: {} fetched, {} persisted, {} attempted in {:?}",
            report.results_fetched,
            report.persisted,
            report.urls_attempted,
            report.elapsed
        );

        match exit {
            Exit::Completed => Ok(report),
            Exit::Interrupted => Err(CrawlError::Interrupted {
                persisted: report.persisted,
                report: Box::new(report),
            }),
        }
    }
}

async fn run_loop<E: Extractor + 'static>(
    scheduler: &mut Scheduler<E>,
    queue: &PersistenceQueue,
    shutdown: &ShutdownSignal,
    settings: &CrawlSettings,
    report: &mut CrawlReport,
    started: Instant,
) -> Result<Exit> {
    let progress_interval = settings.progress_interval.max(1);
    let mut reaped: u64 = 0;

    loop {
        if shutdown.is_triggered() {
            return Ok(Exit::Interrupted);
        }

        let submitted = scheduler.submit_next();
        if submitted > 0 {
            report.batches_submitted += 1;
            report.urls_attempted += submitted as u64;
        }

        let completion = if scheduler.must_block() {
            tokio::select! {
                joined = scheduler.reap() => joined,
                _ = shutdown.wait() => {
                    tracing::warn!(
                        "Interrupted with {} batches in flight",
                        scheduler.in_flight()
                    );
                    return Ok(Exit::Interrupted);
                }
            }
        } else {
            let joined = scheduler.try_reap();
            if joined.is_none() && !scheduler.is_finished() {
                tokio::time::sleep(settings.poll_backoff).await;
            }
            joined
        };

        if let Some(joined) = completion {
            handle_completion(scheduler, queue, report, joined)?;
            reaped += 1;

            if reaped % progress_interval == 0 {
                tracing::info!(
                    "Progress: {} batches reaped, {} fetched, {} in frontier, {} in flight, budget {} left, {:?} elapsed",
                    reaped,
                    report.results_fetched,
                    scheduler.frontier_size(),
                    scheduler.in_flight(),
                    scheduler.budget(),
                    started.elapsed()
                );
            }
        }

        if scheduler.is_finished() {
            tracing::debug!(
                "Crawl loop done: budget {} left, {} in frontier",
                scheduler.budget(),
                scheduler.frontier_size()
            );
            return Ok(Exit::Completed);
        }
    }
}

/// Forwards a batch's results to the persister and its outlinks to the frontier
fn handle_completion<E: Extractor + 'static>(
    scheduler: &mut Scheduler<E>,
    queue: &PersistenceQueue,
    report: &mut CrawlReport,
    joined: Completion,
) -> Result<()> {
    let results = match joined {
        Ok(Ok(results)) => results,
        Ok(Err(e)) => return Err(e),
        Err(e) if e.is_panic() => {
            tracing::error!("Worker panicked, batch dropped: {}", e);
            return Ok(());
        }
        Err(e) => {
            tracing::debug!("Worker cancelled: {}", e);
            return Ok(());
        }
    };

    report.results_fetched += results.len() as u64;
    for result in results {
        let outlinks = result.outlinks().clone();
        queue.push(result)?;
        for link in &outlinks {
            if scheduler.frontier_mut().offer_discovered(link) {
                report.urls_discovered += 1;
            }
        }
    }

    Ok(())
}
