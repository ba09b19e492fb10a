//! Scheduler for the crawl frontier and worker pool
//!
//! This module handles:
//! - Turning frontier entries into batches within the fetch budget
//! - Bounding concurrent batches with a semaphore-gated pool
//! - Tracking in-flight batches and deciding when reaping must block
//! - The termination condition of a crawl

use crate::crawler::extractor::Extractor;
use crate::crawler::frontier::Frontier;
use crate::crawler::result::FetchResult;
use crate::crawler::worker::fetch_batch;
use crate::CrawlError;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// What a worker task hands back to the scheduler
pub(crate) type BatchOutcome = Result<HashSet<FetchResult>, CrawlError>;

/// A reaped worker task
pub(crate) type Completion = Result<BatchOutcome, JoinError>;

/// Frontier, budget and pool state of one crawl
///
/// Owned by the coordinator task; nothing here is shared.
pub(crate) struct Scheduler<E> {
    frontier: Frontier,
    budget: usize,
    in_flight: usize,
    pool_size: usize,
    batch_size: usize,
    permits: Arc<Semaphore>,
    workers: JoinSet<BatchOutcome>,
    extractor: Arc<E>,
}

impl<E: Extractor + 'static> Scheduler<E> {
    pub(crate) fn new(
        frontier: Frontier,
        fetch_budget: usize,
        pool_size: usize,
        batch_size: usize,
        extractor: Arc<E>,
    ) -> Self {
        Self {
            frontier,
            budget: fetch_budget,
            in_flight: 0,
            pool_size,
            batch_size,
            permits: Arc::new(Semaphore::new(pool_size)),
            workers: JoinSet::new(),
            extractor,
        }
    }

    pub(crate) fn frontier_mut(&mut self) -> &mut Frontier {
        &mut self.frontier
    }

    pub(crate) fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    pub(crate) fn budget(&self) -> usize {
        self.budget
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Submits the next batch if budget and frontier allow it
    ///
    /// The batch is charged against the budget now, whether or not its
    /// fetches later succeed. Returns the number of URLs submitted.
    pub(crate) fn submit_next(&mut self) -> usize {
        if self.budget == 0 || self.frontier.is_empty() {
            return 0;
        }

        let batch = self.frontier.poll_batch(self.batch_size.min(self.budget));
        let size = batch.len();
        self.budget -= size;
        self.in_flight += 1;

        tracing::trace!(
            "Submitting batch of {} (budget left {}, in flight {})",
            size,
            self.budget,
            self.in_flight
        );

        let permits = Arc::clone(&self.permits);
        let extractor = Arc::clone(&self.extractor);
        self.workers.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| CrawlError::PoolClosed)?;
            Ok(fetch_batch(extractor.as_ref(), batch).await)
        });

        size
    }

    /// Whether the next reap has to wait for a completion
    ///
    /// True when nothing new can be submitted until something finishes, or
    /// when more batches are outstanding than the pool can run.
    pub(crate) fn must_block(&self) -> bool {
        (self.frontier.is_empty() && self.in_flight > 0) || self.in_flight > self.pool_size
    }

    /// Waits for the next finished batch
    pub(crate) async fn reap(&mut self) -> Option<Completion> {
        let joined = self.workers.join_next().await;
        if joined.is_some() {
            self.in_flight -= 1;
        }
        joined
    }

    /// Takes a finished batch if one is ready
    pub(crate) fn try_reap(&mut self) -> Option<Completion> {
        let joined = self.workers.try_join_next();
        if joined.is_some() {
            self.in_flight -= 1;
        }
        joined
    }

    /// Budget spent with nothing outstanding, or nothing left to do at all
    pub(crate) fn is_finished(&self) -> bool {
        self.in_flight == 0 && (self.budget == 0 || self.frontier.is_empty())
    }

    /// Aborts every outstanding batch and closes the pool
    ///
    /// Returns how many batches were cut short.
    pub(crate) async fn shutdown(&mut self) -> usize {
        self.permits.close();
        self.workers.abort_all();

        let mut aborted = 0;
        while let Some(joined) = self.workers.join_next().await {
            if matches!(&joined, Err(e) if e.is_cancelled()) {
                aborted += 1;
            }
        }
        self.in_flight = 0;
        aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct SlowExtractor {
        delay: Duration,
    }

    impl Extractor for SlowExtractor {
        async fn extract(&self, url: &str) -> Option<FetchResult> {
            tokio::time::sleep(self.delay).await;
            Some(FetchResult::new(url, Vec::<String>::new()))
        }
    }

    fn create_test_scheduler(budget: usize, pool: usize, batch: usize) -> Scheduler<SlowExtractor> {
        Scheduler::new(
            Frontier::with_capacity(budget, 0.0001),
            budget,
            pool,
            batch,
            Arc::new(SlowExtractor {
                delay: Duration::from_millis(5),
            }),
        )
    }

    fn seed(scheduler: &mut Scheduler<SlowExtractor>, count: usize) {
        scheduler
            .frontier_mut()
            .seed((0..count).map(|i| format!("https://example.com/{}", i)));
    }

    #[tokio::test]
    async fn test_nothing_to_submit() {
        let mut scheduler = create_test_scheduler(10, 2, 2);
        assert_eq!(scheduler.submit_next(), 0);
        assert_eq!(scheduler.in_flight(), 0);
        assert!(scheduler.is_finished());
    }

    #[tokio::test]
    async fn test_submit_charges_budget_up_front() {
        let mut scheduler = create_test_scheduler(10, 2, 3);
        seed(&mut scheduler, 5);

        assert_eq!(scheduler.submit_next(), 3);
        assert_eq!(scheduler.budget(), 7);
        assert_eq!(scheduler.in_flight(), 1);
        assert_eq!(scheduler.frontier_size(), 2);

        assert_eq!(scheduler.submit_next(), 2);
        assert_eq!(scheduler.budget(), 5);
        assert_eq!(scheduler.in_flight(), 2);
    }

    #[tokio::test]
    async fn test_batch_clamped_to_budget() {
        let mut scheduler = create_test_scheduler(2, 2, 10);
        seed(&mut scheduler, 5);

        assert_eq!(scheduler.submit_next(), 2);
        assert_eq!(scheduler.budget(), 0);
        assert_eq!(scheduler.submit_next(), 0);
        assert_eq!(scheduler.frontier_size(), 3);
    }

    #[tokio::test]
    async fn test_must_block_rules() {
        let mut scheduler = create_test_scheduler(100, 1, 1);
        seed(&mut scheduler, 3);
        assert!(!scheduler.must_block());

        scheduler.submit_next();
        // one in flight, pool of one, frontier still has work
        assert!(!scheduler.must_block());

        scheduler.submit_next();
        // two in flight exceed the pool
        assert!(scheduler.must_block());

        let _ = scheduler.reap().await;
        scheduler.submit_next();
        // frontier drained while work is outstanding
        assert_eq!(scheduler.frontier_size(), 0);
        assert!(scheduler.must_block());
    }

    #[tokio::test]
    async fn test_reap_until_finished() {
        let mut scheduler = create_test_scheduler(10, 2, 2);
        seed(&mut scheduler, 3);

        scheduler.submit_next();
        scheduler.submit_next();
        assert!(!scheduler.is_finished());

        let mut fetched = 0;
        while let Some(joined) = scheduler.reap().await {
            fetched += joined.unwrap().unwrap().len();
        }
        assert_eq!(fetched, 3);
        assert_eq!(scheduler.in_flight(), 0);
        assert!(scheduler.is_finished());
    }

    #[tokio::test]
    async fn test_try_reap_without_completion() {
        let mut scheduler = create_test_scheduler(10, 2, 2);
        assert!(scheduler.try_reap().is_none());
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_outstanding_batches() {
        let mut scheduler = Scheduler::new(
            Frontier::with_capacity(10, 0.0001),
            10,
            1,
            1,
            Arc::new(SlowExtractor {
                delay: Duration::from_secs(30),
            }),
        );
        seed(&mut scheduler, 2);
        scheduler.submit_next();
        scheduler.submit_next();

        let aborted = scheduler.shutdown().await;
        assert_eq!(aborted, 2);
        assert_eq!(scheduler.in_flight(), 0);
    }
}
