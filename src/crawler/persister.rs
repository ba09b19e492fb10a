//! Background persistence of fetch results
//!
//! A single dedicated thread owns the result writer and drains an unbounded
//! lock-free queue into it. Stopping the persister drains everything that was
//! queued before the stop, then closes the writer exactly once.

use crate::config::OutputConfig;
use crate::crawler::result::FetchResult;
use crate::storage::{ResultWriter, WriterResult};
use crate::CrawlError;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Producer side of the persistence queue
#[derive(Clone)]
pub struct PersistenceQueue {
    tx: Sender<FetchResult>,
}

impl PersistenceQueue {
    /// Queues a result for writing; fails only if the persister is gone
    pub fn push(&self, result: FetchResult) -> Result<(), CrawlError> {
        self.tx
            .send(result)
            .map_err(|_| CrawlError::PersisterUnavailable)
    }
}

/// What the persister thread did over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersisterReport {
    /// Results written successfully
    pub written: u64,

    /// Results whose write failed and were skipped
    pub write_failures: u64,

    /// Whether the final close succeeded
    pub closed_cleanly: bool,
}

/// Handle to the running persister thread
pub struct Persister {
    queue: PersistenceQueue,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<PersisterReport>>,
}

impl Persister {
    /// Opens `writer` and starts the persister thread
    ///
    /// # Arguments
    ///
    /// * `writer` - The sink; opened here, closed when the thread exits
    /// * `config` - Output configuration passed to `ResultWriter::open`
    /// * `backoff` - Sleep between polls of an empty queue
    ///
    /// # Returns
    ///
    /// * `Ok(Persister)` - Writer opened and thread running
    /// * `Err(CrawlError)` - The writer failed to open or the thread failed to spawn
    pub fn start<W>(
        mut writer: W,
        config: &OutputConfig,
        backoff: Duration,
    ) -> Result<Self, CrawlError>
    where
        W: ResultWriter + Send + 'static,
    {
        writer.open(config)?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let running = Arc::new(AtomicBool::new(true));
        let sink = ScopedWriter::new(writer);

        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("persister".to_string())
            .spawn(move || persist_loop(sink, rx, thread_running, backoff))?;

        tracing::debug!("Persister started, writing to {}", config.path);

        Ok(Self {
            queue: PersistenceQueue { tx },
            running,
            handle: Some(handle),
        })
    }

    /// Returns a producer handle for the queue
    pub fn queue(&self) -> PersistenceQueue {
        self.queue.clone()
    }

    /// Stops the thread after draining every queued result
    ///
    /// Blocks until the writer has been closed.
    pub fn stop(mut self) -> Result<PersisterReport, CrawlError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<PersisterReport, CrawlError> {
        self.running.store(false, Ordering::Release);

        let Some(handle) = self.handle.take() else {
            return Ok(PersisterReport::default());
        };

        match handle.join() {
            Ok(report) => {
                tracing::debug!(
                    "Persister stopped: {} written, {} failed",
                    report.written,
                    report.write_failures
                );
                Ok(report)
            }
            Err(_) => {
                tracing::error!("Persister thread panicked");
                Err(CrawlError::PersisterPanicked)
            }
        }
    }
}

impl Drop for Persister {
    // Only reached when a crawl is dropped mid-flight. The join blocks the
    // current thread for at most one backoff plus the drain; that is accepted.
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.shutdown() {
                tracing::error!("Persister shutdown on drop failed: {}", e);
            }
        }
    }
}

fn persist_loop<W: ResultWriter>(
    mut sink: ScopedWriter<W>,
    rx: Receiver<FetchResult>,
    running: Arc<AtomicBool>,
    backoff: Duration,
) -> PersisterReport {
    while running.load(Ordering::Acquire) {
        match rx.try_recv() {
            Ok(result) => sink.write(&result),
            Err(TryRecvError::Empty) => thread::sleep(backoff),
            Err(TryRecvError::Disconnected) => break,
        }
    }

    let mut drained = 0u64;
    while let Ok(result) = rx.try_recv() {
        sink.write(&result);
        drained += 1;
    }
    if drained > 0 {
        tracing::debug!("Persister drained {} queued results on stop", drained);
    }

    sink.finish()
}

/// Owns the writer and guarantees a single `close`, including on unwind
struct ScopedWriter<W: ResultWriter> {
    writer: W,
    closed: bool,
    report: PersisterReport,
}

impl<W: ResultWriter> ScopedWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            closed: false,
            report: PersisterReport::default(),
        }
    }

    fn write(&mut self, result: &FetchResult) {
        match self.writer.write(result) {
            Ok(()) => self.report.written += 1,
            Err(e) => {
                self.report.write_failures += 1;
                tracing::warn!("Failed to persist {}: {}", result.url(), e);
            }
        }
    }

    fn close(&mut self) -> WriterResult<()> {
        self.closed = true;
        self.writer.close()
    }

    fn finish(mut self) -> PersisterReport {
        match self.close() {
            Ok(()) => self.report.closed_cleanly = true,
            Err(e) => tracing::error!("Failed to close result writer: {}", e),
        }
        self.report
    }
}

impl<W: ResultWriter> Drop for ScopedWriter<W> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                tracing::error!("Failed to close result writer: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::storage::WriterError;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Open,
        Write(String),
        Close,
    }

    /// Records every call; optionally fails writes for URLs containing a marker
    #[derive(Clone, Default)]
    struct RecordingWriter {
        events: Arc<Mutex<Vec<Event>>>,
        fail_marker: Option<&'static str>,
        fail_open: bool,
    }

    impl RecordingWriter {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
            self.events().iter().filter(|e| pred(e)).count()
        }
    }

    impl ResultWriter for RecordingWriter {
        fn open(&mut self, _config: &OutputConfig) -> WriterResult<()> {
            if self.fail_open {
                return Err(WriterError::NotOpen);
            }
            self.events.lock().unwrap().push(Event::Open);
            Ok(())
        }

        fn write(&mut self, result: &FetchResult) -> WriterResult<()> {
            if let Some(marker) = self.fail_marker {
                if result.url().contains(marker) {
                    return Err(WriterError::Io(std::io::Error::other("disk full")));
                }
            }
            self.events
                .lock()
                .unwrap()
                .push(Event::Write(result.url().to_string()));
            Ok(())
        }

        fn close(&mut self) -> WriterResult<()> {
            self.events.lock().unwrap().push(Event::Close);
            Ok(())
        }
    }

    fn create_test_config() -> OutputConfig {
        OutputConfig {
            format: OutputFormat::Jsonl,
            path: "unused".to_string(),
        }
    }

    fn result(i: usize) -> FetchResult {
        FetchResult::new(format!("https://example.com/{}", i), Vec::<String>::new())
    }

    #[test]
    fn test_flood_then_stop_writes_everything_once() {
        let writer = RecordingWriter::default();
        // A long backoff keeps most items queued until stop forces the drain
        let persister =
            Persister::start(writer.clone(), &create_test_config(), Duration::from_millis(50))
                .unwrap();

        let queue = persister.queue();
        for i in 0..500 {
            queue.push(result(i)).unwrap();
        }

        let report = persister.stop().unwrap();
        assert_eq!(report.written, 500);
        assert_eq!(report.write_failures, 0);
        assert!(report.closed_cleanly);

        let events = writer.events();
        assert_eq!(writer.count(|e| matches!(e, Event::Write(_))), 500);
        assert_eq!(writer.count(|e| *e == Event::Close), 1);
        assert_eq!(events.first(), Some(&Event::Open));
        assert_eq!(events.last(), Some(&Event::Close));

        let mut urls: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::Write(url) => Some(url.clone()),
                _ => None,
            })
            .collect();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 500);
    }

    #[test]
    fn test_failed_write_is_skipped_and_close_still_runs() {
        let writer = RecordingWriter {
            fail_marker: Some("/3"),
            ..RecordingWriter::default()
        };
        let persister =
            Persister::start(writer.clone(), &create_test_config(), Duration::from_millis(1))
                .unwrap();

        let queue = persister.queue();
        for i in 0..10 {
            queue.push(result(i)).unwrap();
        }

        let report = persister.stop().unwrap();
        assert_eq!(report.written, 9);
        assert_eq!(report.write_failures, 1);
        assert_eq!(writer.count(|e| *e == Event::Close), 1);
        assert_eq!(writer.events().last(), Some(&Event::Close));
    }

    #[test]
    fn test_open_failure_is_reported() {
        let writer = RecordingWriter {
            fail_open: true,
            ..RecordingWriter::default()
        };
        let result = Persister::start(writer.clone(), &create_test_config(), Duration::from_millis(1));
        assert!(matches!(result, Err(CrawlError::Writer(_))));
        assert!(writer.events().is_empty());
    }

    #[test]
    fn test_stop_with_empty_queue() {
        let writer = RecordingWriter::default();
        let persister =
            Persister::start(writer.clone(), &create_test_config(), Duration::from_millis(1))
                .unwrap();

        let report = persister.stop().unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(writer.events(), vec![Event::Open, Event::Close]);
    }

    #[test]
    fn test_drop_stops_and_closes() {
        let writer = RecordingWriter::default();
        {
            let persister =
                Persister::start(writer.clone(), &create_test_config(), Duration::from_millis(1))
                    .unwrap();
            persister.queue().push(result(1)).unwrap();
        }

        assert_eq!(writer.count(|e| matches!(e, Event::Write(_))), 1);
        assert_eq!(writer.count(|e| *e == Event::Close), 1);
    }

    #[test]
    fn test_push_after_stop_fails() {
        let persister = Persister::start(
            RecordingWriter::default(),
            &create_test_config(),
            Duration::from_millis(1),
        )
        .unwrap();
        let queue = persister.queue();
        persister.stop().unwrap();

        assert!(matches!(
            queue.push(result(1)),
            Err(CrawlError::PersisterUnavailable)
        ));
    }
}
