//! Result writer trait and error types
//!
//! This module defines the sink interface the persister drives and the
//! errors a sink may report.

use crate::config::OutputConfig;
use crate::crawler::FetchResult;
use thiserror::Error;

/// Errors that can occur while writing results
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Writer is not open")]
    NotOpen,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for writer operations
pub type WriterResult<T> = Result<T, WriterError>;

/// Trait for result sinks
///
/// A writer is opened once, receives every persisted result through `write`
/// from a single thread, and is closed exactly once. `close` must release
/// resources even after a failed `write`.
pub trait ResultWriter {
    /// Acquires the sink described by `config`
    fn open(&mut self, config: &OutputConfig) -> WriterResult<()>;

    /// Appends one record
    fn write(&mut self, result: &FetchResult) -> WriterResult<()>;

    /// Flushes and releases the sink
    fn close(&mut self) -> WriterResult<()>;
}

impl<W: ResultWriter + ?Sized> ResultWriter for Box<W> {
    fn open(&mut self, config: &OutputConfig) -> WriterResult<()> {
        (**self).open(config)
    }

    fn write(&mut self, result: &FetchResult) -> WriterResult<()> {
        (**self).write(result)
    }

    fn close(&mut self) -> WriterResult<()> {
        (**self).close()
    }
}
