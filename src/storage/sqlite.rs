//! SQLite result sink
//!
//! This module provides a SQLite-based implementation of the ResultWriter trait.

use crate::config::OutputConfig;
use crate::crawler::FetchResult;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ResultWriter, WriterError, WriterResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite result sink
///
/// Each written result becomes one `pages` row (replacing an older row for the
/// same URL) plus one `links` row per outlink.
#[derive(Default)]
pub struct SqliteResultWriter {
    conn: Option<Connection>,
}

impl SqliteResultWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (or creates) the database at `path` and prepares the schema
    pub fn open_path(&mut self, path: &Path) -> WriterResult<()> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;
        self.conn = Some(conn);
        Ok(())
    }

    /// Opens an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory(&mut self) -> WriterResult<()> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        self.conn = Some(conn);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    #[cfg(test)]
    fn connection(&self) -> &Connection {
        self.conn.as_ref().expect("writer not open")
    }
}

impl ResultWriter for SqliteResultWriter {
    fn open(&mut self, config: &OutputConfig) -> WriterResult<()> {
        self.open_path(Path::new(&config.path))
    }

    fn write(&mut self, result: &FetchResult) -> WriterResult<()> {
        let conn = self.conn.as_mut().ok_or(WriterError::NotOpen)?;
        let content = result.content();
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO pages (url, title, text, html, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                result.url(),
                content.and_then(|c| c.title.as_deref()),
                content.and_then(|c| c.text.as_deref()),
                content.and_then(|c| c.html.as_deref()),
                now
            ],
        )?;

        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO links (from_url, to_url) VALUES (?1, ?2)")?;
            for link in result.outlinks() {
                stmt.execute(params![result.url(), link])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn close(&mut self) -> WriterResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        let checkpoint = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()));
        if let Err(e) = checkpoint {
            tracing::warn!("WAL checkpoint failed on close: {}", e);
        }

        conn.close().map_err(|(_, e)| WriterError::Sqlite(e))
    }
}
