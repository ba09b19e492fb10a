//! JSON lines result sink

use crate::config::OutputConfig;
use crate::crawler::FetchResult;
use crate::storage::traits::{ResultWriter, WriterError, WriterResult};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// One output line
#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    url: &'a str,
    outlinks: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

impl<'a> From<&'a FetchResult> for JsonRecord<'a> {
    fn from(result: &'a FetchResult) -> Self {
        let content = result.content();
        Self {
            url: result.url(),
            outlinks: result.outlinks().iter().map(String::as_str).collect(),
            title: content.and_then(|c| c.title.as_deref()),
            text: content.and_then(|c| c.text.as_deref()),
            html: content.and_then(|c| c.html.as_deref()),
        }
    }
}

/// Appends one JSON object per result to a file
#[derive(Default)]
pub struct JsonLinesWriter {
    out: Option<BufWriter<File>>,
}

impl JsonLinesWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `path` for appending, creating it if needed
    pub fn open_path(&mut self, path: &Path) -> WriterResult<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.out = Some(BufWriter::new(file));
        Ok(())
    }
}

impl ResultWriter for JsonLinesWriter {
    fn open(&mut self, config: &OutputConfig) -> WriterResult<()> {
        self.open_path(Path::new(&config.path))
    }

    fn write(&mut self, result: &FetchResult) -> WriterResult<()> {
        let out = self.out.as_mut().ok_or(WriterError::NotOpen)?;
        serde_json::to_writer(&mut *out, &JsonRecord::from(result))?;
        out.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self) -> WriterResult<()> {
        match self.out.take() {
            Some(mut out) => Ok(out.flush()?),
            None => Ok(()),
        }
    }
}
