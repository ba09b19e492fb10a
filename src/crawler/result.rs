//! Fetch result value types

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Optional page payload carried alongside a result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    /// Page title (from the `<title>` tag)
    pub title: Option<String>,

    /// Visible text of the page body
    pub text: Option<String>,

    /// Raw HTML as served
    pub html: Option<String>,
}

impl PageContent {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.text.is_none() && self.html.is_none()
    }
}

/// A fetched page: its URL plus the outlinks discovered on it
///
/// Equality and hashing only consider the URL, which is the dedup key.
#[derive(Debug, Clone)]
pub struct FetchResult {
    url: String,
    outlinks: BTreeSet<String>,
    content: Option<PageContent>,
}

impl FetchResult {
    pub fn new<I, S>(url: impl Into<String>, outlinks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            url: url.into(),
            outlinks: outlinks.into_iter().map(Into::into).collect(),
            content: None,
        }
    }

    /// Attaches a payload; an empty payload is dropped
    pub fn with_content(mut self, content: PageContent) -> Self {
        self.content = (!content.is_empty()).then_some(content);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn outlinks(&self) -> &BTreeSet<String> {
        &self.outlinks
    }

    pub fn content(&self) -> Option<&PageContent> {
        self.content.as_ref()
    }

    pub fn title(&self) -> Option<&str> {
        self.content.as_ref().and_then(|c| c.title.as_deref())
    }
}

impl PartialEq for FetchResult {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for FetchResult {}

impl Hash for FetchResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}
