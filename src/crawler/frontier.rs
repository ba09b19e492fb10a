//! Crawl frontier with bloom-filter deduplication
//!
//! The frontier is owned by the coordinator alone, so neither the queue nor the
//! membership filter needs a lock.

use bloomfilter::Bloom;
use std::collections::{HashSet, VecDeque};

/// Upper bound on the filter's sizing input, so a huge budget cannot
/// allocate an unbounded bit array
const MAX_EXPECTED_INSERTIONS: usize = 10_000_000;

/// A group of URLs submitted to the worker pool as one unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    urls: Vec<String>,
}

impl Batch {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

impl IntoIterator for Batch {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.urls.into_iter()
    }
}

/// FIFO queue of URLs still to be fetched plus an approximate "seen" set
///
/// A URL enters the queue at most once. A bloom false positive can make a
/// never-seen URL look seen, in which case it is skipped; seeds are exempt.
pub struct Frontier {
    queue: VecDeque<String>,
    seen: Bloom<String>,
}

impl Frontier {
    /// Creates an empty frontier whose filter is sized for
    /// `expected_insertions` URLs at the given false-positive rate
    ///
    /// `expected_insertions` is clamped to `1..=10_000_000`. The rate must lie
    /// strictly between 0 and 1.
    pub fn with_capacity(expected_insertions: usize, false_positive_rate: f64) -> Self {
        let expected = expected_insertions.clamp(1, MAX_EXPECTED_INSERTIONS);
        Self {
            queue: VecDeque::new(),
            seen: Bloom::new_for_fp_rate(expected, false_positive_rate),
        }
    }

    /// Enqueues every seed URL and marks it seen
    ///
    /// Seeds skip the probabilistic check; only exact repeats within `urls`
    /// are collapsed.
    pub fn seed<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique = HashSet::new();
        for url in urls {
            let url = url.into();
            if !unique.insert(url.clone()) {
                tracing::debug!("Ignoring repeated seed {}", url);
                continue;
            }
            self.seen.set(&url);
            self.queue.push_back(url);
        }
    }

    /// Removes up to `max_size` URLs from the front of the queue
    pub fn poll_batch(&mut self, max_size: usize) -> Batch {
        let take = max_size.min(self.queue.len());
        Batch::new(self.queue.drain(..take).collect())
    }

    /// Enqueues `url` unless it was already seen; returns whether it was added
    pub fn offer_discovered(&mut self, url: &str) -> bool {
        let url = url.to_string();
        if self.seen.check_and_set(&url) {
            tracing::trace!("Frontier already saw {}", url);
            return false;
        }
        self.queue.push_back(url);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
