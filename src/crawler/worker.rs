//! Batch execution for the worker pool

use crate::crawler::extractor::Extractor;
use crate::crawler::frontier::Batch;
use crate::crawler::result::FetchResult;
use std::collections::HashSet;

/// Extracts every URL of a batch, keeping only the successes
///
/// A URL the extractor could not handle is simply absent from the returned
/// set; it is not retried here.
pub async fn fetch_batch<E: Extractor>(
    extractor: &E,
    batch: Batch,
) -> HashSet<FetchResult> {
    let attempted = batch.len();
    let mut results = HashSet::with_capacity(attempted);

    for url in batch {
        match extractor.extract(&url).await {
            Some(result) => {
                tracing::debug!(
                    "Extracted {} ({} outlinks)",
                    result.url(),
                    result.outlinks().len()
                );
                results.insert(result);
            }
            None => tracing::debug!("No result for {}", url),
        }
    }

    tracing::trace!("Batch finished: {}/{} extracted", results.len(), attempted);
    results
}
