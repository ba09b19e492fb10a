//! URL handling module for Trawler
//!
//! Outlinks are normalized before they reach the frontier so that trivially
//! different spellings of the same page share one dedup key.

mod normalize;

pub use normalize::normalize_url;
