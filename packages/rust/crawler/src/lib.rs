//! Page retrieval for organization crawls.
//!
//! This crate provides:
//! - [`frontier`]: same-site link extraction from fetched markup
//! - [`fetcher`]: the [`PageFetcher`] trait and its reqwest implementation
//! - [`gate`]: fetch-or-reuse against the document store
//! - [`engine`]: the throttled, sequential fetch loop over a page budget

pub mod engine;
pub mod fetcher;
pub mod frontier;
pub mod gate;

pub use engine::{FetchLoop, FetchReport};
pub use fetcher::{HttpFetcher, PageFetcher};
pub use frontier::extract_frontier;
pub use gate::{GateOutcome, PageGate};

/// Receives progress notifications from a running crawl.
pub trait ProgressReporter: Send + Sync {
    /// A new phase started (homepage, selection, fetching, ...).
    fn phase(&self, name: &str);

    /// Budget URL `current` of `total` is about to be processed.
    fn page_fetched(&self, url: &str, current: usize, total: usize);
}

/// Discards all progress notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}

    fn page_fetched(&self, _url: &str, _current: usize, _total: usize) {}
}
