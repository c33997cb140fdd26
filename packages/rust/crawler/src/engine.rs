//! Budgeted fetch loop.
//!
//! Walks the selected URLs one at a time, pausing on the injected throttle
//! before each, and passes every URL through the [`PageGate`]. A failed URL
//! is recorded and skipped; the loop never aborts on a fetch failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use orgscout_shared::{OrgId, Page, Result, Throttle};

use crate::ProgressReporter;
use crate::gate::{GateOutcome, PageGate};

/// Summary of one pass over a budget.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Pages obtained, in budget order.
    pub pages: Vec<Page>,
    /// Pages fetched from the network during this pass.
    pub fetched: usize,
    /// Pages that were already stored.
    pub cached: usize,
    /// URLs that could not be fetched, with the reason.
    pub failed: Vec<(String, String)>,
    pub duration: Duration,
}

impl FetchReport {
    /// Non-empty normalized content of each page, in budget order.
    pub fn contents(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .map(|p| p.content.as_str())
            .filter(|c| !c.trim().is_empty())
    }
}

/// Sequential fetcher for a selected set of URLs.
#[derive(Clone)]
pub struct FetchLoop {
    gate: PageGate,
    throttle: Arc<dyn Throttle>,
}

impl FetchLoop {
    pub fn new(gate: PageGate, throttle: Arc<dyn Throttle>) -> Self {
        Self { gate, throttle }
    }

    /// Fetch every URL of `budget` for `org_id`.
    ///
    /// The throttle is awaited before each URL, cache hits included. Only
    /// store errors are returned as `Err`.
    #[instrument(skip_all, fields(org_id = %org_id, budget = budget.len()))]
    pub async fn run(
        &self,
        org_id: &OrgId,
        budget: &[String],
        progress: &dyn ProgressReporter,
    ) -> Result<FetchReport> {
        let start = Instant::now();
        let mut report = FetchReport::default();

        for (i, url) in budget.iter().enumerate() {
            self.throttle.wait().await;
            progress.page_fetched(url, i + 1, budget.len());

            match self.gate.get_or_fetch(org_id, url).await? {
                GateOutcome::Cached(page) => {
                    report.cached += 1;
                    report.pages.push(page);
                }
                GateOutcome::Fetched(page) => {
                    report.fetched += 1;
                    report.pages.push(page);
                }
                GateOutcome::Failed { url, reason } => report.failed.push((url, reason)),
            }
        }

        report.duration = start.elapsed();
        info!(
            fetched = report.fetched,
            cached = report.cached,
            failed = report.failed.len(),
            duration_ms = report.duration.as_millis() as u64,
            "fetch loop completed"
        );

        Ok(report)
    }
}
