//! External place directory: search, details, and paginated enumeration.

mod places;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use orgscout_shared::{Outcome, PlaceRecord, Result, Throttle};

pub use places::PlacesClient;

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct DirectoryPage {
    pub records: Vec<PlaceRecord>,
    /// Continuation token for the next page, if any.
    pub next_token: Option<String>,
}

/// Paginated free-text search over the directory.
#[async_trait]
pub trait DirectorySearch: Send + Sync {
    async fn search(&self, query: &str, page_token: Option<&str>) -> Result<DirectoryPage>;
}

/// Full record lookup by directory id.
#[async_trait]
pub trait DirectoryDetails: Send + Sync {
    async fn details(&self, place_id: &str) -> Result<PlaceRecord>;
}

/// Collect every record matching `query`, following continuation tokens.
///
/// The throttle is awaited before each follow-up request; continuation tokens
/// only become valid after a delay. A failed page ends enumeration and the
/// records gathered so far are returned as [`Outcome::Degraded`].
#[instrument(skip(search, throttle))]
pub async fn enumerate(
    search: &dyn DirectorySearch,
    throttle: &dyn Throttle,
    query: &str,
) -> Outcome<Vec<PlaceRecord>> {
    let mut records = Vec::new();
    let mut token: Option<String> = None;
    let mut page = 1usize;

    loop {
        if token.is_some() {
            throttle.wait().await;
        }

        let result = match search.search(query, token.as_deref()).await {
            Ok(result) => result,
            Err(e) => {
                warn!(page, error = %e, "directory page failed, stopping enumeration");
                return Outcome::degraded(records, format!("page {page} failed: {e}"));
            }
        };

        records.extend(result.records);
        match result.next_token {
            Some(next) => {
                token = Some(next);
                page += 1;
            }
            None => break,
        }
    }

    info!(pages = page, records = records.len(), "directory enumeration complete");
    Outcome::Complete(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use orgscout_shared::OrgScoutError;

    /// Serves scripted pages and records the tokens it was called with.
    struct ScriptedDirectory {
        pages: Vec<Result<DirectoryPage>>,
        seen_tokens: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedDirectory {
        fn new(pages: Vec<Result<DirectoryPage>>) -> Self {
            Self {
                pages,
                seen_tokens: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DirectorySearch for ScriptedDirectory {
        async fn search(&self, _query: &str, page_token: Option<&str>) -> Result<DirectoryPage> {
            let mut seen = self.seen_tokens.lock().unwrap();
            let index = seen.len();
            seen.push(page_token.map(String::from));
            match self.pages.get(index) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err(e)) => Err(OrgScoutError::Directory(e.to_string())),
                None => Err(OrgScoutError::Directory("no more pages".into())),
            }
        }
    }

    #[derive(Default)]
    struct CountingThrottle {
        waits: AtomicUsize,
    }

    #[async_trait]
    impl Throttle for CountingThrottle {
        async fn wait(&self) {
            self.waits.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn record(id: &str) -> PlaceRecord {
        PlaceRecord {
            place_id: id.into(),
            name: format!("Org {id}"),
            formatted_address: None,
            website: None,
            rating: None,
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Result<DirectoryPage> {
        Ok(DirectoryPage {
            records: ids.iter().map(|id| record(id)).collect(),
            next_token: next.map(String::from),
        })
    }

    #[tokio::test]
    async fn follows_tokens_and_waits_between_pages() {
        let directory = ScriptedDirectory::new(vec![
            page(&["a", "b"], Some("T1")),
            page(&["c"], Some("T2")),
            page(&["d", "e"], None),
        ]);
        let throttle = CountingThrottle::default();

        let outcome = enumerate(&directory, &throttle, "food shelves").await;

        assert!(!outcome.is_degraded());
        let ids: Vec<&str> = outcome.value().iter().map(|r| r.place_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(throttle.waits.load(Ordering::SeqCst), 2);
        assert_eq!(
            *directory.seen_tokens.lock().unwrap(),
            vec![None, Some("T1".to_string()), Some("T2".to_string())]
        );
    }

    #[tokio::test]
    async fn single_page_never_waits() {
        let directory = ScriptedDirectory::new(vec![page(&["a"], None)]);
        let throttle = CountingThrottle::default();

        let outcome = enumerate(&directory, &throttle, "q").await;
        assert_eq!(outcome.value().len(), 1);
        assert_eq!(throttle.waits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_page_returns_accumulated_records_degraded() {
        let directory = ScriptedDirectory::new(vec![
            page(&["a", "b"], Some("T1")),
            Err(OrgScoutError::Directory("HTTP 500".into())),
        ]);
        let throttle = CountingThrottle::default();

        let outcome = enumerate(&directory, &throttle, "q").await;
        assert!(outcome.is_degraded());
        assert!(outcome.reason().unwrap().contains("page 2"));
        assert_eq!(outcome.value().len(), 2);
    }

    #[tokio::test]
    async fn first_page_failure_is_empty_and_degraded() {
        let directory =
            ScriptedDirectory::new(vec![Err(OrgScoutError::Directory("denied".into()))]);
        let outcome = enumerate(&directory, &CountingThrottle::default(), "q").await;
        assert!(outcome.is_degraded());
        assert!(outcome.value().is_empty());
    }
}
