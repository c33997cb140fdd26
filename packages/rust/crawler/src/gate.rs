//! Fetch-or-reuse gate: a `(org, url)` pair is fetched at most once.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};
use url::Url;

use orgscout_shared::{OrgId, Page, Result};
use orgscout_storage::{DocumentStore, NewPage};

use crate::fetcher::PageFetcher;
use crate::frontier::extract_frontier;

/// Result of passing a URL through the [`PageGate`].
#[derive(Debug, Clone)]
pub enum GateOutcome {
    /// A page for this organization and URL already existed.
    Cached(Page),
    /// The page was fetched, normalized, and persisted just now.
    Fetched(Page),
    /// Retrieval failed; nothing was persisted.
    Failed { url: String, reason: String },
}

impl GateOutcome {
    pub fn page(&self) -> Option<&Page> {
        match self {
            Self::Cached(page) | Self::Fetched(page) => Some(page),
            Self::Failed { .. } => None,
        }
    }

    pub fn into_page(self) -> Option<Page> {
        match self {
            Self::Cached(page) | Self::Fetched(page) => Some(page),
            Self::Failed { .. } => None,
        }
    }
}

/// Consults the store before going to the network.
#[derive(Clone)]
pub struct PageGate {
    store: Arc<dyn DocumentStore>,
    fetcher: Arc<dyn PageFetcher>,
}

impl PageGate {
    pub fn new(store: Arc<dyn DocumentStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Return the stored page for `(org_id, url)`, fetching it on a miss.
    ///
    /// A fetch failure yields [`GateOutcome::Failed`]; only store errors are
    /// returned as `Err`.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn get_or_fetch(&self, org_id: &OrgId, url: &str) -> Result<GateOutcome> {
        if let Some(page) = self.store.find_page(org_id, url).await? {
            debug!("page already stored");
            return Ok(GateOutcome::Cached(page));
        }

        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "fetch failed");
                return Ok(GateOutcome::Failed {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let urls = extract_frontier(&html, url);
        let normalized = orgscout_markdown::normalize(&html, Url::parse(url).ok().as_ref());
        if let Some(reason) = normalized.reason() {
            warn!(reason, "content normalization degraded");
        }

        let new_page = NewPage {
            org_id: org_id.clone(),
            url: url.to_string(),
            content_hash: compute_hash(&html),
            content: normalized.into_value(),
            html,
            urls,
        };

        match self.store.create_page(&new_page).await {
            Ok(page) => {
                debug!(frontier = page.urls.len(), "page stored");
                Ok(GateOutcome::Fetched(page))
            }
            // Another writer stored the same page first.
            Err(e) if e.is_conflict() => match self.store.find_page(org_id, url).await? {
                Some(page) => Ok(GateOutcome::Cached(page)),
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

/// SHA-256 of the raw markup, hex encoded.
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use orgscout_shared::OrgScoutError;
    use orgscout_storage::{NewOrganization, Storage};
    use uuid::Uuid;

    /// Serves canned bodies and counts calls per URL.
    #[derive(Default)]
    pub(crate) struct ScriptedFetcher {
        pages: HashMap<String, String>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        pub(crate) fn with(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| OrgScoutError::Network(format!("{url}: HTTP 404 Not Found")))
        }
    }

    pub(crate) async fn store_with_org() -> (Arc<Storage>, OrgId) {
        let tmp = std::env::temp_dir().join(format!("orgscout_crawler_{}.db", Uuid::now_v7()));
        let storage = Storage::open(&tmp).await.expect("open test db");
        let org = storage
            .create_organization(&NewOrganization {
                name: "Pastor Serve".into(),
                website_url: Some("https://pastorserve.org/".into()),
                ..Default::default()
            })
            .await
            .expect("create org");
        (Arc::new(storage), org.id)
    }

    const HOME: &str = "https://pastorserve.org/";
    const HOME_HTML: &str = r#"<html><body>
        <h1>Pastor Serve</h1>
        <p>Caring for pastors.</p>
        <a href="/about">About</a>
        <a href="/about#team">Team</a>
        <a href="https://twitter.com/pastorserve">Twitter</a>
    </body></html>"#;

    #[tokio::test]
    async fn fetches_once_then_reuses() {
        let (store, org_id) = store_with_org().await;
        let fetcher = Arc::new(ScriptedFetcher::default().with(HOME, HOME_HTML));
        let gate = PageGate::new(store.clone(), fetcher.clone());

        let first = gate.get_or_fetch(&org_id, HOME).await.unwrap();
        let second = gate.get_or_fetch(&org_id, HOME).await.unwrap();

        assert!(matches!(first, GateOutcome::Fetched(_)));
        assert!(matches!(second, GateOutcome::Cached(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.page().unwrap().id, second.page().unwrap().id);
        assert_eq!(store.list_pages(&org_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stored_page_carries_content_frontier_and_hash() {
        let (store, org_id) = store_with_org().await;
        let fetcher = Arc::new(ScriptedFetcher::default().with(HOME, HOME_HTML));
        let gate = PageGate::new(store, fetcher);

        let page = gate
            .get_or_fetch(&org_id, HOME)
            .await
            .unwrap()
            .into_page()
            .unwrap();

        assert_eq!(page.html, HOME_HTML);
        assert!(page.content.contains("# Pastor Serve"));
        assert!(!page.content.contains("<p>"));
        assert_eq!(page.urls, vec!["https://pastorserve.org/about"]);
        assert_eq!(page.content_hash, compute_hash(HOME_HTML));
    }

    #[tokio::test]
    async fn failed_fetch_persists_nothing() {
        let (store, org_id) = store_with_org().await;
        let gate = PageGate::new(store.clone(), Arc::new(ScriptedFetcher::default()));

        let outcome = gate.get_or_fetch(&org_id, HOME).await.unwrap();
        match outcome {
            GateOutcome::Failed { url, reason } => {
                assert_eq!(url, HOME);
                assert!(reason.contains("404"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(store.find_page(&org_id, HOME).await.unwrap().is_none());
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            compute_hash("hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
