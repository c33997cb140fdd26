//! Organization resolution: find-or-create by website URL or directory id.
//!
//! `resolve_by_url` is the only entry point that crawls. It fetches the
//! homepage without delay, selects a page budget from the homepage frontier,
//! persists the selection, runs the throttled fetch loop and stores the
//! aggregated content. Directory records only create or refresh rows.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;

use orgscout_crawler::{FetchLoop, GateOutcome, PageFetcher, PageGate, ProgressReporter};
use orgscout_shared::{
    Address, CrawlConfig, OrgScoutError, Organization, PlaceRecord, Result, Throttle,
};
use orgscout_storage::{DocumentStore, NewOrganization, OrgLookup, OrganizationUpdate};

use crate::address::{AddressParser, CommaSplitParser};
use crate::budget::select_budget;
use crate::oracle::RankingOracle;

/// Separator placed between the content of consecutive pages.
const CONTENT_SEPARATOR: &str = "\n\n";

/// An organization together with whether this call created it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub organization: Organization,
    pub created: bool,
}

impl Resolved {
    fn created(organization: Organization) -> Self {
        Self {
            organization,
            created: true,
        }
    }

    fn existing(organization: Organization) -> Self {
        Self {
            organization,
            created: false,
        }
    }
}

/// Find-or-create pipeline over an injected store, fetcher and oracle.
pub struct Resolver {
    store: Arc<dyn DocumentStore>,
    gate: PageGate,
    fetch_loop: FetchLoop,
    oracle: Arc<dyn RankingOracle>,
    address_parser: Arc<dyn AddressParser>,
    config: CrawlConfig,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        fetcher: Arc<dyn PageFetcher>,
        oracle: Arc<dyn RankingOracle>,
        throttle: Arc<dyn Throttle>,
        config: CrawlConfig,
    ) -> Self {
        let gate = PageGate::new(store.clone(), fetcher);
        Self {
            fetch_loop: FetchLoop::new(gate.clone(), throttle),
            store,
            gate,
            oracle,
            address_parser: Arc::new(CommaSplitParser),
            config,
        }
    }

    /// Replace the default comma-split address parser.
    pub fn with_address_parser(mut self, parser: Arc<dyn AddressParser>) -> Self {
        self.address_parser = parser;
        self
    }

    /// Find the organization with this website, or create and crawl it.
    ///
    /// An existing organization is returned as stored and never re-crawled.
    /// Crawl failures are absorbed: an organization without content is a
    /// valid result. Store failures propagate.
    #[instrument(skip(self, progress))]
    pub async fn resolve_by_url(
        &self,
        name: &str,
        url: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<Resolved> {
        let seed = canonical_seed(url)?;
        let url = seed.as_str();

        if let Some(existing) = self.store.find_organization(OrgLookup::WebsiteUrl(url)).await? {
            debug!(org_id = %existing.id, "organization already known");
            return Ok(Resolved::existing(existing));
        }

        let new_org = NewOrganization {
            name: name.to_string(),
            website_url: Some(url.to_string()),
            ..Default::default()
        };
        let org = match self.store.create_organization(&new_org).await {
            Ok(org) => org,
            Err(e) if e.is_conflict() => {
                return self
                    .store
                    .find_organization(OrgLookup::WebsiteUrl(url))
                    .await?
                    .map(Resolved::existing)
                    .ok_or(e);
            }
            Err(e) => return Err(e),
        };
        info!(org_id = %org.id, "organization created");

        progress.phase("Fetching homepage");
        let homepage = self.gate.get_or_fetch(&org.id, url).await?;
        let frontier = match &homepage {
            GateOutcome::Failed { reason, .. } => {
                warn!(reason = %reason, "homepage unavailable, nothing to select");
                Vec::new()
            }
            other => other.page().map(|p| p.urls.clone()).unwrap_or_default(),
        };

        progress.phase("Selecting pages");
        let selection = select_budget(self.oracle.as_ref(), &frontier, self.config.page_budget).await;
        if let Some(reason) = selection.reason() {
            warn!(reason, "page selection degraded");
        }
        let budget = selection.into_value();
        info!(frontier = frontier.len(), budget = budget.len(), "page budget selected");

        let mut org = self
            .store
            .update_organization(
                &org.id,
                &OrganizationUpdate {
                    urls_to_fetch: Some(budget.clone()),
                    ..Default::default()
                },
            )
            .await?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut parts: Vec<String> = Vec::new();
        if let Some(page) = homepage.into_page() {
            seen.insert(page.url.clone());
            if !page.content.trim().is_empty() {
                parts.push(page.content);
            }
        }

        if !budget.is_empty() {
            progress.phase("Fetching pages");
            let report = self.fetch_loop.run(&org.id, &budget, progress).await?;
            for page in report.pages {
                if seen.insert(page.url.clone()) && !page.content.trim().is_empty() {
                    parts.push(page.content);
                }
            }
        }

        if !parts.is_empty() {
            org = self
                .store
                .update_organization(
                    &org.id,
                    &OrganizationUpdate {
                        website_content: Some(parts.join(CONTENT_SEPARATOR)),
                        ..Default::default()
                    },
                )
                .await?;
        }

        info!(org_id = %org.id, pages = parts.len(), "organization resolved");
        Ok(Resolved::created(org))
    }

    /// Find-or-create from a directory record, refreshing known rows.
    ///
    /// Lookup order is directory id, then website. Nothing is crawled.
    #[instrument(skip(self, record), fields(place_id = %record.place_id))]
    pub async fn resolve_by_directory_record(
        &self,
        record: &PlaceRecord,
        org_type: Option<&str>,
    ) -> Result<Resolved> {
        if let Some(existing) = self.find_for_record(record).await? {
            return self.refresh(&existing, record, org_type).await.map(Resolved::existing);
        }

        let address = match record.formatted_address.as_deref() {
            Some(formatted) => {
                let parsed = self.address_parser.parse(formatted);
                if let Some(reason) = parsed.reason() {
                    warn!(reason, "address only partially parsed");
                }
                parsed.into_value()
            }
            None => Address::default(),
        };

        let new_org = NewOrganization {
            name: record.name.clone(),
            website_url: record.website.clone(),
            directory_id: Some(record.place_id.clone()),
            street: address.street,
            city: address.city,
            state: address.state,
            zip: address.zip,
            rating: record.rating,
            org_type: org_type.map(String::from),
        };

        match self.store.create_organization(&new_org).await {
            Ok(org) => {
                info!(org_id = %org.id, "organization created from directory");
                Ok(Resolved::created(org))
            }
            Err(e) if e.is_conflict() => match self.find_for_record(record).await? {
                Some(existing) => self.refresh(&existing, record, org_type).await.map(Resolved::existing),
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    async fn find_for_record(&self, record: &PlaceRecord) -> Result<Option<Organization>> {
        if let Some(org) = self
            .store
            .find_organization(OrgLookup::DirectoryId(&record.place_id))
            .await?
        {
            return Ok(Some(org));
        }
        match record.website.as_deref() {
            Some(website) => self.store.find_organization(OrgLookup::WebsiteUrl(website)).await,
            None => Ok(None),
        }
    }

    async fn refresh(
        &self,
        existing: &Organization,
        record: &PlaceRecord,
        org_type: Option<&str>,
    ) -> Result<Organization> {
        let update = OrganizationUpdate {
            name: (!record.name.trim().is_empty()).then(|| record.name.clone()),
            website_url: record.website.clone(),
            directory_id: existing
                .directory_id
                .is_none()
                .then(|| record.place_id.clone()),
            rating: record.rating,
            org_type: org_type.map(String::from),
            ..Default::default()
        };
        debug!(org_id = %existing.id, "refreshing organization from directory");
        self.store.update_organization(&existing.id, &update).await
    }
}

/// Seeds must be absolute HTTP(S) URLs. Returns the serialized form so the
/// seed matches links the frontier resolves back to it.
fn canonical_seed(url: &str) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|e| OrgScoutError::validation(format!("invalid website URL `{url}`: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.into()),
        scheme => Err(OrgScoutError::validation(format!(
            "unsupported URL scheme `{scheme}` in `{url}`"
        ))),
    }
}
