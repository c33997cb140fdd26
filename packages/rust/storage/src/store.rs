//! The document store interface the pipeline is written against.

use async_trait::async_trait;

use orgscout_shared::{OrgId, Organization, Page, Result};

/// How to look up an organization.
#[derive(Debug, Clone, Copy)]
pub enum OrgLookup<'a> {
    Id(&'a OrgId),
    WebsiteUrl(&'a str),
    DirectoryId(&'a str),
}

/// Fields for a new organization row.
#[derive(Debug, Clone, Default)]
pub struct NewOrganization {
    pub name: String,
    pub website_url: Option<String>,
    pub directory_id: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub rating: Option<f64>,
    pub org_type: Option<String>,
}

/// A partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct OrganizationUpdate {
    pub name: Option<String>,
    pub website_url: Option<String>,
    pub directory_id: Option<String>,
    pub rating: Option<f64>,
    pub org_type: Option<String>,
    pub website_content: Option<String>,
    pub urls_to_fetch: Option<Vec<String>>,
}

/// Fields for a new page row.
#[derive(Debug, Clone)]
pub struct NewPage {
    pub org_id: OrgId,
    pub url: String,
    pub html: String,
    pub content: String,
    pub urls: Vec<String>,
    pub content_hash: String,
}

/// Persistence for organizations and their fetched pages.
///
/// `create_*` methods return [`OrgScoutError::Conflict`] when a uniqueness
/// constraint rejects the row, so callers can re-read instead of failing.
///
/// [`OrgScoutError::Conflict`]: orgscout_shared::OrgScoutError::Conflict
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_organization(&self, lookup: OrgLookup<'_>) -> Result<Option<Organization>>;

    async fn create_organization(&self, org: &NewOrganization) -> Result<Organization>;

    /// Apply `update` and return the stored row afterwards.
    async fn update_organization(&self, id: &OrgId, update: &OrganizationUpdate)
    -> Result<Organization>;

    async fn list_organizations(&self) -> Result<Vec<Organization>>;

    async fn find_page(&self, org_id: &OrgId, url: &str) -> Result<Option<Page>>;

    async fn create_page(&self, page: &NewPage) -> Result<Page>;

    /// Pages for one organization, oldest first.
    async fn list_pages(&self, org_id: &OrgId) -> Result<Vec<Page>>;
}
