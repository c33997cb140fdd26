//! libSQL storage layer for organizations and fetched pages.
//!
//! The [`Storage`] struct wraps a local libSQL database and implements
//! [`DocumentStore`], the interface the crawl pipeline is written against.
//! Identity keys (`organizations.website_url`, `organizations.directory_id`,
//! `pages(org_id, url)`) carry `UNIQUE` constraints; violations surface as
//! [`OrgScoutError::Conflict`].

mod migrations;
mod store;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::params::IntoParams;
use libsql::{Connection, Database, params};
use uuid::Uuid;

use orgscout_shared::{OrgId, OrgScoutError, Organization, Page, Result};

pub use store::{DocumentStore, NewOrganization, NewPage, OrgLookup, OrganizationUpdate};

const ORG_COLUMNS: &str = "id, name, website_url, directory_id, street, city, state, zip, rating, \
     org_type, website_content, urls_to_fetch, created_at, updated_at";

const PAGE_COLUMNS: &str = "id, org_id, url, html, content, urls_json, content_hash, fetched_at";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| OrgScoutError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| OrgScoutError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| OrgScoutError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    OrgScoutError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    async fn query_organizations(
        &self,
        filter: &str,
        params: impl IntoParams,
    ) -> Result<Vec<Organization>> {
        let sql = format!("SELECT {ORG_COLUMNS} FROM organizations {filter}");
        let mut rows = self
            .conn
            .query(&sql, params)
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_organization(&row)?);
        }
        Ok(results)
    }
}

#[async_trait]
impl DocumentStore for Storage {
    async fn find_organization(&self, lookup: OrgLookup<'_>) -> Result<Option<Organization>> {
        let (filter, value) = match lookup {
            OrgLookup::Id(id) => ("WHERE id = ?1", id.to_string()),
            OrgLookup::WebsiteUrl(url) => ("WHERE website_url = ?1", url.to_string()),
            OrgLookup::DirectoryId(place_id) => ("WHERE directory_id = ?1", place_id.to_string()),
        };

        let mut found = self
            .query_organizations(&format!("{filter} LIMIT 1"), params![value])
            .await?;
        Ok(found.pop())
    }

    async fn create_organization(&self, org: &NewOrganization) -> Result<Organization> {
        let id = OrgId::new();
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO organizations (id, name, website_url, directory_id, street, city, state, zip,
                                            rating, org_type, urls_to_fetch, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, '[]', ?11, ?12)",
                params![
                    id.to_string(),
                    org.name.as_str(),
                    org.website_url.as_deref(),
                    org.directory_id.as_deref(),
                    org.street.as_deref(),
                    org.city.as_deref(),
                    org.state.as_deref(),
                    org.zip.as_deref(),
                    org.rating,
                    org.org_type.as_deref(),
                    now_str.as_str(),
                    now_str.as_str(),
                ],
            )
            .await
            .map_err(write_err)?;

        tracing::debug!(org_id = %id, name = %org.name, "organization created");

        Ok(Organization {
            id,
            name: org.name.clone(),
            website_url: org.website_url.clone(),
            directory_id: org.directory_id.clone(),
            street: org.street.clone(),
            city: org.city.clone(),
            state: org.state.clone(),
            zip: org.zip.clone(),
            rating: org.rating,
            org_type: org.org_type.clone(),
            website_content: None,
            urls_to_fetch: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_organization(
        &self,
        id: &OrgId,
        update: &OrganizationUpdate,
    ) -> Result<Organization> {
        let urls_json = update
            .urls_to_fetch
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| OrgScoutError::Storage(format!("failed to encode urls: {e}")))?;
        let now = Utc::now().to_rfc3339();

        let changed = self
            .conn
            .execute(
                "UPDATE organizations SET
                   name            = COALESCE(?1, name),
                   website_url     = COALESCE(?2, website_url),
                   directory_id    = COALESCE(?3, directory_id),
                   rating          = COALESCE(?4, rating),
                   org_type        = COALESCE(?5, org_type),
                   website_content = COALESCE(?6, website_content),
                   urls_to_fetch   = COALESCE(?7, urls_to_fetch),
                   updated_at      = ?8
                 WHERE id = ?9",
                params![
                    update.name.as_deref(),
                    update.website_url.as_deref(),
                    update.directory_id.as_deref(),
                    update.rating,
                    update.org_type.as_deref(),
                    update.website_content.as_deref(),
                    urls_json.as_deref(),
                    now.as_str(),
                    id.to_string(),
                ],
            )
            .await
            .map_err(write_err)?;

        if changed == 0 {
            return Err(OrgScoutError::validation(format!(
                "organization {id} does not exist"
            )));
        }

        self.find_organization(OrgLookup::Id(id))
            .await?
            .ok_or_else(|| OrgScoutError::Storage(format!("organization {id} vanished after update")))
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.query_organizations("ORDER BY name", params![]).await
    }

    async fn find_page(&self, org_id: &OrgId, url: &str) -> Result<Option<Page>> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages WHERE org_id = ?1 AND url = ?2");
        let mut rows = self
            .conn
            .query(&sql, params![org_id.to_string(), url])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(row_to_page(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_page(&self, page: &NewPage) -> Result<Page> {
        let id = Uuid::now_v7().to_string();
        let fetched_at = Utc::now();
        let urls_json = serde_json::to_string(&page.urls)
            .map_err(|e| OrgScoutError::Storage(format!("failed to encode urls: {e}")))?;

        self.conn
            .execute(
                "INSERT INTO pages (id, org_id, url, html, content, urls_json, content_hash, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.as_str(),
                    page.org_id.to_string(),
                    page.url.as_str(),
                    page.html.as_str(),
                    page.content.as_str(),
                    urls_json.as_str(),
                    page.content_hash.as_str(),
                    fetched_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(write_err)?;

        Ok(Page {
            id,
            org_id: page.org_id.clone(),
            url: page.url.clone(),
            html: page.html.clone(),
            content: page.content.clone(),
            urls: page.urls.clone(),
            content_hash: page.content_hash.clone(),
            fetched_at,
        })
    }

    async fn list_pages(&self, org_id: &OrgId) -> Result<Vec<Page>> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages WHERE org_id = ?1 ORDER BY rowid");
        let mut rows = self
            .conn
            .query(&sql, params![org_id.to_string()])
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_page(&row)?);
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn storage_err(e: libsql::Error) -> OrgScoutError {
    OrgScoutError::Storage(e.to_string())
}

/// Map write errors, singling out uniqueness violations.
fn write_err(e: libsql::Error) -> OrgScoutError {
    let message = e.to_string();
    if message.contains("UNIQUE constraint failed") {
        OrgScoutError::Conflict(message)
    } else {
        OrgScoutError::Storage(message)
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OrgScoutError::Storage(format!("invalid date: {e}")))
}

fn parse_url_list(json: &str) -> Result<Vec<String>> {
    serde_json::from_str(json)
        .map_err(|e| OrgScoutError::Storage(format!("invalid url list: {e}")))
}

/// Convert a database row to an [`Organization`].
fn row_to_organization(row: &libsql::Row) -> Result<Organization> {
    let id: String = row.get(0).map_err(storage_err)?;
    let created_at: String = row.get(12).map_err(storage_err)?;
    let updated_at: String = row.get(13).map_err(storage_err)?;
    let urls_to_fetch: String = row.get(11).map_err(storage_err)?;

    Ok(Organization {
        id: id
            .parse()
            .map_err(|e| OrgScoutError::Storage(format!("invalid organization id {id}: {e}")))?,
        name: row.get::<String>(1).map_err(storage_err)?,
        website_url: row.get::<String>(2).ok(),
        directory_id: row.get::<String>(3).ok(),
        street: row.get::<String>(4).ok(),
        city: row.get::<String>(5).ok(),
        state: row.get::<String>(6).ok(),
        zip: row.get::<String>(7).ok(),
        rating: row.get::<f64>(8).ok(),
        org_type: row.get::<String>(9).ok(),
        website_content: row.get::<String>(10).ok(),
        urls_to_fetch: parse_url_list(&urls_to_fetch)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Convert a database row to a [`Page`].
fn row_to_page(row: &libsql::Row) -> Result<Page> {
    let org_id: String = row.get(1).map_err(storage_err)?;
    let urls_json: String = row.get(5).map_err(storage_err)?;
    let fetched_at: String = row.get(7).map_err(storage_err)?;

    Ok(Page {
        id: row.get::<String>(0).map_err(storage_err)?,
        org_id: org_id
            .parse()
            .map_err(|e| OrgScoutError::Storage(format!("invalid organization id {org_id}: {e}")))?,
        url: row.get::<String>(2).map_err(storage_err)?,
        html: row.get::<String>(3).map_err(storage_err)?,
        content: row.get::<String>(4).map_err(storage_err)?,
        urls: parse_url_list(&urls_json)?,
        content_hash: row.get::<String>(6).map_err(storage_err)?,
        fetched_at: parse_timestamp(&fetched_at)?,
    })
}
