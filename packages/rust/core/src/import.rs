//! Directory import: search, enrich each hit with details, resolve.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use orgscout_crawler::ProgressReporter;
use orgscout_directory::{DirectoryDetails, DirectorySearch, enumerate};
use orgscout_shared::{Result, Throttle};

use crate::resolver::Resolver;

/// Outcome of one directory import.
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    /// Records returned by the search.
    pub found: usize,
    pub created: usize,
    pub updated: usize,
    /// Records whose details lookup failed and fell back to the search hit.
    pub details_missing: usize,
    /// Set when enumeration stopped early.
    pub incomplete: Option<String>,
    pub duration: Duration,
}

/// Import every directory record matching `query`.
///
/// Enumeration and details failures are absorbed into the summary; store
/// failures abort the import.
#[instrument(skip(search, details, throttle, resolver, progress))]
pub async fn import_directory(
    search: &dyn DirectorySearch,
    details: &dyn DirectoryDetails,
    throttle: &dyn Throttle,
    resolver: &Resolver,
    query: &str,
    org_type: Option<&str>,
    progress: &dyn ProgressReporter,
) -> Result<ImportSummary> {
    let start = Instant::now();

    progress.phase("Searching directory");
    let enumerated = enumerate(search, throttle, query).await;
    let mut summary = ImportSummary {
        incomplete: enumerated.reason().map(String::from),
        ..Default::default()
    };
    let records = enumerated.into_value();
    summary.found = records.len();

    progress.phase("Importing organizations");
    for (i, hit) in records.iter().enumerate() {
        progress.page_fetched(&hit.name, i + 1, records.len());

        let record = match details.details(&hit.place_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(place_id = %hit.place_id, error = %e, "details lookup failed, using search record");
                summary.details_missing += 1;
                hit.clone()
            }
        };

        let resolved = resolver.resolve_by_directory_record(&record, org_type).await?;
        if resolved.created {
            summary.created += 1;
        } else {
            summary.updated += 1;
        }
    }

    summary.duration = start.elapsed();
    info!(
        found = summary.found,
        created = summary.created,
        updated = summary.updated,
        details_missing = summary.details_missing,
        "directory import complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use orgscout_crawler::SilentProgress;
    use orgscout_directory::DirectoryPage;
    use orgscout_shared::{NoDelay, OrgScoutError, PlaceRecord};
    use orgscout_storage::DocumentStore;

    use crate::budget::tests::ScriptedOracle;
    use crate::resolver::tests::{ScriptedFetcher, resolver, temp_store};

    /// One search page plus a details table; missing ids fail.
    struct ScriptedDirectory {
        hits: Vec<PlaceRecord>,
        details: HashMap<String, PlaceRecord>,
    }

    #[async_trait]
    impl DirectorySearch for ScriptedDirectory {
        async fn search(&self, _query: &str, _token: Option<&str>) -> Result<DirectoryPage> {
            Ok(DirectoryPage {
                records: self.hits.clone(),
                next_token: None,
            })
        }
    }

    #[async_trait]
    impl DirectoryDetails for ScriptedDirectory {
        async fn details(&self, place_id: &str) -> Result<PlaceRecord> {
            self.details
                .get(place_id)
                .cloned()
                .ok_or_else(|| OrgScoutError::Directory(format!("NOT_FOUND: {place_id}")))
        }
    }

    fn hit(id: &str, name: &str) -> PlaceRecord {
        PlaceRecord {
            place_id: id.into(),
            name: name.into(),
            formatted_address: Some("1 Main St, Minneapolis, MN 55401, USA".into()),
            website: None,
            rating: Some(4.0),
        }
    }

    #[tokio::test]
    async fn imports_with_details_and_fallback() {
        let store = temp_store().await;
        let r = resolver(
            store.clone(),
            Arc::new(ScriptedFetcher::default()),
            Arc::new(ScriptedOracle::failing()),
            Arc::new(NoDelay),
        );

        let mut detailed = hit("p1", "Hope Food Shelf");
        detailed.website = Some("https://hopefood.example/".into());
        let directory = ScriptedDirectory {
            hits: vec![hit("p1", "Hope Food Shelf"), hit("p2", "Grace Pantry")],
            details: HashMap::from([("p1".to_string(), detailed)]),
        };

        let summary = import_directory(
            &directory,
            &directory,
            &NoDelay,
            &r,
            "food shelves",
            Some("food_shelf"),
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(summary.found, 2);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.details_missing, 1);
        assert!(summary.incomplete.is_none());

        let orgs = store.list_organizations().await.unwrap();
        let hope = orgs.iter().find(|o| o.name == "Hope Food Shelf").unwrap();
        assert_eq!(hope.website_url.as_deref(), Some("https://hopefood.example/"));
        assert_eq!(hope.org_type.as_deref(), Some("food_shelf"));

        // Second import refreshes instead of duplicating.
        let again = import_directory(
            &directory,
            &directory,
            &NoDelay,
            &r,
            "food shelves",
            Some("food_shelf"),
            &SilentProgress,
        )
        .await
        .unwrap();
        assert_eq!(again.created, 0);
        assert_eq!(again.updated, 2);
        assert_eq!(store.list_organizations().await.unwrap().len(), 2);
    }
}
