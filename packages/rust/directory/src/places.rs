//! Google Places-compatible directory client.
//!
//! Uses the Text Search endpoint (`/textsearch/json`) for enumeration and the
//! Details endpoint (`/details/json`) for per-place records. The base URL is
//! configurable so tests can point at a mock server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use orgscout_shared::{DirectoryConfig, OrgScoutError, PlaceRecord, Result, validate_api_key};

use crate::{DirectoryDetails, DirectoryPage, DirectorySearch};

/// Fields requested from the details endpoint.
const DETAIL_FIELDS: &str = "place_id,name,formatted_address,website,rating";

const USER_AGENT: &str = concat!("OrgScout/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    result: Option<PlaceResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    #[serde(default)]
    place_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
}

impl PlaceResult {
    /// Results without an id cannot be tracked and are dropped.
    fn into_record(self, fallback_id: Option<&str>) -> Option<PlaceRecord> {
        let place_id = self.place_id.or_else(|| fallback_id.map(String::from))?;
        Some(PlaceRecord {
            place_id,
            name: self.name.unwrap_or_default(),
            formatted_address: self.formatted_address,
            website: self.website.filter(|w| !w.trim().is_empty()),
            rating: self.rating,
        })
    }
}

/// Directory client speaking the Places JSON API.
#[derive(Debug, Clone)]
pub struct PlacesClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PlacesClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| OrgScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from config, reading the key from its env var.
    pub fn from_config(config: &DirectoryConfig, timeout: Duration) -> Result<Self> {
        let api_key = validate_api_key(&config.api_key_env)?;
        Self::new(&config.base_url, api_key, timeout)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| OrgScoutError::Directory(format!("{endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrgScoutError::Directory(format!("{endpoint}: HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| OrgScoutError::parse(format!("{endpoint}: invalid response: {e}")))
    }
}

/// `OK` and `ZERO_RESULTS` are the only non-error statuses.
fn check_status(status: &str, message: Option<String>) -> Result<()> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => Err(OrgScoutError::Directory(match message {
            Some(m) => format!("{other}: {m}"),
            None => other.to_string(),
        })),
    }
}

#[async_trait]
impl DirectorySearch for PlacesClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, page_token: Option<&str>) -> Result<DirectoryPage> {
        let response: SearchResponse = match page_token {
            Some(token) => {
                self.get_json("textsearch/json", &[("query", query), ("pagetoken", token)])
                    .await?
            }
            None => self.get_json("textsearch/json", &[("query", query)]).await?,
        };
        check_status(&response.status, response.error_message)?;

        let records: Vec<PlaceRecord> = response
            .results
            .into_iter()
            .filter_map(|r| r.into_record(None))
            .collect();
        debug!(records = records.len(), has_next = response.next_page_token.is_some(), "search page");

        Ok(DirectoryPage {
            records,
            next_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }
}

#[async_trait]
impl DirectoryDetails for PlacesClient {
    #[instrument(skip(self))]
    async fn details(&self, place_id: &str) -> Result<PlaceRecord> {
        let response: DetailsResponse = self
            .get_json("details/json", &[("place_id", place_id), ("fields", DETAIL_FIELDS)])
            .await?;
        check_status(&response.status, response.error_message)?;

        response
            .result
            .and_then(|r| r.into_record(Some(place_id)))
            .ok_or_else(|| OrgScoutError::Directory(format!("no details for place {place_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PlacesClient {
        PlacesClient::new(server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn search_parses_records_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .and(query_param("query", "churches in Minneapolis"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [
                    {"place_id": "p1", "name": "First Church", "formatted_address": "1 Main St, Minneapolis, MN 55401, USA", "rating": 4.6},
                    {"name": "No id, dropped"},
                ],
                "next_page_token": "T1"
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .search("churches in Minneapolis", None)
            .await
            .unwrap();

        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].place_id, "p1");
        assert_eq!(page.records[0].rating, Some(4.6));
        assert_eq!(page.next_token.as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn search_sends_page_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .and(query_param("pagetoken", "T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{"place_id": "p2", "name": "Second Church"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server).search("churches", Some("T1")).await.unwrap();
        assert_eq!(page.records[0].name, "Second Church");
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn zero_results_is_empty_page() {
        let server = MockServer::start().await;
        Mock::given(path("/textsearch/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "ZERO_RESULTS", "results": []})),
            )
            .mount(&server)
            .await;

        let page = client(&server).search("nothing here", None).await.unwrap();
        assert!(page.records.is_empty());
    }

    #[tokio::test]
    async fn error_status_is_directory_error() {
        let server = MockServer::start().await;
        Mock::given(path("/textsearch/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            })))
            .mount(&server)
            .await;

        let err = client(&server).search("x", None).await.unwrap_err();
        assert!(matches!(err, OrgScoutError::Directory(ref m) if m.contains("REQUEST_DENIED")));
    }

    #[tokio::test]
    async fn details_returns_website() {
        let server = MockServer::start().await;
        Mock::given(path("/details/json"))
            .and(query_param("place_id", "p1"))
            .and(query_param("fields", DETAIL_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "result": {
                    "name": "First Church",
                    "formatted_address": "1 Main St, Minneapolis, MN 55401, USA",
                    "website": "https://firstchurch.example/",
                    "rating": 4.7
                }
            })))
            .mount(&server)
            .await;

        let record = client(&server).details("p1").await.unwrap();
        assert_eq!(record.place_id, "p1");
        assert_eq!(record.website.as_deref(), Some("https://firstchurch.example/"));
    }

    #[tokio::test]
    async fn details_without_name_yields_empty_name() {
        let server = MockServer::start().await;
        Mock::given(path("/details/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "result": {"rating": 4.2}
            })))
            .mount(&server)
            .await;

        let record = client(&server).details("p1").await.unwrap();
        assert_eq!(record.name, "");
        assert_eq!(record.rating, Some(4.2));
    }

    #[tokio::test]
    async fn slow_directory_times_out() {
        let server = MockServer::start().await;
        Mock::given(path("/textsearch/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "OK", "results": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let places =
            PlacesClient::new(server.uri(), "test-key", Duration::from_millis(200)).unwrap();
        let err = places.search("x", None).await.unwrap_err();
        assert!(matches!(err, OrgScoutError::Directory(_)));
    }

    #[tokio::test]
    async fn details_http_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(path("/details/json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(client(&server).details("p1").await.is_err());
    }
}
