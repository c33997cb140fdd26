//! Core domain types for OrgScout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// OrgId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for organization identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(pub Uuid);

impl OrgId {
    /// Generate a new time-sortable organization identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OrgId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrgId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Organization
// ---------------------------------------------------------------------------

/// A reconciled business or nonprofit record.
///
/// Identified by either `website_url` or `directory_id`; both are unique
/// when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    /// Canonical website URL, exactly as first submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    /// External directory (place) identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Caller-supplied category (e.g. "nonprofit", "church").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_type: Option<String>,
    /// All fetched page content joined into one document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_content: Option<String>,
    /// URLs chosen by the budget selector, kept for auditability.
    #[serde(default)]
    pub urls_to_fetch: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// One fetched page for one organization. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub org_id: OrgId,
    pub url: String,
    /// Raw markup as returned by the fetcher.
    pub html: String,
    /// Normalized markdown-like content.
    pub content: String,
    /// Frontier discovered on this page.
    pub urls: Vec<String>,
    /// SHA-256 of the raw markup.
    pub content_hash: String,
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Directory records
// ---------------------------------------------------------------------------

/// A place returned by the external directory (search result or details).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub place_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// A postal address split into its stored parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_id_roundtrip() {
        let id = OrgId::new();
        let s = id.to_string();
        let parsed: OrgId = s.parse().expect("parse OrgId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn organization_serialization_skips_empty_fields() {
        let org = Organization {
            id: OrgId::new(),
            name: "Loaves & Fishes".into(),
            website_url: Some("https://loavesandfishesmn.org".into()),
            directory_id: None,
            street: None,
            city: None,
            state: None,
            zip: None,
            rating: None,
            org_type: None,
            website_content: None,
            urls_to_fetch: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&org).expect("serialize");
        assert!(json.contains("website_url"));
        assert!(!json.contains("directory_id"));

        let parsed: Organization = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.name, "Loaves & Fishes");
    }

    #[test]
    fn place_record_accepts_missing_optionals() {
        let parsed: PlaceRecord =
            serde_json::from_str(r#"{"place_id": "abc", "name": "Food Shelf"}"#)
                .expect("deserialize");
        assert_eq!(parsed.place_id, "abc");
        assert!(parsed.website.is_none());
    }
}
