//! SQL migration definitions for the OrgScout database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: organizations, pages",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Reconciled organizations. Either identity key may be NULL; SQLite lets
-- several NULLs coexist under UNIQUE.
CREATE TABLE IF NOT EXISTS organizations (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    website_url       TEXT UNIQUE,
    directory_id      TEXT UNIQUE,
    street            TEXT,
    city              TEXT,
    state             TEXT,
    zip               TEXT,
    rating            REAL,
    org_type          TEXT,
    website_content   TEXT,
    urls_to_fetch     TEXT NOT NULL DEFAULT '[]',
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

-- One fetched page per (organization, url)
CREATE TABLE IF NOT EXISTS pages (
    id           TEXT PRIMARY KEY,
    org_id       TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    url          TEXT NOT NULL,
    html         TEXT NOT NULL,
    content      TEXT NOT NULL,
    urls_json    TEXT NOT NULL DEFAULT '[]',
    content_hash TEXT NOT NULL,
    fetched_at   TEXT NOT NULL,
    UNIQUE(org_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_org_id ON pages(org_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
