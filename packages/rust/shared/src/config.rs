//! Application configuration for OrgScout.
//!
//! User config lives at `~/.orgscout/orgscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OrgScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "orgscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".orgscout";

// ---------------------------------------------------------------------------
// Config structs (matching orgscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Page fetching.
    #[serde(default)]
    pub crawl: CrawlSettings,

    /// Ranking oracle (chat completions endpoint).
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Place directory provider.
    #[serde(default)]
    pub directory: DirectoryConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path of the libSQL database file (`~` is expanded).
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Maximum number of additional pages fetched per organization.
    #[serde(default = "default_page_budget")]
    pub page_budget: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            page_budget: default_page_budget(),
        }
    }
}

fn default_db_path() -> String {
    "~/.orgscout/orgscout.db".into()
}
fn default_page_budget() -> usize {
    10
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Fixed pause before each budgeted page fetch.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// HTTP timeout per page fetch.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_request_delay() -> u64 {
    2000
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[ranking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_ranking_key_env")]
    pub api_key_env: String,

    /// Model used to rank frontier URLs.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the chat completions API.
    #[serde(default = "default_ranking_base_url")]
    pub base_url: String,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_ranking_key_env(),
            model: default_model(),
            base_url: default_ranking_base_url(),
        }
    }
}

fn default_ranking_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_ranking_base_url() -> String {
    "https://api.openai.com/v1".into()
}

/// `[directory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Name of the env var holding the directory API key.
    #[serde(default = "default_directory_key_env")]
    pub api_key_env: String,

    /// Base URL of the place search/details API.
    #[serde(default = "default_directory_base_url")]
    pub base_url: String,

    /// Pause before requesting the next result page. Continuation tokens
    /// are not valid until this much time has passed.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_directory_key_env(),
            base_url: default_directory_base_url(),
            page_delay_ms: default_page_delay(),
        }
    }
}

fn default_directory_key_env() -> String {
    "GOOGLE_PLACES_API_KEY".into()
}
fn default_directory_base_url() -> String {
    "https://maps.googleapis.com/maps/api/place".into()
}
fn default_page_delay() -> u64 {
    2000
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Upper bound on the number of selected pages.
    pub page_budget: usize,
    /// Pause before each budgeted fetch.
    pub request_delay: Duration,
    /// HTTP timeout per request.
    pub timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            page_budget: config.defaults.page_budget,
            request_delay: Duration::from_millis(config.crawl.request_delay_ms),
            timeout: Duration::from_secs(config.crawl.timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.orgscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| OrgScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.orgscout/orgscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OrgScoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| OrgScoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OrgScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OrgScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OrgScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| OrgScoutError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Read an API key from the named env var, failing if it is unset or empty.
pub fn validate_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(OrgScoutError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}
