//! Shared types, error model, and configuration for OrgScout.
//!
//! This crate is the foundation depended on by all other OrgScout crates.
//! It provides:
//! - [`OrgScoutError`]: the unified error type
//! - Domain types ([`Organization`], [`Page`], [`PlaceRecord`], [`OrgId`])
//! - [`Outcome`]: success vs. degraded results for best-effort steps
//! - [`Throttle`]: the injected inter-request delay
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod outcome;
pub mod throttle;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlSettings, DefaultsConfig, DirectoryConfig, RankingConfig,
    config_dir, config_file_path, expand_home, init_config, load_config, load_config_from,
    validate_api_key,
};
pub use error::{OrgScoutError, Result};
pub use outcome::Outcome;
pub use throttle::{FixedInterval, NoDelay, Throttle};
pub use types::{Address, OrgId, Organization, Page, PlaceRecord};
