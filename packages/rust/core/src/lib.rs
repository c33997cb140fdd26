//! Orchestration for organization discovery and ingestion.
//!
//! - [`resolver`]: find-or-create organizations by URL or directory record
//! - [`budget`]: choose which discovered pages are worth fetching
//! - [`oracle`]: the ranking oracle used by budget selection
//! - [`address`]: postal address parsing for directory records
//! - [`import`]: bulk import from a directory search

pub mod address;
pub mod budget;
pub mod import;
pub mod oracle;
pub mod resolver;

pub use address::{AddressParser, CommaSplitParser};
pub use budget::{ranking_prompt, select_budget};
pub use import::{ImportSummary, import_directory};
pub use oracle::{ChatCompletionsOracle, RankingOracle};
pub use resolver::{Resolved, Resolver};
