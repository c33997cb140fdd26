//! OrgScout CLI: discover organizations and ingest their websites.
//!
//! Creates organizations from a website URL or a directory search, crawls a
//! bounded set of pages per site and stores the aggregated content locally.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
