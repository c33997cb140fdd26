//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use orgscout_core::{ChatCompletionsOracle, Resolver, import_directory};
use orgscout_crawler::{HttpFetcher, ProgressReporter};
use orgscout_directory::PlacesClient;
use orgscout_shared::{
    AppConfig, CrawlConfig, FixedInterval, OrgId, Organization, expand_home, init_config,
    load_config,
};
use orgscout_storage::{DocumentStore, OrgLookup, Storage};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// OrgScout: find organizations and collect what their websites say.
#[derive(Parser)]
#[command(
    name = "orgscout",
    version,
    about = "Discover organizations and ingest their websites into a local store.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database file (overrides `defaults.db_path`).
    #[arg(long, global = true, env = "ORGSCOUT_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create an organization from its website and crawl it.
    Add {
        /// Website URL of the organization.
        url: String,

        /// Organization name (defaults to the URL hostname).
        #[arg(short, long)]
        name: Option<String>,

        /// Maximum number of additional pages to fetch.
        #[arg(long)]
        budget: Option<usize>,
    },

    /// Import organizations from a directory search.
    Search {
        /// Free-text query, e.g. "food shelves in Minneapolis".
        query: String,

        /// Category stored on every imported organization.
        #[arg(short = 't', long = "type")]
        org_type: Option<String>,
    },

    /// List all stored organizations.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show one organization with its selected URLs and stored pages.
    Show {
        /// Organization ID.
        id: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "orgscout=info",
        1 => "orgscout=debug",
        _ => "orgscout=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Add { url, name, budget } => cmd_add(db, &url, name.as_deref(), budget).await,
        Command::Search { query, org_type } => cmd_search(db, &query, org_type.as_deref()).await,
        Command::List { json } => cmd_list(db, json).await,
        Command::Show { id } => cmd_show(db, &id).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Open the database named by `--db` or the config.
async fn open_storage(db: Option<PathBuf>, config: &AppConfig) -> Result<Arc<Storage>> {
    let path = match db {
        Some(path) => path,
        None => expand_home(&config.defaults.db_path)?,
    };
    info!(path = %path.display(), "opening database");
    Ok(Arc::new(Storage::open(&path).await?))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_add(
    db: Option<PathBuf>,
    url: &str,
    name: Option<&str>,
    budget: Option<usize>,
) -> Result<()> {
    let config = load_config()?;

    let parsed_url = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    let org_name = name.map(String::from).unwrap_or_else(|| {
        parsed_url.host_str().unwrap_or("unknown").to_string()
    });

    let mut crawl_config = CrawlConfig::from(&config);
    if let Some(budget) = budget {
        crawl_config.page_budget = budget;
    }

    let storage = open_storage(db, &config).await?;
    let fetcher = HttpFetcher::new(crawl_config.timeout)?;
    let oracle = ChatCompletionsOracle::from_config(&config.ranking, crawl_config.timeout)?;
    let throttle = FixedInterval::new(crawl_config.request_delay);
    let resolver = Resolver::new(
        storage.clone(),
        Arc::new(fetcher),
        Arc::new(oracle),
        Arc::new(throttle),
        crawl_config,
    );

    info!(url, name = %org_name, "adding organization");

    let reporter = CliProgress::new();
    let resolved = resolver.resolve_by_url(&org_name, url, &reporter).await?;
    reporter.finish();

    let org = &resolved.organization;
    let pages = storage.list_pages(&org.id).await?;

    println!();
    if resolved.created {
        println!("  Organization created!");
    } else {
        println!("  Organization already known, not re-crawled.");
    }
    println!("  ID:       {}", org.id);
    println!("  Name:     {}", org.name);
    println!("  Selected: {}", org.urls_to_fetch.len());
    println!("  Pages:    {}", pages.len());
    println!(
        "  Content:  {} chars",
        org.website_content.as_deref().map_or(0, str::len)
    );
    println!();

    Ok(())
}

async fn cmd_search(db: Option<PathBuf>, query: &str, org_type: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let crawl_config = CrawlConfig::from(&config);

    let storage = open_storage(db, &config).await?;
    let places = PlacesClient::from_config(&config.directory, crawl_config.timeout)?;
    let page_throttle = FixedInterval::from_millis(config.directory.page_delay_ms);

    // Directory records are never crawled, so the oracle is never asked.
    let oracle = ChatCompletionsOracle::new(
        &config.ranking.base_url,
        String::new(),
        &config.ranking.model,
        crawl_config.timeout,
    )?;
    let resolver = Resolver::new(
        storage,
        Arc::new(HttpFetcher::new(crawl_config.timeout)?),
        Arc::new(oracle),
        Arc::new(FixedInterval::new(crawl_config.request_delay)),
        crawl_config,
    );

    info!(query, org_type = org_type.unwrap_or("-"), "importing from directory");

    let reporter = CliProgress::new();
    let summary = import_directory(
        &places,
        &places,
        &page_throttle,
        &resolver,
        query,
        org_type,
        &reporter,
    )
    .await?;
    reporter.finish();

    println!();
    println!("  Directory import complete!");
    println!("  Found:    {}", summary.found);
    println!("  Created:  {}", summary.created);
    println!("  Updated:  {}", summary.updated);
    if summary.details_missing > 0 {
        println!("  No details: {}", summary.details_missing);
    }
    if let Some(reason) = &summary.incomplete {
        println!("  Incomplete: {reason}");
    }
    println!("  Time:     {:.1}s", summary.duration.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_list(db: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(db, &config).await?;
    let orgs = storage.list_organizations().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&orgs)?);
        return Ok(());
    }

    if orgs.is_empty() {
        println!("No organizations stored yet.");
        return Ok(());
    }

    for org in &orgs {
        println!("{}", summary_line(org));
    }
    println!("\n{} organization(s)", orgs.len());
    Ok(())
}

async fn cmd_show(db: Option<PathBuf>, id: &str) -> Result<()> {
    let org_id: OrgId = id.parse()?;
    let config = load_config()?;
    let storage = open_storage(db, &config).await?;

    let org = storage
        .find_organization(OrgLookup::Id(&org_id))
        .await?
        .ok_or_else(|| eyre!("no organization with id {id}"))?;
    let pages = storage.list_pages(&org.id).await?;

    println!("  ID:        {}", org.id);
    println!("  Name:      {}", org.name);
    println!("  Website:   {}", org.website_url.as_deref().unwrap_or("-"));
    println!("  Directory: {}", org.directory_id.as_deref().unwrap_or("-"));
    let address = [&org.street, &org.city, &org.state, &org.zip]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if !address.is_empty() {
        println!("  Address:   {address}");
    }
    if let Some(rating) = org.rating {
        println!("  Rating:    {rating:.1}");
    }
    if let Some(org_type) = &org.org_type {
        println!("  Type:      {org_type}");
    }
    println!("  Updated:   {}", org.updated_at.format("%Y-%m-%d %H:%M"));

    if !org.urls_to_fetch.is_empty() {
        println!("\n  Selected URLs:");
        for url in &org.urls_to_fetch {
            println!("    {url}");
        }
    }

    if !pages.is_empty() {
        println!("\n  Stored pages:");
        for page in &pages {
            println!("    {} ({} chars)", page.url, page.content.len());
        }
    }

    if let Some(content) = &org.website_content {
        println!("\n{content}");
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn summary_line(org: &Organization) -> String {
    let location = match (&org.city, &org.state) {
        (Some(city), Some(state)) => format!("{city}, {state}"),
        (Some(city), None) => city.clone(),
        _ => String::new(),
    };
    format!(
        "{}  {:<40} {:<30} {}",
        org.id,
        org.name,
        org.website_url.as_deref().unwrap_or("-"),
        location
    )
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_fetched(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {url}"));
    }
}
