//! webtranspose main entry point
//!
//! This is the command-line interface for running and inspecting crawls.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use webtranspose::api::api_key_from_env;
use webtranspose::config::{load_config_with_hash, validate_crawl_config, CrawlConfig, DEFAULT_OUTPUT_DIR};
use webtranspose::output::render_status;
use webtranspose::{get_crawl, list_crawls, Crawl};

/// webtranspose: crawl websites locally or on the hosted API
///
/// Without `WEBTRANSPOSE_API_KEY` in the environment every crawl runs on
/// this machine and writes one JSON file per page plus a resumable sidecar.
#[derive(Parser, Debug)]
#[command(name = "webtranspose")]
#[command(version)]
#[command(about = "Crawl websites into JSON page records", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Directory holding page records and sidecar files
    #[arg(long, global = true, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Print status as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new crawl
    Crawl(CrawlArgs),

    /// Run another pass of an existing crawl
    Resume {
        crawl_id: String,

        /// Raise (or lower) the page cap before resuming
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Show the status of a crawl
    Status { crawl_id: String },

    /// Print the record of a visited page
    Page {
        crawl_id: String,
        url: String,

        /// Print only the links found on the page
        #[arg(long)]
        children: bool,
    },

    /// List local crawls
    List,

    /// Re-queue the failed URLs of a crawl
    RetryFailed { crawl_id: String },
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// URL to start from (required unless given in the config file)
    url: Option<String>,

    /// Path to a TOML configuration file with a [crawl] table
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Glob pattern of URLs to crawl regardless of origin (repeatable)
    #[arg(long = "allowed", value_name = "PATTERN")]
    allowed_urls: Vec<String>,

    /// Glob pattern of same-origin URLs to skip (repeatable)
    #[arg(long = "banned", value_name = "PATTERN")]
    banned_urls: Vec<String>,

    /// Number of concurrent workers
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Maximum number of pages to visit
    #[arg(short = 'm', long)]
    max_pages: Option<usize>,

    /// Ask the hosted API to render JavaScript
    #[arg(long)]
    render_js: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// User agent for page requests
    #[arg(long)]
    user_agent: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let api_key = api_key_from_env();
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    match cli.command {
        Command::Crawl(args) => {
            let config = build_config(args, cli.output_dir)?;
            handle_crawl(config, api_key.as_deref(), cli.json).await
        }
        Command::Resume {
            crawl_id,
            max_pages,
        } => handle_resume(&crawl_id, &output_dir, api_key.as_deref(), max_pages, cli.json).await,
        Command::Status { crawl_id } => {
            let crawl = get_crawl(&crawl_id, &output_dir, api_key.as_deref()).await?;
            println!("{}", render_status(&crawl.status().await?, cli.json)?);
            Ok(())
        }
        Command::Page {
            crawl_id,
            url,
            children,
        } => handle_page(&crawl_id, &url, &output_dir, api_key.as_deref(), children).await,
        Command::List => handle_list(&output_dir, cli.json),
        Command::RetryFailed { crawl_id } => {
            let mut crawl = get_crawl(&crawl_id, &output_dir, api_key.as_deref()).await?;
            crawl.retry_failed().await?;
            println!("{}", render_status(&crawl.status().await?, cli.json)?);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webtranspose=info,warn"),
            1 => EnvFilter::new("webtranspose=debug,info"),
            2 => EnvFilter::new("webtranspose=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Merges the config file (if any) with command-line flags; flags win
fn build_config(args: CrawlArgs, output_dir: Option<PathBuf>) -> anyhow::Result<CrawlConfig> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config.crawl
        }
        None => match &args.url {
            Some(url) => CrawlConfig::new(url.as_str()),
            None => bail!("A start URL is required when no --config file is given"),
        },
    };

    if let Some(url) = args.url {
        config.url = url;
    }
    if !args.allowed_urls.is_empty() {
        config.allowed_urls = args.allowed_urls;
    }
    if !args.banned_urls.is_empty() {
        config.banned_urls = args.banned_urls;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(max_pages) = args.max_pages {
        config.max_pages = max_pages;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    if args.render_js {
        config.render_js = true;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(user_agent) = args.user_agent {
        config.user_agent = user_agent;
    }

    validate_crawl_config(&config)?;
    Ok(config)
}

/// Handles the main crawl operation
async fn handle_crawl(config: CrawlConfig, api_key: Option<&str>, json: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} with {} workers, up to {} pages",
        config.url,
        config.workers,
        config.max_pages
    );

    let mut crawl = Crawl::new(config, api_key)?;
    match crawl.run().await {
        Ok(()) => tracing::info!("Crawl completed successfully"),
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    }

    println!("{}", render_status(&crawl.status().await?, json)?);
    Ok(())
}

async fn handle_resume(
    crawl_id: &str,
    output_dir: &Path,
    api_key: Option<&str>,
    max_pages: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let mut crawl = get_crawl(crawl_id, output_dir, api_key).await?;
    if let Some(max_pages) = max_pages {
        crawl.set_max_pages(max_pages).await?;
    }

    tracing::info!("Resuming crawl {}", crawl_id);
    crawl.run().await?;

    println!("{}", render_status(&crawl.status().await?, json)?);
    Ok(())
}

async fn handle_page(
    crawl_id: &str,
    url: &str,
    output_dir: &Path,
    api_key: Option<&str>,
    children: bool,
) -> anyhow::Result<()> {
    let page = match get_crawl(crawl_id, output_dir, api_key).await? {
        Crawl::Local(crawl) => serde_json::to_value(crawl.page(url)?)?,
        Crawl::Remote(crawl) => crawl.page(url).await?,
    };

    if children {
        let links = page.get("child_urls").cloned().unwrap_or_default();
        println!("{}", serde_json::to_string_pretty(&links)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&page)?);
    }
    Ok(())
}

fn handle_list(output_dir: &Path, json: bool) -> anyhow::Result<()> {
    let crawls = list_crawls(output_dir)?;

    if json {
        let statuses: Vec<_> = crawls.iter().map(|c| c.status()).collect();
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    if crawls.is_empty() {
        println!("No crawls found in {}", output_dir.display());
        return Ok(());
    }

    for crawl in &crawls {
        let status = crawl.status();
        println!(
            "{}  {}  visited: {}  queued: {}  failed: {}",
            status.crawl_id, status.base_url, status.num_visited, status.num_queued, status.num_failed
        );
    }
    Ok(())
}
