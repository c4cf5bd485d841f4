//! Crawl status reporting
//!
//! `CrawlStatus` is the same shape whether it is computed from a local crawl
//! or returned by the hosted API, so the CLI can print either one.

use crate::config::CrawlConfig;
use crate::state::CrawlState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a crawl runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    #[default]
    Local,
    Cloud,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Cloud => write!(f, "cloud"),
        }
    }
}

/// Snapshot of a crawl's configuration and progress counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlStatus {
    pub crawl_id: String,
    pub loc: Location,
    pub base_url: String,
    pub max_pages: usize,
    pub num_visited: usize,
    pub num_ignored: usize,
    pub num_failed: usize,
    pub num_queued: usize,
    pub banned_urls: Vec<String>,
    pub allowed_urls: Vec<String>,
    /// Only known for local crawls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_workers: Option<usize>,
}

impl CrawlStatus {
    /// Computes the status of a local crawl
    pub fn local(crawl_id: &str, config: &CrawlConfig, state: &CrawlState) -> Self {
        Self {
            crawl_id: crawl_id.to_string(),
            loc: Location::Local,
            base_url: config.url.clone(),
            max_pages: config.max_pages,
            num_visited: state.visited.len(),
            num_ignored: state.ignored.len(),
            num_failed: state.failed.len(),
            num_queued: state.queued(),
            banned_urls: config.banned_urls.clone(),
            allowed_urls: config.allowed_urls.clone(),
            n_workers: Some(config.workers),
        }
    }

    /// Returns true if the crawl has produced nothing and has nothing pending
    pub fn is_idle(&self) -> bool {
        self.num_queued + self.num_visited + self.num_ignored == 0
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let workers = match self.n_workers {
            Some(n) => n.to_string(),
            None => "cloud".to_string(),
        };

        writeln!(f, "WebTransposeCrawl(")?;
        writeln!(f, "  Crawl ID: {}", self.crawl_id)?;
        writeln!(f, "  Location: {}", self.loc)?;
        writeln!(f, "  Number of Workers: {}", workers)?;
        writeln!(f, "  Base URL: {}", self.base_url)?;
        writeln!(f, "  Max Pages: {}", self.max_pages)?;
        writeln!(f, "  Number of Visited URLs: {}", self.num_visited)?;
        writeln!(f, "  Number of Ignored URLs: {}", self.num_ignored)?;
        writeln!(f, "  Number of Queued URLs: {}", self.num_queued)?;
        writeln!(f, "  Number of Failed URLs: {}", self.num_failed)?;
        writeln!(f, "  Banned URLs: {:?}", self.banned_urls)?;
        writeln!(f, "  Allowed URLs: {:?}", self.allowed_urls)?;
        write!(f, ")")
    }
}
