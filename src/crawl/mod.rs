//! Crawl facade
//!
//! A `Crawl` is either local (the in-process worker pool) or remote (the
//! hosted API). The variant is picked once, when the crawl is constructed:
//! with an API key the crawl runs remotely, without one it runs locally.

mod local;
mod remote;

pub use local::LocalCrawl;
pub use remote::RemoteCrawl;

use crate::api::ApiClient;
use crate::config::CrawlConfig;
use crate::output::CrawlStatus;
use crate::storage::list_sidecars;
use crate::WebtError;
use std::path::{Path, PathBuf};

/// A crawl running locally or on the hosted API
#[derive(Debug)]
pub enum Crawl {
    Local(LocalCrawl),
    Remote(RemoteCrawl),
}

impl Crawl {
    /// Creates a crawl, remote when an API key is given
    pub fn new(config: CrawlConfig, api_key: Option<&str>) -> Result<Self, WebtError> {
        match api_key {
            Some(key) => Ok(Self::Remote(RemoteCrawl::new(config, ApiClient::new(key)?)?)),
            None => {
                tracing::warn!(
                    "No WebTranspose API key provided, running the lite crawler locally"
                );
                Ok(Self::Local(LocalCrawl::new(config)?))
            }
        }
    }

    /// Id of the crawl; `None` for a remote crawl not created yet
    pub fn crawl_id(&self) -> Option<&str> {
        match self {
            Self::Local(crawl) => Some(crawl.crawl_id()),
            Self::Remote(crawl) => crawl.crawl_id(),
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        match self {
            Self::Local(crawl) => crawl.config(),
            Self::Remote(crawl) => crawl.config(),
        }
    }

    /// Runs (or resumes) the crawl until it stops making progress
    pub async fn run(&mut self) -> Result<(), WebtError> {
        match self {
            Self::Local(crawl) => crawl.run().await,
            Self::Remote(crawl) => crawl.run().await,
        }
    }

    pub async fn status(&self) -> Result<CrawlStatus, WebtError> {
        match self {
            Self::Local(crawl) => Ok(crawl.status()),
            Self::Remote(crawl) => crawl.status().await,
        }
    }

    pub async fn set_allowed(&mut self, patterns: Vec<String>) -> Result<(), WebtError> {
        match self {
            Self::Local(crawl) => crawl.set_allowed(patterns),
            Self::Remote(crawl) => crawl.set_allowed(patterns).await,
        }
    }

    pub async fn set_banned(&mut self, patterns: Vec<String>) -> Result<(), WebtError> {
        match self {
            Self::Local(crawl) => crawl.set_banned(patterns),
            Self::Remote(crawl) => crawl.set_banned(patterns).await,
        }
    }

    pub async fn set_max_pages(&mut self, max_pages: usize) -> Result<(), WebtError> {
        match self {
            Self::Local(crawl) => crawl.set_max_pages(max_pages),
            Self::Remote(crawl) => crawl.set_max_pages(max_pages).await,
        }
    }

    /// Puts the crawl output on disk and returns where it is
    pub async fn download(&self) -> Result<PathBuf, WebtError> {
        match self {
            Self::Local(crawl) => Ok(crawl.download()),
            Self::Remote(crawl) => crawl.download().await,
        }
    }

    /// Re-queues failed URLs
    pub async fn retry_failed(&mut self) -> Result<(), WebtError> {
        match self {
            Self::Local(crawl) => crawl.retry_failed().map(|_| ()),
            Self::Remote(crawl) => crawl.retry_failed().await,
        }
    }
}

/// Finds a crawl by id
///
/// The sidecar in `output_dir` is tried first. When there is none and an API
/// key is available, the crawl is looked up on the hosted API.
pub async fn get_crawl(
    crawl_id: &str,
    output_dir: &Path,
    api_key: Option<&str>,
) -> Result<Crawl, WebtError> {
    match LocalCrawl::restore(crawl_id, output_dir) {
        Ok(crawl) => Ok(Crawl::Local(crawl)),
        Err(WebtError::Storage(e)) if e.is_not_found() => match api_key {
            Some(key) => {
                tracing::debug!("No local sidecar for {}, asking the hosted API", crawl_id);
                let crawl = RemoteCrawl::from_cloud(crawl_id, ApiClient::new(key)?).await?;
                Ok(Crawl::Remote(crawl))
            }
            None => Err(WebtError::Storage(e)),
        },
        Err(e) => Err(e),
    }
}

/// Restores every local crawl whose sidecar is in `output_dir`
///
/// Sidecars that cannot be read are logged and skipped.
pub fn list_crawls(output_dir: &Path) -> Result<Vec<LocalCrawl>, WebtError> {
    let mut crawls = Vec::new();
    for crawl_id in list_sidecars(output_dir)? {
        match LocalCrawl::restore(&crawl_id, output_dir) {
            Ok(crawl) => crawls.push(crawl),
            Err(e) => tracing::warn!("Skipping {}: {}", crawl_id, e),
        }
    }
    Ok(crawls)
}
