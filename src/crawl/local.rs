//! Local ("lite") crawl: runs the worker pool in-process
//!
//! A `LocalCrawl` owns its configuration and state. Every pass and every
//! setter call rewrites the sidecar under the output directory, so a crawl can
//! be restored by id and resumed later with `run`.

use crate::config::{validate_crawl_config, CrawlConfig};
use crate::crawler::Coordinator;
use crate::output::CrawlStatus;
use crate::state::{CrawlState, FrontierItem, SharedState};
use crate::storage::{load_sidecar, read_page_record, save_sidecar, PageRecord, Sidecar};
use crate::WebtError;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A crawl that runs on this machine
///
/// The state is shared only with the workers of a running pass, never with
/// another `LocalCrawl`.
#[derive(Debug)]
pub struct LocalCrawl {
    crawl_id: String,
    config: CrawlConfig,
    state: SharedState,
}

impl LocalCrawl {
    /// Creates a crawl with a fresh id, seeded with the configured start URL
    ///
    /// # Errors
    ///
    /// * `WebtError::Config` - the configuration does not validate
    pub fn new(config: CrawlConfig) -> Result<Self, WebtError> {
        Self::with_id(Uuid::new_v4().to_string(), config)
    }

    /// Creates a crawl with a caller-chosen id
    pub fn with_id(crawl_id: impl Into<String>, config: CrawlConfig) -> Result<Self, WebtError> {
        validate_crawl_config(&config)?;
        let crawl_id = crawl_id.into();
        tracing::info!("Created local crawl {} of {}", crawl_id, config.url);

        Ok(Self {
            state: SharedState::new(CrawlState::seeded(&config.url)),
            crawl_id,
            config,
        })
    }

    /// Rebuilds a crawl from its sidecar in `output_dir`
    ///
    /// # Errors
    ///
    /// * `StorageError::NotFound` - no sidecar for `crawl_id`
    /// * `StorageError::Malformed` / `UnsupportedVersion` - unreadable sidecar
    pub fn restore(crawl_id: &str, output_dir: &Path) -> Result<Self, WebtError> {
        let sidecar = load_sidecar(crawl_id, output_dir)?;
        let (crawl_id, config, state) = sidecar.into_parts();
        validate_crawl_config(&config)?;

        tracing::debug!(
            "Restored crawl {}: {} visited, {} queued",
            crawl_id,
            state.visited.len(),
            state.queued()
        );

        Ok(Self {
            crawl_id,
            config,
            state: SharedState::new(state),
        })
    }

    pub fn crawl_id(&self) -> &str {
        &self.crawl_id
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Copy of the current crawl state
    pub fn state(&self) -> CrawlState {
        self.state.lock().clone()
    }

    /// Runs one crawl pass over the pending frontier and persists the result
    ///
    /// Calling it again resumes from the items the page cap left over.
    ///
    /// # Errors
    ///
    /// * `WebtError::FirstPageFailed` - the pass visited, ignored and queued
    ///   nothing but failed at least one URL
    pub async fn run(&self) -> Result<(), WebtError> {
        {
            let mut state = self.state.lock();
            if state.is_empty() {
                state.frontier.push_back(FrontierItem::seed(self.config.url.as_str()));
            }
        }

        let coordinator = Coordinator::new(&self.crawl_id, &self.config, self.state.clone())?;
        coordinator.run().await?;
        self.snapshot()?;

        let state = self.state.lock();
        if state.visited.is_empty() && state.ignored.is_empty() && state.frontier.is_empty() {
            if let Some(url) = state.failed.iter().next() {
                return Err(WebtError::FirstPageFailed { url: url.clone() });
            }
        }

        Ok(())
    }

    /// Writes the sidecar for this crawl
    pub fn snapshot(&self) -> Result<PathBuf, WebtError> {
        let sidecar = Sidecar::capture(&self.crawl_id, &self.config, &self.state.lock());
        Ok(save_sidecar(&sidecar, &self.config.output_dir)?)
    }

    /// Progress counts and configuration
    pub fn status(&self) -> CrawlStatus {
        CrawlStatus::local(&self.crawl_id, &self.config, &self.state.lock())
    }

    /// The first `n` items of the pending frontier, without removing them
    pub fn queued(&self, n: usize) -> Vec<FrontierItem> {
        self.state.lock().frontier.iter().take(n).cloned().collect()
    }

    pub fn visited_urls(&self) -> Vec<String> {
        self.state.lock().visited.keys().cloned().collect()
    }

    pub fn ignored_urls(&self) -> Vec<String> {
        self.state.lock().ignored.iter().cloned().collect()
    }

    pub fn failed_urls(&self) -> Vec<String> {
        self.state.lock().failed.iter().cloned().collect()
    }

    pub fn banned_urls(&self) -> &[String] {
        &self.config.banned_urls
    }

    pub fn allowed_urls(&self) -> &[String] {
        &self.config.allowed_urls
    }

    /// Path of the page record of a visited URL
    ///
    /// # Errors
    ///
    /// * `WebtError::NotVisited` - the URL was never visited by this crawl
    pub fn filename(&self, url: &str) -> Result<PathBuf, WebtError> {
        self.state
            .lock()
            .visited
            .get(url)
            .cloned()
            .ok_or_else(|| WebtError::NotVisited(url.to_string()))
    }

    /// Reads the page record of a visited URL
    pub fn page(&self, url: &str) -> Result<PageRecord, WebtError> {
        let path = self.filename(url)?;
        Ok(read_page_record(&path)?)
    }

    /// Links found on a visited page
    pub fn child_urls(&self, url: &str) -> Result<Vec<String>, WebtError> {
        Ok(self.page(url)?.child_urls.into_iter().collect())
    }

    /// Moves every failed URL back into the frontier and persists the change
    ///
    /// Returns the number of URLs re-queued.
    pub fn retry_failed(&mut self) -> Result<usize, WebtError> {
        let count = self.state.lock().retry_failed();
        tracing::info!("Re-queued {} failed URLs for crawl {}", count, self.crawl_id);
        self.snapshot()?;
        Ok(count)
    }

    /// Replaces the allowed patterns and persists the change
    pub fn set_allowed(&mut self, patterns: Vec<String>) -> Result<(), WebtError> {
        let mut config = self.config.clone();
        config.allowed_urls = patterns;
        self.apply(config)
    }

    /// Replaces the banned patterns and persists the change
    pub fn set_banned(&mut self, patterns: Vec<String>) -> Result<(), WebtError> {
        let mut config = self.config.clone();
        config.banned_urls = patterns;
        self.apply(config)
    }

    /// Changes the page cap and persists the change
    pub fn set_max_pages(&mut self, max_pages: usize) -> Result<(), WebtError> {
        let mut config = self.config.clone();
        config.max_pages = max_pages;
        self.apply(config)
    }

    fn apply(&mut self, config: CrawlConfig) -> Result<(), WebtError> {
        validate_crawl_config(&config)?;
        self.config = config;
        self.snapshot()?;
        Ok(())
    }

    /// Local page records are already on disk; returns their directory
    pub fn download(&self) -> PathBuf {
        tracing::info!(
            "The output of the crawl can be found at: {}",
            self.config.output_dir.display()
        );
        self.config.output_dir.clone()
    }
}
