use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of concurrent crawl workers
pub const DEFAULT_WORKERS: usize = 1;

/// Default page cap for a crawl run
pub const DEFAULT_MAX_PAGES: usize = 15;

/// Default directory for page records and sidecar files
pub const DEFAULT_OUTPUT_DIR: &str = "webtranspose-out";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Main configuration file structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// URL the crawl starts from; also defines the same-origin scope
    pub url: String,

    /// Glob patterns that bring a URL into scope regardless of origin
    #[serde(default)]
    pub allowed_urls: Vec<String>,

    /// Glob patterns that exclude same-origin URLs from scope
    #[serde(default)]
    pub banned_urls: Vec<String>,

    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum number of pages to visit
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Directory where page records and the sidecar file are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Accepted for the hosted API; the local crawler never renders JavaScript
    #[serde(default)]
    pub render_js: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with every page request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl CrawlConfig {
    /// Creates a configuration for `url` with every other field at its default
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            allowed_urls: Vec::new(),
            banned_urls: Vec::new(),
            workers: DEFAULT_WORKERS,
            max_pages: DEFAULT_MAX_PAGES,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            render_js: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }

    pub fn with_allowed(mut self, patterns: Vec<String>) -> Self {
        self.allowed_urls = patterns;
        self
    }

    pub fn with_banned(mut self, patterns: Vec<String>) -> Self {
        self.banned_urls = patterns;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_render_js(mut self, render_js: bool) -> Self {
        self.render_js = render_js;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Per-request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub(crate) fn default_workers() -> usize {
    DEFAULT_WORKERS
}

pub(crate) fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

pub(crate) fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

pub(crate) fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

pub(crate) fn default_user_agent() -> String {
    format!("webtranspose-lite/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let config = CrawlConfig::new("https://example.com/");
        assert_eq!(config.workers, 1);
        assert_eq!(config.max_pages, 15);
        assert_eq!(config.output_dir, PathBuf::from("webtranspose-out"));
        assert!(!config.render_js);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_builder_overrides() {
        let config = CrawlConfig::new("https://example.com/")
            .with_workers(4)
            .with_max_pages(100)
            .with_banned(vec!["https://example.com/private/*".to_string()]);
        assert_eq!(config.workers, 4);
        assert_eq!(config.max_pages, 100);
        assert_eq!(config.banned_urls.len(), 1);
    }
}
