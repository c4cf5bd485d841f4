//! webtranspose: a web crawling client
//!
//! This crate wraps the hosted crawl API and ships a local ("lite") crawler that
//! runs entirely in-process: a bounded pool of workers drains a shared frontier,
//! applies same-origin and glob scope rules, and writes one JSON record per
//! visited page plus a resumable sidecar file per crawl.

pub mod api;
pub mod config;
pub mod crawl;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for webtranspose operations
#[derive(Debug, Error)]
pub enum WebtError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("API request to {path} failed with status code: {status}")]
    Api { path: String, status: u16 },

    #[error("Unexpected API response from {path}: {message}")]
    ApiResponse { path: String, message: String },

    #[error("The first page crawled failed: {url}")]
    FirstPageFailed { url: String },

    #[error("Crawl has not been created on the hosted API yet")]
    NotCreated,

    #[error("URL {0} not found in visited URLs")]
    NotVisited(String),

    #[error("Crawl archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid URL pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for webtranspose operations
pub type Result<T> = std::result::Result<T, WebtError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::CrawlConfig;
pub use crawl::{get_crawl, list_crawls, Crawl, LocalCrawl, RemoteCrawl};
pub use state::{CrawlState, FrontierItem, PageType};
pub use url::{normalize_url, Classification, UrlScope};
