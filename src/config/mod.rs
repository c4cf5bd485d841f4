//! Configuration module for webtranspose
//!
//! Crawl settings come either from a TOML file with a `[crawl]` table or from
//! `CrawlConfig::new` plus the builder methods. Both paths go through the same
//! validation before a crawl is constructed.
//!
//! # Example
//!
//! ```no_run
//! use webtranspose::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawling {} with {} workers", config.crawl.url, config.crawl.workers);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlConfig, DEFAULT_MAX_PAGES, DEFAULT_OUTPUT_DIR, DEFAULT_TIMEOUT_SECS,
    DEFAULT_WORKERS,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_crawl_config, MAX_WORKERS};

pub(crate) use types::{default_timeout_secs, default_user_agent};
