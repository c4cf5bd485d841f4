//! Reading crawl configuration files
//!
//! A file holds one `[crawl]` table. `url` is required; every other key
//! falls back to its default.

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads, parses and validates a configuration file
///
/// ```no_run
/// use std::path::Path;
/// use webtranspose::config::load_config;
///
/// let config = load_config(Path::new("crawl.toml")).unwrap();
/// println!("{} with {} workers", config.crawl.url, config.crawl.workers);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex SHA-256 of a configuration file, logged so runs can be matched to
/// the file they used
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    Ok(hash_content(&std::fs::read_to_string(path)?))
}

/// Loads a configuration along with the hash of the exact text parsed
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok((parse_config(&content)?, hash_content(&content)))
}

fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
