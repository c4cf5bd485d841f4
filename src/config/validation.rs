use crate::config::types::{Config, CrawlConfig};
use crate::url::compile_patterns;
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool size
pub const MAX_WORKERS: usize = 100;

/// Validates the entire configuration file
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)
}

/// Validates a crawl configuration
///
/// Checks the start URL, pool size, page cap, timeout, user agent and that
/// every allow/ban pattern compiles as a glob.
pub fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_start_url(&config.url)?;

    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    compile_patterns(&config.allowed_urls)?;
    compile_patterns(&config.banned_urls)?;

    Ok(())
}

/// Validates the crawl start URL: absolute, http(s), with a host
fn validate_start_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Start URL '{}' must use http or https",
            raw
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Start URL '{}' has no host",
            raw
        )));
    }

    Ok(())
}
