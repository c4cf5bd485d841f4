//! URL handling module for webtranspose
//!
//! This module provides URL normalization, origin extraction, glob matching,
//! and the scope rules that decide what a crawl may visit.

mod domain;
mod matcher;
mod normalize;

use crate::config::CrawlConfig;
use crate::ConfigError;
use glob::Pattern;
use url::Url;

// Re-export main functions
pub use domain::{extract_origin, origin_of};
pub use matcher::{compile_patterns, matches_any, matches_glob};
pub use normalize::{normalize_str, normalize_url};

/// Outcome of classifying a dequeued URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// In scope, unseen, and the page cap has room: fetch it now
    Crawlable,
    /// In scope and unseen, but the page cap is reached: keep it for a later run
    Leftover,
    /// Out of scope: wrong origin, or banned and not explicitly allowed
    Ignored,
    /// Already visited or currently being fetched by another worker
    Visited,
}

/// Compiled scope rules for one crawl
///
/// A URL is in scope when it shares the base URL's origin and matches no
/// banned pattern, or when it matches any allowed pattern. Allowed patterns
/// win over banned ones.
#[derive(Debug, Clone)]
pub struct UrlScope {
    base_url: Url,
    base_origin: String,
    allowed: Vec<Pattern>,
    banned: Vec<Pattern>,
}

impl UrlScope {
    /// Builds scope rules from a base URL and raw glob patterns
    ///
    /// # Errors
    ///
    /// * `ConfigError::InvalidUrl` - the base URL does not parse or has no host
    /// * `ConfigError::InvalidPattern` - a pattern does not compile
    pub fn new(base_url: &str, allowed: &[String], banned: &[String]) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidUrl(format!("Cannot determine origin of '{}'", base_url));
        let parsed = Url::parse(base_url).map_err(|_| invalid())?;
        let base_origin = extract_origin(&parsed).ok_or_else(invalid)?;

        Ok(Self {
            base_url: parsed,
            base_origin,
            allowed: compile_patterns(allowed)?,
            banned: compile_patterns(banned)?,
        })
    }

    /// Builds scope rules from a crawl configuration
    pub fn from_config(config: &CrawlConfig) -> Result<Self, ConfigError> {
        Self::new(&config.url, &config.allowed_urls, &config.banned_urls)
    }

    /// The crawl's start URL; relative links on every page resolve against it
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Origin of the base URL; page records are grouped under it
    pub fn base_origin(&self) -> &str {
        &self.base_origin
    }

    /// Returns true if the URL is in scope, ignoring visit state and capacity
    pub fn in_scope(&self, url: &Url) -> bool {
        let candidate = url.as_str();

        let same_origin = extract_origin(url).as_deref() == Some(self.base_origin.as_str());
        if same_origin && !matches_any(&self.banned, candidate) {
            return true;
        }

        matches_any(&self.allowed, candidate)
    }

    /// Classifies a normalized URL
    ///
    /// # Arguments
    ///
    /// * `url` - The normalized URL
    /// * `seen` - Whether the URL is already visited or reserved by a worker
    /// * `has_capacity` - Whether the page cap still has room
    pub fn classify(&self, url: &Url, seen: bool, has_capacity: bool) -> Classification {
        if seen {
            return Classification::Visited;
        }

        if !self.in_scope(url) {
            return Classification::Ignored;
        }

        if has_capacity {
            Classification::Crawlable
        } else {
            Classification::Leftover
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn scope(allowed: &[&str], banned: &[&str]) -> UrlScope {
        let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
        let banned: Vec<String> = banned.iter().map(|s| s.to_string()).collect();
        UrlScope::new("http://a.com", &allowed, &banned).unwrap()
    }

    #[test]
    fn test_banned_path_is_ignored() {
        let scope = scope(&[], &["http://a.com/private/*"]);
        assert_eq!(
            scope.classify(&url("http://a.com/private/x"), false, true),
            Classification::Ignored
        );
    }

    #[test]
    fn test_same_origin_is_crawlable() {
        let scope = scope(&[], &["http://a.com/private/*"]);
        assert_eq!(
            scope.classify(&url("http://a.com/public"), false, true),
            Classification::Crawlable
        );
    }

    #[test]
    fn test_other_origin_is_ignored_without_allow() {
        let scope = scope(&[], &[]);
        assert_eq!(
            scope.classify(&url("http://b.com/x"), false, true),
            Classification::Ignored
        );
    }

    #[test]
    fn test_other_origin_allowed_by_pattern() {
        let scope = scope(&["http://b.com/*"], &[]);
        assert_eq!(
            scope.classify(&url("http://b.com/x"), false, true),
            Classification::Crawlable
        );
    }

    #[test]
    fn test_allowed_overrides_banned() {
        let scope = scope(&["http://a.com/private/ok"], &["http://a.com/private/*"]);
        assert_eq!(
            scope.classify(&url("http://a.com/private/ok"), false, true),
            Classification::Crawlable
        );
        assert_eq!(
            scope.classify(&url("http://a.com/private/no"), false, true),
            Classification::Ignored
        );
    }

    #[test]
    fn test_cap_reached_is_leftover() {
        let scope = scope(&["http://b.com/*"], &[]);
        assert_eq!(
            scope.classify(&url("http://a.com/next"), false, false),
            Classification::Leftover
        );
        assert_eq!(
            scope.classify(&url("http://b.com/next"), false, false),
            Classification::Leftover
        );
    }

    #[test]
    fn test_out_of_scope_at_cap_is_still_ignored() {
        let scope = scope(&[], &[]);
        assert_eq!(
            scope.classify(&url("http://b.com/x"), false, false),
            Classification::Ignored
        );
    }

    #[test]
    fn test_seen_url_is_visited() {
        let scope = scope(&[], &["http://a.com/private/*"]);
        assert_eq!(
            scope.classify(&url("http://a.com/public"), true, true),
            Classification::Visited
        );
        assert_eq!(
            scope.classify(&url("http://a.com/private/x"), true, false),
            Classification::Visited
        );
    }

    #[test]
    fn test_port_is_part_of_origin() {
        let scope = UrlScope::new("http://127.0.0.1:8080/", &[], &[]).unwrap();
        assert!(scope.in_scope(&url("http://127.0.0.1:8080/a")));
        assert!(!scope.in_scope(&url("http://127.0.0.1:9090/a")));
        assert_eq!(scope.base_origin(), "127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(UrlScope::new("not a url", &[], &[]).is_err());
    }

    #[test]
    fn test_base_url_is_kept() {
        let scope = UrlScope::new("http://a.com/dir/start", &[], &[]).unwrap();
        assert_eq!(scope.base_url().as_str(), "http://a.com/dir/start");
        assert_eq!(scope.base_origin(), "a.com");
    }
}
