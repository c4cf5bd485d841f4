use crate::ConfigError;
use glob::{MatchOptions, Pattern};

/// Shell-style matching against whole URLs: `*` crosses `/`, case matters
const URL_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Compiles a list of glob patterns
///
/// # Errors
///
/// Returns `ConfigError::InvalidPattern` naming the first pattern that is
/// empty or does not compile.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns.iter().map(|p| compile_pattern(p)).collect()
}

fn compile_pattern(pattern: &str) -> Result<Pattern, ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "URL pattern cannot be empty".to_string(),
        ));
    }

    Pattern::new(pattern).map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}

/// Checks if a URL matches a glob pattern
///
/// Supports `*` (any run of characters, including `/`), `?` (one character)
/// and character classes such as `[a-z]` or `[!0-9]`.
///
/// # Examples
///
/// ```
/// use glob::Pattern;
/// use webtranspose::url::matches_glob;
///
/// let pattern = Pattern::new("http://a.com/private/*").unwrap();
/// assert!(matches_glob(&pattern, "http://a.com/private/x"));
/// assert!(matches_glob(&pattern, "http://a.com/private/x/y"));
/// assert!(!matches_glob(&pattern, "http://a.com/public"));
/// ```
pub fn matches_glob(pattern: &Pattern, candidate: &str) -> bool {
    pattern.matches_with(candidate, URL_MATCH_OPTIONS)
}

/// Checks if a URL matches any of the given patterns
pub fn matches_any(patterns: &[Pattern], candidate: &str) -> bool {
    patterns.iter().any(|p| matches_glob(p, candidate))
}
