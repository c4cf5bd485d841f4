use crate::UrlError;
use url::Url;

/// Normalizes a URL for de-duplication
///
/// Parsing canonicalizes scheme and host case and fills in an empty path; the
/// only change on top of that is dropping the fragment, so two URLs that
/// differ only after `#` compare equal. Query strings are left untouched.
///
/// # Examples
///
/// ```
/// use webtranspose::url::normalize_url;
///
/// let url = normalize_url("http://example.com/page#section").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    url.set_fragment(None);
    Ok(url)
}

/// Normalizes a URL and returns it as an owned string
pub fn normalize_str(url_str: &str) -> Result<String, UrlError> {
    normalize_url(url_str).map(String::from)
}
