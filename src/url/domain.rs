use url::Url;

/// Extracts the network origin (host plus explicit port) from a URL
///
/// Same-origin scope compares this value, and page records are grouped into a
/// directory named after it. Default ports are omitted by the URL parser, so
/// `http://a.com:80/` and `http://a.com/` share an origin.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webtranspose::url::extract_origin;
///
/// let url = Url::parse("http://127.0.0.1:8080/page").unwrap();
/// assert_eq!(extract_origin(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_origin(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host.to_string()),
    }
}

/// Parses `url_str` and extracts its origin
pub fn origin_of(url_str: &str) -> Option<String> {
    Url::parse(url_str).ok().as_ref().and_then(extract_origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_host() {
        let url = Url::parse("https://example.com/page").unwrap();
        assert_eq!(extract_origin(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("http://localhost:3000/").unwrap();
        assert_eq!(extract_origin(&url), Some("localhost:3000".to_string()));
    }

    #[test]
    fn test_default_port_is_dropped() {
        let url = Url::parse("http://a.com:80/x").unwrap();
        assert_eq!(extract_origin(&url), Some("a.com".to_string()));
    }

    #[test]
    fn test_subdomain_is_distinct_origin() {
        assert_ne!(
            origin_of("https://blog.example.com/"),
            origin_of("https://example.com/")
        );
    }

    #[test]
    fn test_no_host() {
        let url = Url::parse("mailto:someone@example.com").unwrap();
        assert_eq!(extract_origin(&url), None);
        assert_eq!(origin_of("not a url"), None);
    }
}
