//! HTML parser for extracting links, title and text
//!
//! This module turns a fetched body into the parts of a page record:
//! - Title (empty when the page has no `<title>`)
//! - Visible text, skipping script and style content
//! - Outbound links: every `href` in the document, made absolute and normalized

use crate::url::normalize_str;
use scraper::{Html, Node, Selector};
use std::collections::BTreeSet;
use thiserror::Error;
use url::Url;

/// Elements whose text never renders
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from the first `<title>` tag), trimmed
    pub title: String,

    /// Visible text, one line per text node
    pub text: String,

    /// Absolute, fragment-free http(s) links
    pub links: BTreeSet<String>,

    /// The decoded document
    pub html: String,
}

/// Why a body was not treated as HTML
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Content-Type {0} is not HTML")]
    NotHtml(String),

    #[error("Response body is not valid UTF-8")]
    InvalidUtf8,
}

/// Returns true if a Content-Type header (or its absence) allows HTML parsing
pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml")
        }
    }
}

/// Decodes and parses a fetched body
///
/// # Errors
///
/// * `ExtractError::NotHtml` - the Content-Type names a non-HTML format
/// * `ExtractError::InvalidUtf8` - the body does not decode as UTF-8
pub fn extract_page(
    body: &[u8],
    content_type: Option<&str>,
    base_url: &Url,
) -> Result<ParsedPage, ExtractError> {
    if !is_html_content_type(content_type) {
        return Err(ExtractError::NotHtml(
            content_type.unwrap_or_default().to_string(),
        ));
    }

    let html = std::str::from_utf8(body).map_err(|_| ExtractError::InvalidUtf8)?;
    Ok(parse_html(html, base_url))
}

/// Parses HTML content and extracts title, text and links
///
/// # Link Extraction Rules
///
/// **Include:** the `href` of every element that has one (`<a>`, `<link>`,
/// `<area>`, ...), resolved against `base_url`.
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that does not resolve to http(s)
///
/// # Example
///
/// ```
/// use webtranspose::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page#x">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, "Test");
/// assert!(parsed.links.contains("https://example.com/page"));
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        text: extract_text(&document),
        links: extract_links(&document, base_url),
        html: html.to_string(),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    let title_selector = match Selector::parse("title") {
        Ok(selector) => selector,
        Err(_) => return String::new(),
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Collects visible text nodes
fn extract_text(document: &Html) -> String {
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(element) => HIDDEN_TAGS.contains(&element.name()),
            _ => false,
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed);
        }
    }

    lines.join("\n")
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> BTreeSet<String> {
    let mut links = BTreeSet::new();

    if let Ok(href_selector) = Selector::parse("[href]") {
        for element in document.select(&href_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.insert(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    normalize_str(absolute_url.as_str()).ok()
}
