//! HTTP fetcher implementation
//!
//! This module handles all page requests for the local crawler:
//! - Building the HTTP client with the configured user agent and timeout
//! - A single GET per URL, no retries
//! - Separating transport failures from responses (any status is a response)

use crate::config::CrawlConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// Upper bound on the connect phase of a request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The server answered and the body was read
    Success {
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value, if any
        content_type: Option<String>,
        /// Raw response body
        body: Vec<u8>,
    },

    /// Connection error, timeout, or a body that could not be read
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Builds an HTTP client for a crawl
///
/// # Example
///
/// ```no_run
/// use webtranspose::config::CrawlConfig;
/// use webtranspose::crawler::build_http_client;
///
/// let config = CrawlConfig::new("https://example.com/");
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &CrawlConfig) -> Result<Client, reqwest::Error> {
    let timeout = config.timeout();

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(timeout.min(CONNECT_TIMEOUT))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once
///
/// Redirects are followed by the client. Any HTTP status counts as a
/// response; only failures to connect, time-outs and unreadable bodies are
/// reported as `NetworkError`.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return FetchResult::NetworkError { error: describe_error(&e) },
    };

    let status_code = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match response.bytes().await {
        Ok(body) => FetchResult::Success {
            status_code,
            content_type,
            body: body.to_vec(),
        },
        Err(e) => FetchResult::NetworkError { error: describe_error(&e) },
    }
}

/// Classifies a reqwest error into a short description
fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else if e.is_decode() || e.is_body() {
        format!("Could not read response body: {}", e)
    } else {
        e.to_string()
    }
}
