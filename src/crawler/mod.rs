//! Crawler module for web page fetching and processing
//!
//! This module contains the local crawling engine:
//! - HTTP fetching, one request per URL
//! - HTML parsing and link extraction
//! - The shared frontier and its worker pool
//! - Coordination of a crawl pass

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod worker;

pub use coordinator::{Coordinator, RunSummary};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use frontier::{Frontier, TaskGuard};
pub use parser::{extract_page, is_html_content_type, parse_html, ExtractError, ParsedPage};
pub use worker::build_page_record;
