//! Output module for reporting crawl progress
//!
//! This module handles:
//! - Building a status snapshot of a local or hosted crawl
//! - Rendering it as a text block or JSON

mod status;

pub use status::{CrawlStatus, Location};

use crate::WebtError;

/// Renders a status for the terminal, as JSON when `json` is set
pub fn render_status(status: &CrawlStatus, json: bool) -> Result<String, WebtError> {
    if json {
        Ok(serde_json::to_string_pretty(status)?)
    } else {
        Ok(status.to_string())
    }
}
