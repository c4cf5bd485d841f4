//! Page type definitions for visited pages
//!
//! A visited page is either parsed HTML (with title, text and links) or
//! something the crawler stored without following its links.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents what kind of content a visited URL produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    /// Body decoded and parsed as HTML; links were extracted
    Html,

    /// Non-HTML content or an undecodable body; no links were extracted
    Other,
}

impl PageType {
    /// Converts to the string stored in page records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
