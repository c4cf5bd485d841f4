//! Storage module for persisting crawl data
//!
//! This module handles everything a crawl writes to disk:
//! - One JSON page record per visited URL, under `<output_dir>/<origin>/`
//! - The sidecar file holding configuration and progress, `<output_dir>/<crawl_id>.json`

mod files;
mod sidecar;
mod traits;

pub use files::{read_page_record, FileStorage};
pub use sidecar::{
    list_sidecars, load_sidecar, save_sidecar, sidecar_path, Sidecar, SIDECAR_VERSION,
};
pub use traits::{PageStore, StorageError, StorageResult};

use crate::state::PageType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use url::form_urlencoded;

/// Longest file name (without extension) used for a page record
const MAX_FILE_STEM_LEN: usize = 200;

/// Represents one visited page on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub crawl_id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub title: Option<String>,
    #[serde(rename = "date")]
    pub fetched_at: DateTime<Utc>,
    pub parent_urls: Vec<String>,
    pub child_urls: BTreeSet<String>,
    pub html: Option<String>,
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// Builds the file name of the page record for `url`
///
/// The URL is form-urlencoded so it contains no path separators. Names that
/// would exceed file system limits are truncated and suffixed with the
/// SHA-256 of the full URL to stay unique.
///
/// # Examples
///
/// ```
/// use webtranspose::storage::page_file_name;
///
/// assert_eq!(page_file_name("http://a.com/x"), "http%3A%2F%2Fa.com%2Fx.json");
/// ```
pub fn page_file_name(url: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(url.as_bytes())
        .collect::<String>()
        .replace('*', "%2A");

    if encoded.len() <= MAX_FILE_STEM_LEN {
        return format!("{}.json", encoded);
    }

    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    // byte_serialize output is ASCII, so any byte index is a char boundary
    let prefix = &encoded[..MAX_FILE_STEM_LEN - digest.len() - 1];
    format!("{}-{}.json", prefix, digest)
}
