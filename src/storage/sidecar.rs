//! Sidecar file: the persisted configuration and progress of one crawl
//!
//! A sidecar lives at `<output_dir>/<crawl_id>.json`. Its field names match
//! the files written by earlier releases, which carried no `version` field;
//! those are read as version 1. Fields added since then all have defaults, so
//! a version 1 reader accepts both.

use crate::config::{default_timeout_secs, default_user_agent, CrawlConfig};
use crate::state::{CrawlState, FrontierItem};
use crate::storage::traits::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Newest sidecar schema this build reads and the one it writes
pub const SIDECAR_VERSION: u32 = 1;

/// Serialized crawl configuration and state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sidecar {
    #[serde(default = "unversioned")]
    pub version: u32,
    pub crawl_id: String,
    pub base_url: String,
    #[serde(default)]
    pub allowed_urls: Vec<String>,
    #[serde(default)]
    pub banned_urls: Vec<String>,
    pub n_workers: usize,
    pub max_pages: usize,
    #[serde(default)]
    pub render_js: bool,
    pub output_dir: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub visited_urls: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub ignored_urls: Vec<String>,
    #[serde(default)]
    pub failed_urls: Vec<String>,
    /// Pending frontier items, in dequeue order
    #[serde(default)]
    pub queue: Vec<FrontierItem>,
}

fn unversioned() -> u32 {
    1
}

impl Sidecar {
    /// Captures a crawl's configuration and state
    pub fn capture(crawl_id: &str, config: &CrawlConfig, state: &CrawlState) -> Self {
        Self {
            version: SIDECAR_VERSION,
            crawl_id: crawl_id.to_string(),
            base_url: config.url.clone(),
            allowed_urls: config.allowed_urls.clone(),
            banned_urls: config.banned_urls.clone(),
            n_workers: config.workers,
            max_pages: config.max_pages,
            render_js: config.render_js,
            output_dir: config.output_dir.clone(),
            timeout_secs: config.timeout_secs,
            user_agent: config.user_agent.clone(),
            visited_urls: state.visited.clone(),
            ignored_urls: state.ignored.iter().cloned().collect(),
            failed_urls: state.failed.iter().cloned().collect(),
            queue: state.frontier.iter().cloned().collect(),
        }
    }

    /// Splits the sidecar back into crawl id, configuration and state
    pub fn into_parts(self) -> (String, CrawlConfig, CrawlState) {
        let config = CrawlConfig {
            url: self.base_url,
            allowed_urls: self.allowed_urls,
            banned_urls: self.banned_urls,
            workers: self.n_workers,
            max_pages: self.max_pages,
            output_dir: self.output_dir,
            render_js: self.render_js,
            timeout_secs: self.timeout_secs,
            user_agent: self.user_agent,
        };

        let mut state = CrawlState::new();
        state.visited = self.visited_urls;
        state.ignored = self.ignored_urls.into_iter().collect();
        state.failed = self.failed_urls.into_iter().collect();
        state.frontier = self.queue.into_iter().collect();

        (self.crawl_id, config, state)
    }

    /// Serializes the sidecar to JSON bytes
    pub fn to_json_bytes(&self) -> StorageResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Parses sidecar JSON read from `path`
    ///
    /// # Errors
    ///
    /// * `StorageError::Malformed` - the bytes are not a sidecar document
    /// * `StorageError::UnsupportedVersion` - written by a newer schema
    pub fn from_json_bytes(bytes: &[u8], path: &Path) -> StorageResult<Self> {
        let sidecar: Sidecar =
            serde_json::from_slice(bytes).map_err(|e| StorageError::Malformed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if sidecar.version > SIDECAR_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: sidecar.version,
                supported: SIDECAR_VERSION,
            });
        }

        Ok(sidecar)
    }
}

/// Path of the sidecar for `crawl_id`
pub fn sidecar_path(output_dir: &Path, crawl_id: &str) -> PathBuf {
    output_dir.join(format!("{}.json", crawl_id))
}

/// Writes a sidecar, replacing any previous one atomically
pub fn save_sidecar(sidecar: &Sidecar, output_dir: &Path) -> StorageResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = sidecar_path(output_dir, &sidecar.crawl_id);
    let tmp_path = output_dir.join(format!(".{}.json.tmp", sidecar.crawl_id));

    std::fs::write(&tmp_path, sidecar.to_json_bytes()?)?;
    std::fs::rename(&tmp_path, &path)?;

    tracing::debug!("Saved sidecar for crawl {} to {}", sidecar.crawl_id, path.display());
    Ok(path)
}

/// Loads the sidecar for `crawl_id` from `output_dir`
///
/// # Errors
///
/// * `StorageError::NotFound` - no sidecar for this crawl id
/// * `StorageError::Malformed` / `UnsupportedVersion` - see `Sidecar::from_json_bytes`
pub fn load_sidecar(crawl_id: &str, output_dir: &Path) -> StorageResult<Sidecar> {
    let path = sidecar_path(output_dir, crawl_id);

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound(path)),
        Err(e) => return Err(e.into()),
    };

    Sidecar::from_json_bytes(&bytes, &path)
}

/// Lists the crawl ids of every sidecar directly inside `output_dir`
///
/// Page records live one level deeper, so every top-level `.json` file is
/// taken to be a sidecar. A missing directory yields an empty list.
pub fn list_sidecars(output_dir: &Path) -> StorageResult<Vec<String>> {
    let entries = match std::fs::read_dir(output_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut ids = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            ids.push(stem.to_string());
        }
    }

    ids.sort();
    Ok(ids)
}
