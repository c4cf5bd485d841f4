//! Storage traits and error types
//!
//! This module defines the trait interface for page record backends and the
//! error type shared by page records and sidecar files.

use crate::storage::PageRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Sidecar file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Malformed file {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("Unsupported sidecar version {found} (this build reads up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Page record not found: {}", .0.display())]
    PageNotFound(PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Returns true if the error means the requested file does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::PageNotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for page record backends
///
/// Workers call `write_page` concurrently, each for a different URL, so
/// implementations must be safe to share across threads and must not rely on
/// a common file.
pub trait PageStore: Send + Sync {
    /// Path the record for `url` is (or would be) stored at
    fn page_path(&self, url: &str) -> PathBuf;

    /// Writes one page record, returning the path written
    fn write_page(&self, record: &PageRecord) -> StorageResult<PathBuf>;

    /// Reads a page record back from `path`
    fn read_page(&self, path: &Path) -> StorageResult<PageRecord>;
}
