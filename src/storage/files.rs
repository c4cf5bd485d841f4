use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::{page_file_name, PageRecord};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Page records stored as one JSON file each under `<output_dir>/<origin>/`
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Creates a store for pages of a crawl rooted at `origin`
    ///
    /// Nothing is created on disk until the first page is written.
    pub fn new(output_dir: &Path, origin: &str) -> Self {
        Self {
            root: output_dir.join(origin),
        }
    }
}

impl PageStore for FileStorage {
    fn page_path(&self, url: &str) -> PathBuf {
        self.root.join(page_file_name(url))
    }

    fn write_page(&self, record: &PageRecord) -> StorageResult<PathBuf> {
        std::fs::create_dir_all(&self.root)?;

        let path = self.page_path(&record.url);
        let json = serde_json::to_vec(record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        std::fs::write(&path, json)?;

        tracing::trace!("Wrote page record for {} to {}", record.url, path.display());
        Ok(path)
    }

    fn read_page(&self, path: &Path) -> StorageResult<PageRecord> {
        read_page_record(path)
    }
}

/// Reads a page record from any path
pub fn read_page_record(path: &Path) -> StorageResult<PageRecord> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StorageError::PageNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&bytes).map_err(|e| StorageError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
