//! store::file
//!
//! JSON-document content store.
//!
//! - All records live in one JSON file (default `qpress-store.json`)
//! - Every mutation is a locked read-modify-write
//! - All writes are atomic (write to temp file, then rename)

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::document::{StoreDocument, STORE_VERSION};
use super::{ContentStore, DigestRecord, InsertOutcome, StoreError};
use crate::content::records::{Conference, Publication};
use crate::core::lock::FileLock;
use crate::core::types::UtcTimestamp;

/// Store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Open a store at `path`. The file is created on first write.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    fn read_doc(&self) -> Result<StoreDocument, StoreError> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| StoreError::Read {
            path: self.display(),
            message: e.to_string(),
        })?;
        let doc: StoreDocument =
            serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                path: self.display(),
                message: e.to_string(),
            })?;
        if doc.version != STORE_VERSION {
            return Err(StoreError::Corrupt {
                path: self.display(),
                message: format!("unsupported store version {}", doc.version),
            });
        }
        Ok(doc)
    }

    fn write_doc(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let write_err = |message: String| StoreError::Write {
            path: self.display(),
            message,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| write_err(format!("cannot create directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| write_err(format!("cannot serialize: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| write_err(format!("cannot create temp file: {}", e)))?;
            file.write_all(json.as_bytes())
                .map_err(|e| write_err(format!("cannot write temp file: {}", e)))?;
            file.sync_all()
                .map_err(|e| write_err(format!("cannot sync temp file: {}", e)))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| write_err(format!("cannot rename temp file: {}", e)))
    }

    fn read<T>(&self, f: impl FnOnce(&StoreDocument) -> T) -> Result<T, StoreError> {
        let _lock = FileLock::acquire(&self.path)?;
        Ok(f(&self.read_doc()?))
    }

    fn update<T>(&self, f: impl FnOnce(&mut StoreDocument) -> T) -> Result<T, StoreError> {
        let _lock = FileLock::acquire(&self.path)?;
        let mut doc = self.read_doc()?;
        let out = f(&mut doc);
        self.write_doc(&doc)?;
        debug!(path = %self.path.display(), "store updated");
        Ok(out)
    }
}

impl ContentStore for FileStore {
    fn insert_publication(&self, publication: &Publication) -> Result<InsertOutcome, StoreError> {
        self.update(|d| d.insert_publication(publication))
    }

    fn insert_conference(&self, conference: &Conference) -> Result<InsertOutcome, StoreError> {
        self.update(|d| d.insert_conference(conference))
    }

    fn contains_publication(&self, name: &str) -> Result<bool, StoreError> {
        self.read(|d| d.has_publication(name))
    }

    fn contains_conference(&self, name: &str) -> Result<bool, StoreError> {
        self.read(|d| d.has_conference(name))
    }

    fn publications_updated_between(
        &self,
        after: UtcTimestamp,
        until: UtcTimestamp,
    ) -> Result<Vec<Publication>, StoreError> {
        self.read(|d| d.publications_between(after, until))
    }

    fn conferences_updated_between(
        &self,
        after: UtcTimestamp,
        until: UtcTimestamp,
    ) -> Result<Vec<Conference>, StoreError> {
        self.read(|d| d.conferences_between(after, until))
    }

    fn conferences(&self) -> Result<Vec<Conference>, StoreError> {
        self.read(StoreDocument::sorted_conferences)
    }

    fn latest_digest(&self) -> Result<Option<DigestRecord>, StoreError> {
        self.read(StoreDocument::latest_digest)
    }

    fn record_digest(&self, digest: DigestRecord) -> Result<(), StoreError> {
        self.update(|d| d.digests.push(digest))
    }
}
