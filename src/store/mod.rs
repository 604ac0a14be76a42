//! store
//!
//! Persistence of published records and digest history.
//!
//! # Architecture
//!
//! [`ContentStore`] is the seam between the publishing pipeline and
//! whatever keeps records. Two implementations exist:
//!
//! - [`MemoryStore`]: in-process, for tests and one-shot runs
//! - [`FileStore`]: a single JSON document on disk, rewritten atomically
//!   under an advisory lock
//!
//! # Invariants
//!
//! - Publications and conferences are unique by name; inserting an
//!   existing name reports [`InsertOutcome::AlreadyExists`] and changes
//!   nothing
//! - Aggregation windows exclude their lower bound and include their
//!   upper bound: `after < updated_at <= until`

mod document;
mod file;

pub use file::FileStore;

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::content::records::{Conference, Publication};
use crate::core::lock::LockError;
use crate::core::types::UtcTimestamp;
use document::StoreDocument;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to write store '{path}': {message}")]
    Write { path: String, message: String },

    #[error("store '{path}' is corrupt: {message}")]
    Corrupt { path: String, message: String },

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Result of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// One generated newsletter digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestRecord {
    pub id: Uuid,
    /// Upper bound of the window the digest covered
    pub created_at: UtcTimestamp,
    pub publications: usize,
    pub conferences: usize,
    /// Commit the digest was published in, if it was published
    #[serde(default)]
    pub commit: Option<String>,
}

/// Whether `ts` falls in the aggregation window `(after, until]`.
pub fn in_window(ts: UtcTimestamp, after: UtcTimestamp, until: UtcTimestamp) -> bool {
    after < ts && ts <= until
}

/// Record storage used by the pipeline and the digest job.
pub trait ContentStore: Send + Sync {
    /// Insert a publication unless one with the same name exists.
    fn insert_publication(&self, publication: &Publication) -> Result<InsertOutcome, StoreError>;

    /// Insert a conference unless one with the same name exists.
    fn insert_conference(&self, conference: &Conference) -> Result<InsertOutcome, StoreError>;

    /// Whether a publication with this name is stored.
    fn contains_publication(&self, name: &str) -> Result<bool, StoreError>;

    /// Whether a conference with this name is stored.
    fn contains_conference(&self, name: &str) -> Result<bool, StoreError>;

    /// Publications with `after < updated_at <= until`, oldest first.
    fn publications_updated_between(
        &self,
        after: UtcTimestamp,
        until: UtcTimestamp,
    ) -> Result<Vec<Publication>, StoreError>;

    /// Conferences with `after < updated_at <= until`, by start date.
    fn conferences_updated_between(
        &self,
        after: UtcTimestamp,
        until: UtcTimestamp,
    ) -> Result<Vec<Conference>, StoreError>;

    /// All conferences, by start date.
    fn conferences(&self) -> Result<Vec<Conference>, StoreError>;

    /// The most recent digest, if any.
    fn latest_digest(&self) -> Result<Option<DigestRecord>, StoreError>;

    /// Append a digest to the history.
    fn record_digest(&self, digest: DigestRecord) -> Result<(), StoreError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_doc<T>(&self, f: impl FnOnce(&mut StoreDocument) -> T) -> T {
        let mut doc = self
            .doc
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut doc)
    }
}

impl ContentStore for MemoryStore {
    fn insert_publication(&self, publication: &Publication) -> Result<InsertOutcome, StoreError> {
        Ok(self.with_doc(|d| d.insert_publication(publication)))
    }

    fn insert_conference(&self, conference: &Conference) -> Result<InsertOutcome, StoreError> {
        Ok(self.with_doc(|d| d.insert_conference(conference)))
    }

    fn contains_publication(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.with_doc(|d| d.has_publication(name)))
    }

    fn contains_conference(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.with_doc(|d| d.has_conference(name)))
    }

    fn publications_updated_between(
        &self,
        after: UtcTimestamp,
        until: UtcTimestamp,
    ) -> Result<Vec<Publication>, StoreError> {
        Ok(self.with_doc(|d| d.publications_between(after, until)))
    }

    fn conferences_updated_between(
        &self,
        after: UtcTimestamp,
        until: UtcTimestamp,
    ) -> Result<Vec<Conference>, StoreError> {
        Ok(self.with_doc(|d| d.conferences_between(after, until)))
    }

    fn conferences(&self) -> Result<Vec<Conference>, StoreError> {
        Ok(self.with_doc(|d| d.sorted_conferences()))
    }

    fn latest_digest(&self) -> Result<Option<DigestRecord>, StoreError> {
        Ok(self.with_doc(|d| d.latest_digest()))
    }

    fn record_digest(&self, digest: DigestRecord) -> Result<(), StoreError> {
        self.with_doc(|d| d.digests.push(digest));
        Ok(())
    }
}
