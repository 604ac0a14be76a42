//! store::document
//!
//! The record collection shared by both store implementations.

use serde::{Deserialize, Serialize};

use super::{in_window, DigestRecord, InsertOutcome};
use crate::content::records::{Conference, Publication};
use crate::core::types::UtcTimestamp;

/// Store schema version.
pub(crate) const STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StoreDocument {
    pub version: u32,
    #[serde(default)]
    pub publications: Vec<Publication>,
    #[serde(default)]
    pub conferences: Vec<Conference>,
    #[serde(default)]
    pub digests: Vec<DigestRecord>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            publications: Vec::new(),
            conferences: Vec::new(),
            digests: Vec::new(),
        }
    }
}

impl StoreDocument {
    pub fn insert_publication(&mut self, publication: &Publication) -> InsertOutcome {
        if self.has_publication(&publication.name) {
            return InsertOutcome::AlreadyExists;
        }
        self.publications.push(publication.clone());
        InsertOutcome::Inserted
    }

    pub fn insert_conference(&mut self, conference: &Conference) -> InsertOutcome {
        if self.has_conference(&conference.name) {
            return InsertOutcome::AlreadyExists;
        }
        self.conferences.push(conference.clone());
        InsertOutcome::Inserted
    }

    pub fn has_publication(&self, name: &str) -> bool {
        self.publications.iter().any(|p| p.name == name)
    }

    pub fn has_conference(&self, name: &str) -> bool {
        self.conferences.iter().any(|c| c.name == name)
    }

    pub fn publications_between(&self, after: UtcTimestamp, until: UtcTimestamp) -> Vec<Publication> {
        let mut selected: Vec<Publication> = self
            .publications
            .iter()
            .filter(|p| in_window(p.updated_at, after, until))
            .cloned()
            .collect();
        selected.sort_by_key(|p| p.updated_at);
        selected
    }

    pub fn conferences_between(&self, after: UtcTimestamp, until: UtcTimestamp) -> Vec<Conference> {
        let mut selected: Vec<Conference> = self
            .conferences
            .iter()
            .filter(|c| in_window(c.updated_at, after, until))
            .cloned()
            .collect();
        selected.sort_by_key(Conference::start_date);
        selected
    }

    pub fn sorted_conferences(&self) -> Vec<Conference> {
        let mut all = self.conferences.clone();
        all.sort_by_key(Conference::start_date);
        all
    }

    pub fn latest_digest(&self) -> Option<DigestRecord> {
        self.digests.iter().max_by_key(|d| d.created_at).cloned()
    }
}
