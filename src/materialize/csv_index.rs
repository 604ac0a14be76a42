//! materialize::csv_index
//!
//! CSV files kept next to the site sources: the publications side-index
//! (read by the site's author search) and the conference calendar.
//!
//! # Invariants
//!
//! - The side-index never holds two rows with the same
//!   (publication, authors) pair; the first one written wins
//! - Existing rows are preserved in order
//! - Every rewrite goes through a temp file and a rename, under the
//!   file's advisory lock

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::{write_atomic, MaterializeError};
use crate::content::records::Conference;
use crate::content::CsvIndexRow;
use crate::core::lock::FileLock;

/// Result of appending to the side-index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// A row with the same publication and authors already existed.
    Duplicate,
}

/// The publications side-index.
#[derive(Debug, Clone)]
pub struct CsvIndex {
    path: PathBuf,
}

impl CsvIndex {
    /// Column header written when the file is created.
    pub const HEADER: [&'static str; 5] = [
        "publication",
        "authors",
        "publication_url",
        "authors_link",
        "research_area",
    ];

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All rows currently in the index. A missing file reads as empty.
    pub fn rows(&self) -> Result<Vec<CsvIndexRow>, MaterializeError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| self.csv_error(e))?;
        reader
            .deserialize()
            .collect::<Result<Vec<CsvIndexRow>, _>>()
            .map_err(|e| self.csv_error(e))
    }

    /// Append `row`, de-duplicate and rewrite the file.
    pub fn append(&self, row: &CsvIndexRow) -> Result<AppendOutcome, MaterializeError> {
        let _lock = FileLock::acquire(&self.path)?;

        let mut rows = self.rows()?;
        rows.push(row.clone());

        let before = rows.len();
        let mut seen: Vec<(String, String)> = Vec::with_capacity(rows.len());
        rows.retain(|r| {
            let key = (r.publication.clone(), r.authors.clone());
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
        let outcome = if rows.len() < before {
            AppendOutcome::Duplicate
        } else {
            AppendOutcome::Appended
        };

        self.rewrite(&rows)?;
        debug!(path = %self.path.display(), rows = rows.len(), ?outcome, "updated side-index");
        Ok(outcome)
    }

    fn rewrite(&self, rows: &[CsvIndexRow]) -> Result<(), MaterializeError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(Self::HEADER)
            .map_err(|e| self.csv_error(e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| self.csv_error(e))?;
        }
        let bytes = writer.into_inner().map_err(|e| MaterializeError::Write {
            path: self.path.clone(),
            source: e.into_error(),
        })?;
        ensure_parent(&self.path)?;
        write_atomic(&self.path, &bytes)
    }

    fn csv_error(&self, source: csv::Error) -> MaterializeError {
        MaterializeError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<(), MaterializeError> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| MaterializeError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        }),
        None => Ok(()),
    }
}

#[derive(Serialize)]
struct CalendarRow<'a> {
    name: &'a str,
    url: &'a str,
    location: &'a str,
    start_date: String,
    end_date: String,
}

/// The conference calendar CSV, rewritten in full on every change.
pub struct ConferenceCalendar;

impl ConferenceCalendar {
    /// Replace the calendar at `path` with `conferences`, ordered by
    /// start date.
    pub fn write(path: &Path, conferences: &[Conference]) -> Result<(), MaterializeError> {
        let _lock = FileLock::acquire(path)?;

        let mut sorted: Vec<&Conference> = conferences.iter().collect();
        sorted.sort_by_key(|c| (c.start_date(), c.name.clone()));

        let csv_error = |source: csv::Error| MaterializeError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_writer(Vec::new());
        for conference in sorted {
            writer
                .serialize(CalendarRow {
                    name: &conference.name,
                    url: conference.url.as_deref().unwrap_or_default(),
                    location: &conference.location,
                    start_date: conference.start_date().to_string(),
                    end_date: conference.end_date().to_string(),
                })
                .map_err(csv_error)?;
        }
        if conferences.is_empty() {
            writer
                .write_record(["name", "url", "location", "start_date", "end_date"])
                .map_err(csv_error)?;
        }
        let bytes = writer.into_inner().map_err(|e| MaterializeError::Write {
            path: path.to_path_buf(),
            source: e.into_error(),
        })?;

        ensure_parent(path)?;
        write_atomic(path, &bytes)?;
        debug!(path = %path.display(), rows = conferences.len(), "wrote conference calendar");
        Ok(())
    }
}
