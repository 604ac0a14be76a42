//! materialize
//!
//! Writes formatted pages to the local site tree.
//!
//! This is the last step of a preview run and the first of a publish:
//! the publisher reads back exactly the bytes written here. Nothing in
//! this module touches the network.
//!
//! Stale directories from renamed titles are left alone.

pub mod csv_index;

pub use csv_index::{AppendOutcome, ConferenceCalendar, CsvIndex};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::content::{render_qmd, FormatError, PublishableContent};
use crate::core::lock::LockError;

/// Errors from local writes.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("csv error in '{path}': {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// A page written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedFile {
    pub absolute_path: PathBuf,
    /// Repository-relative path, forward slashes
    pub relative_path: String,
}

/// Writes pages under a content root.
#[derive(Debug, Clone)]
pub struct Materializer {
    root: PathBuf,
}

impl Materializer {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            root: content_root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Render `content` and write it to `<root>/<target_relative_path>`,
    /// replacing any existing file.
    pub fn write(&self, content: &PublishableContent) -> Result<MaterializedFile, MaterializeError> {
        let rendered = render_qmd(content)?;
        let absolute_path = self.root.join(&content.target_relative_path);

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent).map_err(|e| MaterializeError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        write_atomic(&absolute_path, rendered.as_bytes())?;
        debug!(path = %absolute_path.display(), bytes = rendered.len(), "wrote page");

        Ok(MaterializedFile {
            absolute_path,
            relative_path: content.target_relative_path.clone(),
        })
    }
}

/// Write through a temp file in the same directory, then rename over the
/// target.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MaterializeError> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, bytes).map_err(|e| MaterializeError::Write {
        path: tmp.clone(),
        source: e,
    })?;
    fs::rename(&tmp, path).map_err(|e| MaterializeError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::records::BlogPost;
    use crate::content::Formatter;
    use crate::core::types::UtcTimestamp;
    use tempfile::TempDir;

    fn post(text: &str) -> PublishableContent {
        Formatter::blog_post(&BlogPost {
            name: "Hello World".into(),
            text: text.into(),
            authors: vec![],
            categories: vec![],
            updated_at: UtcTimestamp::epoch(),
        })
        .unwrap()
    }

    #[test]
    fn writes_under_root_creating_parents() {
        let dir = TempDir::new().unwrap();
        let materializer = Materializer::new(dir.path().join("site"));

        let file = materializer.write(&post("First.")).unwrap();
        assert_eq!(file.relative_path, "posts/hello-world/index.qmd");
        assert_eq!(
            file.absolute_path,
            dir.path().join("site/posts/hello-world/index.qmd")
        );
        let written = fs::read_to_string(&file.absolute_path).unwrap();
        assert!(written.starts_with("---\n"));
        assert!(written.contains("First."));
    }

    #[test]
    fn same_title_overwrites() {
        let dir = TempDir::new().unwrap();
        let materializer = Materializer::new(dir.path());

        materializer.write(&post("Old.")).unwrap();
        let file = materializer.write(&post("New.")).unwrap();

        let written = fs::read_to_string(&file.absolute_path).unwrap();
        assert!(written.contains("New."));
        assert!(!written.contains("Old."));
        assert!(!file.absolute_path.with_file_name("index.qmd.tmp").exists());
    }
}
