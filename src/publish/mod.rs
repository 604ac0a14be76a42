//! publish
//!
//! Makes locally materialized files visible on a remote branch through
//! the Git Data API.
//!
//! # Protocol
//!
//! One publish is exactly six calls, strictly in order, each consuming
//! the previous result:
//!
//! 1. resolve the branch head commit
//! 2. resolve that commit's tree (the base tree)
//! 3. create one blob per file, in file order
//! 4. create a tree layering the new blobs on the base tree
//! 5. create a commit whose parent is the head from step 1
//! 6. move the branch ref to the new commit
//!
//! Nothing is visible to readers of the repository until step 6.
//!
//! # Failure
//!
//! Publishing is not atomic. If a step fails, objects created by earlier
//! steps stay on the server unreferenced and no ref is moved. Local files
//! are never touched. The ref update refuses to overwrite a branch that
//! moved after step 1 ([`ForgeError::NotFastForward`]); the caller may
//! simply publish again.

pub mod pipeline;

pub use pipeline::{Pipeline, PipelineError, PipelineOutcome};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::core::types::{BranchName, Oid, RefName};
use crate::forge::{CommitAuthor, ForgeError, GitDataApi, NewCommit, TreeEntry};

/// The six protocol steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    ResolveHead,
    ResolveBaseTree,
    CreateBlob,
    CreateTree,
    CreateCommit,
    UpdateRef,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishStep::ResolveHead => "resolve branch head",
            PublishStep::ResolveBaseTree => "resolve base tree",
            PublishStep::CreateBlob => "create blob",
            PublishStep::CreateTree => "create tree",
            PublishStep::CreateCommit => "create commit",
            PublishStep::UpdateRef => "update ref",
        };
        f.write_str(name)
    }
}

/// Errors from publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    /// A remote call failed; no ref was updated unless `step` is the last.
    #[error("publish failed at '{step}': {source}")]
    Step {
        step: PublishStep,
        #[source]
        source: ForgeError,
    },

    /// A local file could not be read as UTF-8 text.
    #[error("failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Nothing to publish.
    #[error("no files to publish")]
    NoFiles,
}

impl PublishError {
    /// The failed step, if the failure was remote.
    pub fn step(&self) -> Option<PublishStep> {
        match self {
            PublishError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// A local file and the repository path it is published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFile {
    pub local_path: PathBuf,
    /// Repository-relative path, forward slashes
    pub repo_path: String,
}

impl PublishFile {
    pub fn new(local_path: impl Into<PathBuf>, repo_path: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            repo_path: repo_path.into(),
        }
    }
}

/// Object ids produced by a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub parent: Oid,
    pub base_tree: Oid,
    /// One per file, in file order
    pub blobs: Vec<Oid>,
    pub tree: Oid,
    pub commit: Oid,
}

/// Default commit message for files under `folder`.
pub fn default_commit_message(folder: &str) -> String {
    format!("Add new files at {}", folder)
}

/// Drives the publish protocol against one repository branch.
#[derive(Clone)]
pub struct Publisher {
    api: Arc<dyn GitDataApi>,
    branch: BranchName,
    author: CommitAuthor,
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("api", &self.api.name())
            .field("branch", &self.branch)
            .field("author", &self.author)
            .finish()
    }
}

impl Publisher {
    pub fn new(api: Arc<dyn GitDataApi>, branch: BranchName, author: CommitAuthor) -> Self {
        Self {
            api,
            branch,
            author,
        }
    }

    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// Publish `files` as a single commit.
    ///
    /// Files are read before any remote call, so a missing file never
    /// leaves objects behind on the server.
    pub async fn publish(
        &self,
        files: &[PublishFile],
        message: &str,
    ) -> Result<PublishReceipt, PublishError> {
        if files.is_empty() {
            return Err(PublishError::NoFiles);
        }

        let mut contents = Vec::with_capacity(files.len());
        for file in files {
            let text = std::fs::read_to_string(&file.local_path).map_err(|e| {
                PublishError::ReadFile {
                    path: file.local_path.clone(),
                    source: e,
                }
            })?;
            contents.push(text);
        }

        let step = |step: PublishStep| move |source: ForgeError| PublishError::Step { step, source };

        let parent = self
            .api
            .branch_head(&self.branch)
            .await
            .map_err(step(PublishStep::ResolveHead))?;
        debug!(branch = %self.branch, sha = %parent.short(7), "resolved branch head");

        let base_tree = self
            .api
            .commit_tree(&parent)
            .await
            .map_err(step(PublishStep::ResolveBaseTree))?;
        debug!(sha = %base_tree.short(7), "resolved base tree");

        let mut blobs = Vec::with_capacity(files.len());
        for (file, text) in files.iter().zip(&contents) {
            let blob = self
                .api
                .create_blob(text)
                .await
                .map_err(step(PublishStep::CreateBlob))?;
            debug!(path = %file.repo_path, sha = %blob.short(7), "created blob");
            blobs.push(blob);
        }

        let entries: Vec<TreeEntry> = files
            .iter()
            .zip(&blobs)
            .map(|(file, sha)| TreeEntry {
                path: file.repo_path.clone(),
                sha: sha.clone(),
            })
            .collect();
        let tree = self
            .api
            .create_tree(&base_tree, &entries)
            .await
            .map_err(step(PublishStep::CreateTree))?;
        debug!(sha = %tree.short(7), entries = entries.len(), "created tree");

        let commit = self
            .api
            .create_commit(&NewCommit {
                message: message.to_string(),
                author: self.author.clone(),
                parents: vec![parent.clone()],
                tree: tree.clone(),
            })
            .await
            .map_err(step(PublishStep::CreateCommit))?;
        debug!(sha = %commit.short(7), "created commit");

        self.api
            .update_ref(&RefName::for_branch(&self.branch), &commit)
            .await
            .map_err(step(PublishStep::UpdateRef))?;

        info!(
            forge = self.api.name(),
            branch = %self.branch,
            commit = %commit.short(7),
            files = files.len(),
            "published"
        );

        Ok(PublishReceipt {
            parent,
            base_tree,
            blobs,
            tree,
            commit,
        })
    }
}
