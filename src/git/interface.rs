//! git::interface
//!
//! A local clone of a site repository, kept current by fast-forward pulls.
//!
//! # Invariants
//!
//! - A pull never creates merge commits and never rewrites local history
//! - A pull never discards a local change the incoming commit lacks
//! - Only `git2` is used; nothing shells out to the git CLI

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::core::types::{BranchName, Oid};

/// Errors from working-clone operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Requested remote does not exist.
    #[error("remote not found: {name}")]
    RemoteNotFound { name: String },

    /// Working tree has uncommitted changes.
    #[error("working tree is dirty: {details}")]
    DirtyWorktree {
        /// Description of what's dirty
        details: String,
    },

    /// Local and remote branches both have commits the other lacks.
    #[error("branch '{branch}' has diverged from '{remote}'; resolve manually")]
    Diverged { branch: String, remote: String },

    /// Fetch from the remote failed.
    #[error("fetch from '{remote}' failed: {message}")]
    FetchFailed { remote: String, message: String },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

fn to_oid(oid: git2::Oid) -> Result<Oid, GitError> {
    Oid::new(oid.to_string()).map_err(|e| GitError::Internal {
        message: e.to_string(),
    })
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The local branch already contains the remote branch.
    UpToDate,
    /// The local branch moved forward.
    FastForwarded { from: Oid, to: Oid },
}

/// Uncommitted change counts for tracked files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    pub staged: usize,
    pub unstaged: usize,
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && !self.has_conflicts
    }
}

/// A non-bare local clone.
pub struct WorkingClone {
    repo: git2::Repository,
}

impl std::fmt::Debug for WorkingClone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkingClone")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl WorkingClone {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Working directory root.
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    /// Commit HEAD points at.
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        let head = self.repo.head().map_err(|_| GitError::RefNotFound {
            refname: "HEAD".to_string(),
        })?;
        let commit = head.peel_to_commit()?;
        to_oid(commit.id())
    }

    /// Staged and unstaged changes to tracked files.
    pub fn worktree_status(&self) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut result = WorktreeStatus::default();

        for entry in statuses.iter() {
            let status = entry.status();

            if status.is_conflicted() {
                result.has_conflicts = true;
            }
            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }
            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }
        }

        Ok(result)
    }

    /// Whether tracked files are unchanged. Untracked files are ignored.
    pub fn is_clean(&self) -> Result<bool, GitError> {
        Ok(self.worktree_status()?.is_clean())
    }

    /// Get the URL for a remote, or `None` if it doesn't exist.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Paths of tracked files with staged or unstaged changes.
    fn changed_paths(&self) -> Result<(Vec<String>, bool), GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut conflicted = false;
        let paths = statuses
            .iter()
            .filter(|entry| {
                conflicted |= entry.status().is_conflicted();
                entry.status() != git2::Status::CURRENT
            })
            .filter_map(|entry| entry.path().map(String::from))
            .collect();
        Ok((paths, conflicted))
    }

    /// Whether the working copy of `path` is what `tree` holds.
    fn matches_tree(&self, tree: &git2::Tree<'_>, path: &str) -> Result<bool, GitError> {
        let on_disk = self.work_dir()?.join(path);
        match (tree.get_path(Path::new(path)).ok(), on_disk.is_file()) {
            (None, false) => Ok(true),
            (Some(entry), true) => {
                let id = git2::Oid::hash_file(git2::ObjectType::Blob, &on_disk)?;
                Ok(id == entry.id())
            }
            _ => Ok(false),
        }
    }

    /// Fetch `branch` from `remote` and fast-forward the local branch.
    ///
    /// If the branch is checked out, the working tree is updated too.
    /// Local changes to tracked files are allowed only when the incoming
    /// commit already contains them, which is the state a site clone is
    /// left in after its pages were published through the API.
    ///
    /// # Errors
    ///
    /// - [`GitError::DirtyWorktree`] if tracked files have other changes
    /// - [`GitError::Diverged`] if a fast-forward is impossible
    /// - [`GitError::FetchFailed`] if the remote cannot be reached
    pub fn pull_fast_forward(
        &self,
        remote: &str,
        branch: &BranchName,
    ) -> Result<PullOutcome, GitError> {
        let (changed, conflicted) = self.changed_paths()?;
        if conflicted {
            return Err(GitError::DirtyWorktree {
                details: "unresolved conflicts".to_string(),
            });
        }

        let mut origin = self
            .repo
            .find_remote(remote)
            .map_err(|_| GitError::RemoteNotFound {
                name: remote.to_string(),
            })?;
        let tracking = format!("refs/remotes/{}/{}", remote, branch);
        let refspec = format!("+refs/heads/{}:{}", branch, tracking);
        debug!(%remote, %refspec, "fetching");
        origin
            .fetch(&[refspec.as_str()], None, None)
            .map_err(|e| GitError::FetchFailed {
                remote: remote.to_string(),
                message: e.message().to_string(),
            })?;

        let fetched = self
            .repo
            .refname_to_id(&tracking)
            .map_err(|_| GitError::RefNotFound {
                refname: tracking.clone(),
            })?;

        let local_ref = format!("refs/heads/{}", branch);
        let mut local = self
            .repo
            .find_reference(&local_ref)
            .map_err(|_| GitError::RefNotFound {
                refname: local_ref.clone(),
            })?;
        let current = local.peel_to_commit()?.id();

        if current == fetched || self.repo.graph_descendant_of(current, fetched)? {
            debug!(%branch, "already up to date");
            return Ok(PullOutcome::UpToDate);
        }
        if !self.repo.graph_descendant_of(fetched, current)? {
            return Err(GitError::Diverged {
                branch: branch.to_string(),
                remote: remote.to_string(),
            });
        }

        if !changed.is_empty() {
            let target = self.repo.find_commit(fetched)?.tree()?;
            let mut unpublished = Vec::new();
            for path in &changed {
                if !self.matches_tree(&target, path)? {
                    unpublished.push(path.as_str());
                }
            }
            if !unpublished.is_empty() {
                return Err(GitError::DirtyWorktree {
                    details: format!("local changes to {}", unpublished.join(", ")),
                });
            }
            debug!(count = changed.len(), "local changes already upstream");
        }

        local.set_target(fetched, &format!("qpress: fast-forward {} from {}", branch, remote))?;

        let head_is_branch = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.name().map(|n| n == local_ref))
            .unwrap_or(false);
        if head_is_branch {
            self.repo
                .checkout_head(Some(git2::build::CheckoutBuilder::new().force()))?;
        }

        let outcome = PullOutcome::FastForwarded {
            from: to_oid(current)?,
            to: to_oid(fetched)?,
        };
        info!(%branch, %remote, "fast-forwarded working clone");
        Ok(outcome)
    }

    /// Parse a remote URL into owner/repo for GitHub.
    ///
    /// Handles both HTTPS and SSH URLs:
    ///
    /// ```
    /// use quarto_press::git::WorkingClone;
    ///
    /// assert_eq!(
    ///     WorkingClone::parse_github_remote("https://github.com/owner/repo.git"),
    ///     Some(("owner".to_string(), "repo".to_string()))
    /// );
    /// assert_eq!(
    ///     WorkingClone::parse_github_remote("git@github.com:owner/repo"),
    ///     Some(("owner".to_string(), "repo".to_string()))
    /// );
    /// assert_eq!(WorkingClone::parse_github_remote("/srv/git/repo.git"), None);
    /// ```
    pub fn parse_github_remote(url: &str) -> Option<(String, String)> {
        let rest = url
            .strip_prefix("https://github.com/")
            .or_else(|| url.strip_prefix("git@github.com:"))?;
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let (owner, repo) = rest.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some((owner.to_string(), repo.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_outside_repo_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            WorkingClone::open(dir.path()),
            Err(GitError::NotARepo { .. })
        ));
    }

    #[test]
    fn open_bare_repo_fails() {
        let dir = TempDir::new().unwrap();
        git2::Repository::init_bare(dir.path()).unwrap();
        assert!(matches!(WorkingClone::open(dir.path()), Err(GitError::BareRepo)));
    }

    #[test]
    fn fresh_repo_is_clean() {
        let dir = TempDir::new().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        let clone = WorkingClone::open(dir.path()).unwrap();
        assert!(clone.is_clean().unwrap());
        assert!(clone.remote_url("origin").unwrap().is_none());
    }

    #[test]
    fn parse_rejects_nested_paths() {
        assert_eq!(
            WorkingClone::parse_github_remote("https://github.com/a/b/c"),
            None
        );
        assert_eq!(WorkingClone::parse_github_remote("https://github.com/a"), None);
    }
}
