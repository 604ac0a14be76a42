//! forge::mock
//!
//! In-memory Git Data API for deterministic testing.
//!
//! # Design
//!
//! The mock keeps a tiny object store (branches, commits, trees, blobs)
//! and records every call in order, so tests can assert the exact request
//! sequence of a publish. Object ids are sequential 40-hex strings.
//!
//! Ref updates follow the server rule: the new commit must have the
//! current branch head as a parent, otherwise the update is refused with
//! [`ForgeError::NotFastForward`].
//!
//! # Example
//!
//! ```
//! use quarto_press::core::types::BranchName;
//! use quarto_press::forge::mock::{MockCall, MockGitData};
//! use quarto_press::forge::GitDataApi;
//!
//! # tokio_test::block_on(async {
//! let api = MockGitData::new();
//! let head = api.branch_head(&BranchName::main()).await.unwrap();
//! let tree = api.commit_tree(&head).await.unwrap();
//!
//! assert_eq!(api.calls().len(), 2);
//! assert!(matches!(api.calls()[1], MockCall::CommitTree { .. }));
//! # let _ = tree;
//! # });
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{ForgeError, GitDataApi, NewCommit, TreeEntry};
use crate::core::types::{BranchName, Oid, RefName};

/// Mock Git Data API for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockGitData {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug, Default)]
struct MockInner {
    next_id: u64,
    /// Branch name to head commit.
    branches: HashMap<String, Oid>,
    /// Commit id to stored commit.
    commits: HashMap<Oid, StoredCommit>,
    /// Tree id to the entries layered onto its base.
    trees: HashMap<Oid, StoredTree>,
    /// Blob id to content.
    blobs: HashMap<Oid, String>,
    calls: Vec<MockCall>,
    fail_on: Option<FailOn>,
}

/// A commit held by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCommit {
    pub message: String,
    pub tree: Oid,
    pub parents: Vec<Oid>,
}

/// A tree held by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTree {
    pub base: Option<Oid>,
    pub entries: Vec<TreeEntry>,
}

/// Which call should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    BranchHead(ForgeError),
    CommitTree(ForgeError),
    /// Fail the n-th blob creation (zero-based).
    CreateBlob { nth: usize, error: ForgeError },
    CreateTree(ForgeError),
    CreateCommit(ForgeError),
    UpdateRef(ForgeError),
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    BranchHead { branch: String },
    CommitTree { commit: Oid },
    CreateBlob { content: String },
    CreateTree { base_tree: Oid, paths: Vec<String> },
    CreateCommit { message: String, parents: Vec<Oid>, tree: Oid },
    UpdateRef { reference: String, sha: Oid },
}

impl MockCall {
    /// Short name of the call, handy for asserting sequences.
    pub fn kind(&self) -> &'static str {
        match self {
            MockCall::BranchHead { .. } => "branch_head",
            MockCall::CommitTree { .. } => "commit_tree",
            MockCall::CreateBlob { .. } => "create_blob",
            MockCall::CreateTree { .. } => "create_tree",
            MockCall::CreateCommit { .. } => "create_commit",
            MockCall::UpdateRef { .. } => "update_ref",
        }
    }
}

impl MockGitData {
    /// Create a mock whose `main` branch holds one root commit with an
    /// empty tree.
    pub fn new() -> Self {
        let mock = Self {
            inner: Arc::new(Mutex::new(MockInner::default())),
        };
        {
            let mut inner = mock.lock();
            let tree = inner.mint();
            inner.trees.insert(
                tree.clone(),
                StoredTree {
                    base: None,
                    entries: Vec::new(),
                },
            );
            let root = inner.mint();
            inner.commits.insert(
                root.clone(),
                StoredCommit {
                    message: "Initial commit".to_string(),
                    tree,
                    parents: Vec::new(),
                },
            );
            inner.branches.insert("main".to_string(), root);
        }
        mock
    }

    /// Configure a failure.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear the configured failure.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Recorded call kinds, in order.
    pub fn call_kinds(&self) -> Vec<&'static str> {
        self.lock().calls.iter().map(MockCall::kind).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Current head of a branch, without recording a call.
    pub fn head_of(&self, branch: &str) -> Option<Oid> {
        self.lock().branches.get(branch).cloned()
    }

    /// Look up a commit, without recording a call.
    pub fn commit(&self, sha: &Oid) -> Option<StoredCommit> {
        self.lock().commits.get(sha).cloned()
    }

    /// Look up a tree, without recording a call.
    pub fn tree(&self, sha: &Oid) -> Option<StoredTree> {
        self.lock().trees.get(sha).cloned()
    }

    /// Look up blob content, without recording a call.
    pub fn blob(&self, sha: &Oid) -> Option<String> {
        self.lock().blobs.get(sha).cloned()
    }

    /// Simulate someone else pushing to `branch`. Returns the new head.
    pub fn advance_branch_externally(&self, branch: &str) -> Oid {
        let mut inner = self.lock();
        let parent = inner.branches.get(branch).cloned();
        let tree = parent
            .as_ref()
            .and_then(|p| inner.commits.get(p))
            .map(|c| c.tree.clone())
            .unwrap_or_else(|| inner.mint());
        let commit = inner.mint();
        inner.commits.insert(
            commit.clone(),
            StoredCommit {
                message: "External change".to_string(),
                tree,
                parents: parent.into_iter().collect(),
            },
        );
        inner.branches.insert(branch.to_string(), commit.clone());
        commit
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        // A panic in another test thread must not cascade.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockGitData {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInner {
    fn mint(&mut self) -> Oid {
        self.next_id += 1;
        // Sequential ids are always valid hex.
        Oid::new(format!("{:040x}", self.next_id))
            .unwrap_or_else(|_| unreachable!("formatted id is 40 hex digits"))
    }

    fn blob_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, MockCall::CreateBlob { .. }))
            .count()
    }
}

#[async_trait]
impl GitDataApi for MockGitData {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn branch_head(&self, branch: &BranchName) -> Result<Oid, ForgeError> {
        let mut inner = self.lock();
        inner.calls.push(MockCall::BranchHead {
            branch: branch.to_string(),
        });
        if let Some(FailOn::BranchHead(e)) = &inner.fail_on {
            return Err(e.clone());
        }
        inner
            .branches
            .get(branch.as_str())
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("Branch not found: {}", branch)))
    }

    async fn commit_tree(&self, commit: &Oid) -> Result<Oid, ForgeError> {
        let mut inner = self.lock();
        inner.calls.push(MockCall::CommitTree {
            commit: commit.clone(),
        });
        if let Some(FailOn::CommitTree(e)) = &inner.fail_on {
            return Err(e.clone());
        }
        inner
            .commits
            .get(commit)
            .map(|c| c.tree.clone())
            .ok_or_else(|| ForgeError::NotFound(format!("No commit found for SHA: {}", commit)))
    }

    async fn create_blob(&self, content: &str) -> Result<Oid, ForgeError> {
        let mut inner = self.lock();
        let index = inner.blob_count();
        inner.calls.push(MockCall::CreateBlob {
            content: content.to_string(),
        });
        if let Some(FailOn::CreateBlob { nth, error }) = &inner.fail_on {
            if *nth == index {
                return Err(error.clone());
            }
        }
        let sha = inner.mint();
        inner.blobs.insert(sha.clone(), content.to_string());
        Ok(sha)
    }

    async fn create_tree(&self, base_tree: &Oid, entries: &[TreeEntry]) -> Result<Oid, ForgeError> {
        let mut inner = self.lock();
        inner.calls.push(MockCall::CreateTree {
            base_tree: base_tree.clone(),
            paths: entries.iter().map(|e| e.path.clone()).collect(),
        });
        if let Some(FailOn::CreateTree(e)) = &inner.fail_on {
            return Err(e.clone());
        }
        if !inner.trees.contains_key(base_tree) {
            return Err(ForgeError::ApiError {
                status: 422,
                message: format!("Invalid base_tree: {}", base_tree),
            });
        }
        if let Some(missing) = entries.iter().find(|e| !inner.blobs.contains_key(&e.sha)) {
            return Err(ForgeError::ApiError {
                status: 422,
                message: format!("Invalid sha for {}", missing.path),
            });
        }
        let sha = inner.mint();
        inner.trees.insert(
            sha.clone(),
            StoredTree {
                base: Some(base_tree.clone()),
                entries: entries.to_vec(),
            },
        );
        Ok(sha)
    }

    async fn create_commit(&self, commit: &NewCommit) -> Result<Oid, ForgeError> {
        let mut inner = self.lock();
        inner.calls.push(MockCall::CreateCommit {
            message: commit.message.clone(),
            parents: commit.parents.clone(),
            tree: commit.tree.clone(),
        });
        if let Some(FailOn::CreateCommit(e)) = &inner.fail_on {
            return Err(e.clone());
        }
        if !inner.trees.contains_key(&commit.tree) {
            return Err(ForgeError::ApiError {
                status: 422,
                message: format!("Invalid tree: {}", commit.tree),
            });
        }
        let sha = inner.mint();
        inner.commits.insert(
            sha.clone(),
            StoredCommit {
                message: commit.message.clone(),
                tree: commit.tree.clone(),
                parents: commit.parents.clone(),
            },
        );
        Ok(sha)
    }

    async fn update_ref(&self, reference: &RefName, sha: &Oid) -> Result<(), ForgeError> {
        let mut inner = self.lock();
        inner.calls.push(MockCall::UpdateRef {
            reference: reference.to_string(),
            sha: sha.clone(),
        });
        if let Some(FailOn::UpdateRef(e)) = &inner.fail_on {
            return Err(e.clone());
        }
        let branch = reference
            .as_str()
            .strip_prefix("refs/heads/")
            .unwrap_or(reference.as_str())
            .to_string();
        let commit = inner
            .commits
            .get(sha)
            .cloned()
            .ok_or_else(|| ForgeError::ApiError {
                status: 422,
                message: "Object does not exist".to_string(),
            })?;
        if let Some(current) = inner.branches.get(&branch) {
            if !commit.parents.contains(current) {
                return Err(ForgeError::NotFastForward(
                    "Update is not a fast forward".to_string(),
                ));
            }
        }
        inner.branches.insert(branch, sha.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::CommitAuthor;

    fn author() -> CommitAuthor {
        CommitAuthor {
            name: "Bot".into(),
            email: "bot@example.org".into(),
        }
    }

    async fn commit_on_main(api: &MockGitData, content: &str) -> Result<Oid, ForgeError> {
        let head = api.branch_head(&BranchName::main()).await?;
        let base = api.commit_tree(&head).await?;
        let blob = api.create_blob(content).await?;
        let tree = api
            .create_tree(
                &base,
                &[TreeEntry {
                    path: "content/x/index.qmd".into(),
                    sha: blob,
                }],
            )
            .await?;
        api.create_commit(&NewCommit {
            message: "msg".into(),
            author: author(),
            parents: vec![head],
            tree,
        })
        .await
    }

    #[tokio::test]
    async fn ids_are_distinct_and_valid() {
        let api = MockGitData::new();
        let a = api.create_blob("a").await.unwrap();
        let b = api.create_blob("b").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 40);
        assert_eq!(api.blob(&a).as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn unknown_branch_not_found() {
        let api = MockGitData::new();
        let err = api
            .branch_head(&BranchName::new("gh-pages").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn fast_forward_update_moves_branch() {
        let api = MockGitData::new();
        let commit = commit_on_main(&api, "hello").await.unwrap();
        api.update_ref(&RefName::for_branch(&BranchName::main()), &commit)
            .await
            .unwrap();
        assert_eq!(api.head_of("main"), Some(commit));
        assert_eq!(
            api.call_kinds(),
            vec![
                "branch_head",
                "commit_tree",
                "create_blob",
                "create_tree",
                "create_commit",
                "update_ref"
            ]
        );
    }

    #[tokio::test]
    async fn stale_parent_is_rejected() {
        let api = MockGitData::new();
        let commit = commit_on_main(&api, "hello").await.unwrap();
        let external = api.advance_branch_externally("main");

        let err = api
            .update_ref(&RefName::for_branch(&BranchName::main()), &commit)
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::NotFastForward(_)));
        assert_eq!(api.head_of("main"), Some(external));
    }

    #[tokio::test]
    async fn tree_with_unknown_blob_rejected() {
        let api = MockGitData::new();
        let head = api.branch_head(&BranchName::main()).await.unwrap();
        let base = api.commit_tree(&head).await.unwrap();
        let bogus = Oid::new("f".repeat(40)).unwrap();
        let err = api
            .create_tree(
                &base,
                &[TreeEntry {
                    path: "a".into(),
                    sha: bogus,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::ApiError { status: 422, .. }));
    }

    #[tokio::test]
    async fn fail_on_nth_blob() {
        let api = MockGitData::new().fail_on(FailOn::CreateBlob {
            nth: 1,
            error: ForgeError::RateLimited,
        });
        assert!(api.create_blob("first").await.is_ok());
        assert_eq!(
            api.create_blob("second").await.unwrap_err(),
            ForgeError::RateLimited
        );
        api.clear_fail_on();
        assert!(api.create_blob("third").await.is_ok());
    }

    #[test]
    fn clones_share_state() {
        let api = MockGitData::new();
        let clone = api.clone();
        clone.advance_branch_externally("main");
        assert_eq!(api.head_of("main"), clone.head_of("main"));
    }

    #[test]
    fn forge_name() {
        assert_eq!(MockGitData::new().name(), "mock");
    }
}
