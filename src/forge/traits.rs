//! forge::traits
//!
//! The Git Data API surface the publisher drives.
//!
//! # Design
//!
//! The trait is async because every operation is a network round trip.
//! Each method maps to exactly one REST call, so the publisher controls
//! ordering and nothing here batches or reorders requests.
//!
//! # Example
//!
//! ```ignore
//! use quarto_press::forge::{GitDataApi, ForgeError};
//! use quarto_press::core::types::BranchName;
//!
//! async fn head_tree(api: &dyn GitDataApi) -> Result<(), ForgeError> {
//!     let head = api.branch_head(&BranchName::main()).await?;
//!     let tree = api.commit_tree(&head).await?;
//!     println!("main is at {} (tree {})", head.short(7), tree.short(7));
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{BranchName, Oid, RefName};

/// Errors from forge operations.
///
/// These map the failure modes of the GitHub REST API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// The ref update was rejected because the branch moved underneath us.
    #[error("ref update is not a fast-forward: {0}")]
    NotFastForward(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error (including timeouts).
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Identity recorded as a commit's author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// One path in a tree being created on top of a base tree.
///
/// Mode is always `100644` and type always `blob`: the publisher only
/// writes regular text files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Repository-relative path (forward slashes)
    pub path: String,
    /// Blob the path points at
    pub sha: Oid,
}

impl TreeEntry {
    pub const MODE: &'static str = "100644";
    pub const KIND: &'static str = "blob";
}

/// A commit to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit {
    pub message: String,
    pub author: CommitAuthor,
    pub parents: Vec<Oid>,
    pub tree: Oid,
}

/// Low-level Git object operations on a single remote repository.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a publisher can be shared
/// between the CLI and the scheduler task.
///
/// # Error Handling
///
/// Every method returns `Result<T, ForgeError>`. Nothing is rolled back:
/// blobs and trees created before a failure stay on the server unreferenced.
#[async_trait]
pub trait GitDataApi: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Resolve the commit a branch points at.
    async fn branch_head(&self, branch: &BranchName) -> Result<Oid, ForgeError>;

    /// Resolve the tree of a commit.
    async fn commit_tree(&self, commit: &Oid) -> Result<Oid, ForgeError>;

    /// Store UTF-8 text as a blob.
    async fn create_blob(&self, content: &str) -> Result<Oid, ForgeError>;

    /// Create a tree layering `entries` on top of `base_tree`.
    async fn create_tree(&self, base_tree: &Oid, entries: &[TreeEntry]) -> Result<Oid, ForgeError>;

    /// Create a commit object.
    async fn create_commit(&self, commit: &NewCommit) -> Result<Oid, ForgeError>;

    /// Point `reference` at `sha`.
    ///
    /// Implementations must refuse non-fast-forward updates and report them
    /// as [`ForgeError::NotFastForward`].
    async fn update_ref(&self, reference: &RefName, sha: &Oid) -> Result<(), ForgeError>;
}
