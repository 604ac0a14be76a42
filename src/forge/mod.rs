//! forge
//!
//! Remote repository access through the Git Data API.
//!
//! # Architecture
//!
//! The [`GitDataApi`] trait exposes the six object-level calls the
//! publisher needs. The publisher owns the ordering; implementations only
//! translate one call into one request.
//!
//! # Modules
//!
//! - `traits`: Core `GitDataApi` trait and request/response types
//! - [`github`]: GitHub REST implementation
//! - [`mock`]: In-memory implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use quarto_press::forge::github::GitHubDataApi;
//! use quarto_press::forge::GitDataApi;
//!
//! let api = GitHubDataApi::new(provider, "research-group", "icr")?;
//! let head = api.branch_head(&BranchName::main()).await?;
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
