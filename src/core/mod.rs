//! core
//!
//! Domain types, configuration, and file locking shared by every layer.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RefName, UtcTimestamp
//! - [`naming`] - Slugs for page folders
//! - [`config`] - Configuration schema and loading
//! - [`lock`] - Advisory locks on shared files
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod lock;
pub mod naming;
pub mod types;
