//! quarto-press - publishes research-group content as Quarto pages on GitHub
//!
//! Records (publications, arXiv imports, blog posts, researcher profiles,
//! conferences) are rendered to QMD pages, written into a local site
//! checkout, and committed to the site's GitHub repository through the Git
//! Data API without a local push. A weekly job aggregates recent records
//! into a newsletter digest.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to the pipeline)
//! - [`content`] - Records and the formatter that turns them into pages
//! - [`materialize`] - Writes pages and the CSV side-indexes to disk
//! - [`publish`] - The six-step Git Data API publish and the per-site pipeline
//! - [`forge`] - Git Data API abstraction (GitHub and an in-memory mock)
//! - [`auth`] - Bearer tokens for the API
//! - [`git`] - Fast-forward pulls of local working clones
//! - [`store`] - Persistence of records and digest history
//! - [`jobs`] - The interval scheduler and the digest job
//! - [`scrape`] - arXiv abstract-page import
//! - [`core`] - Domain types, configuration and locking
//! - [`ui`] - Terminal output
//!
//! # Correctness Invariants
//!
//! 1. A publish makes its API calls in a fixed order and stops at the first failure
//! 2. The branch ref is only ever fast-forwarded, never forced
//! 3. Local files are written before anything is sent and never rolled back
//! 4. Each digest covers exactly the records updated since the previous one

pub mod auth;
pub mod cli;
pub mod content;
pub mod core;
pub mod forge;
pub mod git;
pub mod jobs;
pub mod materialize;
pub mod publish;
pub mod scrape;
pub mod store;
pub mod ui;
