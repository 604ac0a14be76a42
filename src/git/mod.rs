//! git
//!
//! Local working clones of site repositories.
//!
//! # Architecture
//!
//! This module is the only place that imports `git2`. Remote publishing
//! goes through [`crate::forge`] and never needs a clone; a clone is only
//! pulled before the newsletter and calendar publishes so that the local
//! tree they are generated into reflects what other publishers pushed.
//!
//! # Example
//!
//! ```ignore
//! use quarto_press::git::{PullOutcome, WorkingClone};
//! use quarto_press::core::types::BranchName;
//!
//! let clone = WorkingClone::open(Path::new("newsletter_frontend"))?;
//! match clone.pull_fast_forward("origin", &BranchName::main())? {
//!     PullOutcome::UpToDate => {}
//!     PullOutcome::FastForwarded { from, to } => println!("{} -> {}", from.short(7), to.short(7)),
//! }
//! ```

mod interface;

pub use interface::{GitError, PullOutcome, WorkingClone, WorktreeStatus};
