//! scrape
//!
//! Importing publication metadata from external pages.

mod arxiv;

pub use arxiv::{export_url, parse_abs_page, ArxivClient, BASE_BACKOFF, MAX_RETRIES};

use thiserror::Error;

/// Errors from fetching or parsing an external page.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Http(String),

    #[error("page has no {0}")]
    MissingField(&'static str),

    #[error("bad extraction pattern: {0}")]
    Pattern(String),
}
