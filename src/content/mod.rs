//! content
//!
//! Content formatting: domain records in, QMD pages out.
//!
//! # Modules
//!
//! - [`records`] - Input records (publications, posts, profiles, conferences)
//! - [`front_matter`] - YAML headers with a fixed key order
//! - [`body`] - Markdown body sections
//! - [`formatter`] - Record to page transformations
//!
//! # Example
//!
//! ```
//! use quarto_press::content::{render_qmd, Formatter};
//! use quarto_press::content::records::BlogPost;
//! use quarto_press::core::types::UtcTimestamp;
//!
//! let post = BlogPost {
//!     name: "Hello World".into(),
//!     text: "First post.".into(),
//!     authors: vec![],
//!     categories: vec![],
//!     updated_at: UtcTimestamp::epoch(),
//! };
//! let page = Formatter::blog_post(&post).unwrap();
//! assert_eq!(page.target_relative_path, "posts/hello-world/index.qmd");
//! assert!(render_qmd(&page).unwrap().starts_with("---\n"));
//! ```

pub mod body;
pub mod formatter;
pub mod front_matter;
pub mod records;

pub use formatter::{DigestInput, FormatError, Formatter};
pub use front_matter::{FrontMatter, Header, Params, PLACEHOLDER_IMAGE};

use serde::{Deserialize, Serialize};

/// Top-level directory a page is written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Publications (`content/`)
    Content,
    /// Blog posts (`posts/`)
    Posts,
    /// Researcher profiles (`profiles/`)
    Profiles,
    /// Site root (the digest)
    Root,
}

impl Category {
    pub fn dir(self) -> &'static str {
        match self {
            Category::Content => "content",
            Category::Posts => "posts",
            Category::Profiles => "profiles",
            Category::Root => "",
        }
    }
}

/// One row of the publications side-index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvIndexRow {
    pub publication: String,
    /// Author names, comma-joined
    pub authors: String,
    /// Site-relative page URL (`content/<slug>`)
    pub publication_url: String,
    /// Author links, comma-joined, or `NONE`
    pub authors_link: String,
    pub research_area: String,
}

impl CsvIndexRow {
    /// `authors_link` value when no author has a link.
    pub const NO_LINKS: &'static str = "NONE";
}

/// A page ready to be written and published.
///
/// Built by [`Formatter`]; not modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishableContent {
    pub title: String,
    pub header: Header,
    pub body_sections: Vec<String>,
    pub category: Category,
    /// Repository-relative path, e.g. `content/<slug>/index.qmd`
    pub target_relative_path: String,
    /// Side-index row, for publication pages only
    pub index_row: Option<CsvIndexRow>,
}

impl PublishableContent {
    pub(crate) fn new(
        title: String,
        header: Header,
        body_sections: Vec<String>,
        category: Category,
        slug: &str,
        index_row: Option<CsvIndexRow>,
    ) -> Self {
        let target_relative_path = match (category.dir(), slug) {
            ("", "") => "index.qmd".to_string(),
            ("", slug) => format!("{}/index.qmd", slug),
            (dir, slug) => format!("{}/{}/index.qmd", dir, slug),
        };
        Self {
            title,
            header,
            body_sections,
            category,
            target_relative_path,
            index_row,
        }
    }

    /// Directory containing the page, relative to the site root.
    pub fn folder(&self) -> &str {
        self.target_relative_path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    }
}

/// Render a page as QMD: the YAML header fenced by `---`, then the body.
pub fn render_qmd(content: &PublishableContent) -> Result<String, FormatError> {
    let yaml = serde_yaml::to_string(&content.header)?;
    let mut out = String::with_capacity(yaml.len() + 64);
    out.push_str("---\n");
    out.push_str(&yaml);
    out.push_str("---\n");
    for section in &content.body_sections {
        out.push_str(section);
    }
    Ok(out)
}
