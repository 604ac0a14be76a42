//! content::front_matter
//!
//! YAML headers of generated QMD pages.
//!
//! Key order is significant: the site templates read the header as
//! written, so fields are declared in output order and `params` is
//! serialized by hand.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::records::Author;

/// Image used when a page has no thumbnail.
pub const PLACEHOLDER_IMAGE: &str = "https://upload.wikimedia.org/wikipedia/commons/5/59/Empty.png";

/// Header of a content page (publication, post, profile).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontMatter {
    pub title: String,
    pub description: String,
    pub image: String,
    pub categories: Vec<String>,
    pub format: FormatOptions,
    pub execute: ExecuteOptions,
    #[serde(skip_serializing_if = "Params::is_empty")]
    pub params: Params,
}

impl FrontMatter {
    /// A header with the fixed rendering flags and no params.
    ///
    /// An empty or missing image falls back to [`PLACEHOLDER_IMAGE`].
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        image: Option<&str>,
        categories: Vec<String>,
    ) -> Self {
        let image = image
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(PLACEHOLDER_IMAGE)
            .to_string();
        Self {
            title: title.into(),
            description: description.into(),
            image,
            categories,
            format: FormatOptions::default(),
            execute: ExecuteOptions::default(),
            params: Params::default(),
        }
    }
}

/// `format:` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatOptions {
    pub html: HtmlFormat,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            html: HtmlFormat {
                df_print: "paged".to_string(),
                toc: true,
            },
        }
    }
}

/// `format.html:` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlFormat {
    #[serde(rename = "df-print")]
    pub df_print: String,
    pub toc: bool,
}

/// `execute:` block. Code cells never echo their source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecuteOptions {
    pub echo: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self { echo: false }
    }
}

/// Optional page metadata read by the site's templates.
///
/// Serialized as `overview`, `citation`, `pdf_url`, `poster_url`,
/// `code_url`, `supplement_url`, `slides_url`, `research_area`, then
/// `author_1 .. author_n`. Empty values are left out entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pub overview: Option<String>,
    pub citation: Option<String>,
    pub pdf_url: Option<String>,
    pub poster_url: Option<String>,
    pub code_url: Option<String>,
    pub supplement_url: Option<String>,
    pub slides_url: Option<String>,
    pub research_area: Option<String>,
    pub authors: Vec<Author>,
}

impl Params {
    /// Populated scalar entries in output order.
    pub fn scalar_entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("overview", &self.overview),
            ("citation", &self.citation),
            ("pdf_url", &self.pdf_url),
            ("poster_url", &self.poster_url),
            ("code_url", &self.code_url),
            ("supplement_url", &self.supplement_url),
            ("slides_url", &self.slides_url),
            ("research_area", &self.research_area),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (key, v))
        })
        .collect()
    }

    /// Whether a key would be emitted.
    pub fn has(&self, key: &str) -> bool {
        self.scalar_entries().iter().any(|(k, _)| *k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.scalar_entries().is_empty() && self.authors.is_empty()
    }
}

#[derive(Serialize)]
struct AuthorParam<'a> {
    name: &'a str,
    url: Option<&'a str>,
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let scalars = self.scalar_entries();
        let mut map = serializer.serialize_map(Some(scalars.len() + self.authors.len()))?;
        for (key, value) in scalars {
            map.serialize_entry(key, value)?;
        }
        for (idx, author) in self.authors.iter().enumerate() {
            map.serialize_entry(
                &format!("author_{}", idx + 1),
                &AuthorParam {
                    name: &author.name,
                    url: author.url.as_deref(),
                },
            )?;
        }
        map.end()
    }
}

/// Header of the newsletter digest page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestHeader {
    pub title: String,
    #[serde(rename = "page-layout")]
    pub page_layout: String,
    #[serde(rename = "title-block-banner")]
    pub title_block_banner: bool,
    pub comments: bool,
}

impl Default for DigestHeader {
    fn default() -> Self {
        Self {
            title: "Interactive AI CDT Newsletter".to_string(),
            page_layout: "full".to_string(),
            title_block_banner: true,
            comments: false,
        }
    }
}

/// Either header kind, as carried by a publishable page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Header {
    Page(FrontMatter),
    Digest(DigestHeader),
}
