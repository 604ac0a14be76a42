//! content::formatter
//!
//! Turns domain records into [`PublishableContent`].
//!
//! Formatting is pure: nothing here touches the filesystem or network.

use thiserror::Error;
use tracing::debug;

use super::body::{self, DigestPost};
use super::front_matter::{DigestHeader, FrontMatter, Header, Params};
use super::records::{
    ArxivRecord, Author, BlogPost, Conference, Publication, ResearcherProfile,
};
use super::{Category, CsvIndexRow, PublishableContent};
use crate::core::naming::slugify;

/// Errors from formatting.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A required field is empty.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// The title produced an empty slug.
    #[error("title '{0}' has no characters usable in a path")]
    EmptySlug(String),

    /// YAML serialization failed.
    #[error("failed to serialize front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The author list could not be encoded for the page script.
    #[error("failed to encode author names: {0}")]
    Json(#[from] serde_json::Error),
}

/// Category label given to every blog post.
pub const BLOG_POST_CATEGORY: &str = "blog post";

/// Input for the newsletter digest.
#[derive(Debug, Clone)]
pub struct DigestInput {
    /// Public URL of the publications site.
    pub site_url: String,
    pub publications: Vec<Publication>,
    pub conferences: Vec<Conference>,
}

/// Builds pages from records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter;

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn require_title(title: &str) -> Result<(String, String), FormatError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(FormatError::MissingField("title"));
    }
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(FormatError::EmptySlug(title.to_string()));
    }
    Ok((title.to_string(), slug))
}

/// Reorder a citation-style name ("Last, First") as "First Last".
///
/// The last comma-separated segment moves to the front; names without a
/// comma are returned trimmed.
pub fn citation_name_to_display(name: &str) -> String {
    let mut parts: Vec<&str> = name.split(',').map(str::trim).collect();
    if let Some(last) = parts.pop() {
        parts.insert(0, last);
    }
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First paragraph of a text, used as a page description.
fn first_paragraph(text: &str) -> String {
    text.trim()
        .split("\n\n")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn index_row(title: &str, slug: &str, authors: &[Author], research_area: Option<&str>) -> CsvIndexRow {
    let names: Vec<&str> = authors.iter().map(|a| a.name.as_str()).collect();
    let links: Vec<&str> = authors.iter().filter_map(|a| a.url.as_deref()).collect();
    CsvIndexRow {
        publication: title.to_string(),
        authors: names.join(","),
        publication_url: format!("{}/{}", Category::Content.dir(), slug),
        authors_link: if links.is_empty() {
            CsvIndexRow::NO_LINKS.to_string()
        } else {
            links.join(",")
        },
        research_area: research_area.unwrap_or_default().to_string(),
    }
}

impl Formatter {
    /// A publication page under `content/<slug>/index.qmd`, with its
    /// side-index row.
    pub fn publication(publication: &Publication) -> Result<PublishableContent, FormatError> {
        let (title, slug) = require_title(&publication.name)?;
        let research_area = publication.research_areas.first().map(|a| a.title().to_string());

        let mut front_matter = FrontMatter::new(
            title.clone(),
            publication.overview.clone(),
            publication.thumbnail.as_deref(),
            publication
                .research_areas
                .iter()
                .map(|a| a.title().to_string())
                .collect(),
        );
        front_matter.params = Params {
            overview: Some(publication.overview.clone()),
            citation: non_empty(&publication.citation),
            pdf_url: non_empty(&publication.pdf),
            poster_url: non_empty(&publication.poster),
            code_url: non_empty(&publication.code),
            supplement_url: non_empty(&publication.supplement),
            slides_url: non_empty(&publication.slides),
            research_area: research_area.clone(),
            authors: publication.authors.clone(),
        };

        let names: Vec<String> = publication.authors.iter().map(|a| a.name.clone()).collect();
        let body_sections = body::publication(&names, &front_matter.params)?;
        let row = index_row(&title, &slug, &publication.authors, research_area.as_deref());

        debug!(%slug, authors = names.len(), "formatted publication");
        Ok(PublishableContent::new(
            title,
            Header::Page(front_matter),
            body_sections,
            Category::Content,
            &slug,
            Some(row),
        ))
    }

    /// A publication page built from an arXiv scrape.
    ///
    /// Author names are converted from citation order before rendering;
    /// the image is always the placeholder.
    pub fn arxiv(record: &ArxivRecord) -> Result<PublishableContent, FormatError> {
        let (title, slug) = require_title(&record.title)?;
        let research_area = non_empty(&record.research_area);

        let authors: Vec<Author> = record
            .authors
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                Author::new(
                    citation_name_to_display(name),
                    record.author_links.get(idx).cloned(),
                )
            })
            .collect();

        let mut front_matter = FrontMatter::new(
            title.clone(),
            record.abstract_text.clone(),
            None,
            research_area.iter().cloned().collect(),
        );
        front_matter.params = Params {
            overview: Some(record.abstract_text.clone()),
            pdf_url: non_empty(&record.pdf_url),
            research_area: research_area.clone(),
            authors: authors.clone(),
            ..Default::default()
        };

        let names: Vec<String> = authors.iter().map(|a| a.name.clone()).collect();
        let body_sections = body::publication(&names, &front_matter.params)?;
        let row = index_row(&title, &slug, &authors, research_area.as_deref());

        debug!(%slug, authors = names.len(), "formatted arxiv record");
        Ok(PublishableContent::new(
            title,
            Header::Page(front_matter),
            body_sections,
            Category::Content,
            &slug,
            Some(row),
        ))
    }

    /// A blog post under `posts/<slug>/index.qmd`.
    pub fn blog_post(post: &BlogPost) -> Result<PublishableContent, FormatError> {
        let (title, slug) = require_title(&post.name)?;

        let mut categories = vec![BLOG_POST_CATEGORY.to_string()];
        for category in &post.categories {
            let category = category.trim().to_lowercase();
            if !category.is_empty() && !categories.contains(&category) {
                categories.push(category);
            }
        }

        let mut front_matter =
            FrontMatter::new(title.clone(), first_paragraph(&post.text), None, categories);
        front_matter.params.authors = post.authors.clone();

        Ok(PublishableContent::new(
            title,
            Header::Page(front_matter),
            body::blog_post(&post.text),
            Category::Posts,
            &slug,
            None,
        ))
    }

    /// A researcher profile under `profiles/<slug>/index.qmd`.
    pub fn profile(profile: &ResearcherProfile) -> Result<PublishableContent, FormatError> {
        let (name, slug) = require_title(&profile.name)?;
        let bio = non_empty(&profile.bio);

        let mut front_matter = FrontMatter::new(
            name.clone(),
            bio.as_deref().map(first_paragraph).unwrap_or_default(),
            None,
            profile
                .research_areas
                .iter()
                .map(|a| a.title().to_string())
                .collect(),
        );
        front_matter.params.research_area =
            profile.research_areas.first().map(|a| a.title().to_string());

        Ok(PublishableContent::new(
            name,
            Header::Page(front_matter),
            body::profile(
                bio.as_deref(),
                profile.url.as_deref(),
                profile.orcid.as_deref(),
            ),
            Category::Profiles,
            &slug,
            None,
        ))
    }

    /// The newsletter digest at the site root (`index.qmd`).
    pub fn digest(input: &DigestInput) -> Result<PublishableContent, FormatError> {
        let header = DigestHeader::default();
        let posts: Vec<DigestPost> = input
            .publications
            .iter()
            .map(|p| DigestPost {
                title: p.name.clone(),
                slug: slugify(&p.name),
                overview: p.overview.clone(),
            })
            .collect();

        let mut conferences = input.conferences.clone();
        conferences.sort_by_key(Conference::start_date);

        Ok(PublishableContent::new(
            header.title.clone(),
            Header::Digest(header),
            body::digest(&input.site_url, &posts, &conferences),
            Category::Root,
            "",
            None,
        ))
    }
}
