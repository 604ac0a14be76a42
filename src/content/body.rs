//! content::body
//!
//! Markdown body sections. Each function returns the sections in page
//! order; [`super::render_qmd`] concatenates them after the header.

use super::front_matter::Params;
use super::records::Conference;

/// Resource badges, in the order they appear on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Citation,
    Pdf,
    Supplement,
    Slides,
    Poster,
    Code,
}

impl Badge {
    pub const ORDER: [Badge; 6] = [
        Badge::Citation,
        Badge::Pdf,
        Badge::Supplement,
        Badge::Slides,
        Badge::Poster,
        Badge::Code,
    ];

    /// The params key the badge links to.
    pub fn param_key(self) -> &'static str {
        match self {
            Badge::Citation => "citation",
            Badge::Pdf => "pdf_url",
            Badge::Supplement => "supplement_url",
            Badge::Slides => "slides_url",
            Badge::Poster => "poster_url",
            Badge::Code => "code_url",
        }
    }

    fn shield(self) -> &'static str {
        match self {
            Badge::Citation => "citation-scholar-9cf?style=flat.svg",
            Badge::Pdf => "PDF-green?style=flat",
            Badge::Supplement => "supplement-yellowgreen?style=flat",
            Badge::Slides => "blog-blue?style=flat",
            Badge::Poster => "poster-yellow?style=flat",
            Badge::Code => "code-blueviolet?style=flat",
        }
    }

    /// One markdown line: a shields.io image linking to the param value.
    pub fn line(self) -> String {
        format!(
            "[![](https://img.shields.io/badge/{})]({{{{< meta params.{} >}}}})\n",
            self.shield(),
            self.param_key()
        )
    }
}

fn ojs_block(code: &str) -> String {
    format!("\n```{{ojs}} \n\n {} \n\n``` \n", code)
}

/// JS array literal of author names for the client-side author index.
fn names_literal(names: &[String]) -> Result<String, serde_json::Error> {
    Ok(format!("names = {}", serde_json::to_string(names)?))
}

/// Body of a publication page.
///
/// # Errors
///
/// Fails only if the author names cannot be encoded as a JS literal.
pub fn publication(author_names: &[String], params: &Params) -> Result<Vec<String>, serde_json::Error> {
    let overview = params.overview.as_deref().unwrap_or_default();

    let mut sections = vec![
        ojs_block(&names_literal(author_names)?),
        format!("\n## Tldr \n{}\n", overview),
        format!(
            "\n## Paper-authors\n{}{}{}",
            ojs_block(
                "html`<ul>${names.map(name => html`<li><a href=\"../../posts_by_author.html?name=${name}\" >${name}</a></li>`)}</ul>`"
            ),
            ojs_block("htl = require(\"htl@0.2\")"),
            ojs_block("html = htl.html"),
        ),
    ];

    let mut resources = String::from("\n## More Resources\n");
    for badge in Badge::ORDER {
        if params.has(badge.param_key()) {
            resources.push_str(&badge.line());
        }
    }
    sections.push(resources);
    Ok(sections)
}

/// Body of a blog post: the text as written.
pub fn blog_post(text: &str) -> Vec<String> {
    vec![format!("\n{}\n", text)]
}

/// Body of a profile page.
pub fn profile(bio: Option<&str>, url: Option<&str>, orcid: Option<&str>) -> Vec<String> {
    let mut links = String::from("\n## Links\n");
    if let Some(url) = url.filter(|s| !s.is_empty()) {
        links.push_str(&format!("\n- [Website]({})\n", url));
    }
    if let Some(orcid) = orcid.filter(|s| !s.is_empty()) {
        links.push_str(&format!("\n- [ORCID]({})\n", orcid));
    }
    vec![
        format!("\n## Bio\n\n{}\n", bio.unwrap_or_default()),
        links,
    ]
}

/// A post line in the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestPost {
    pub title: String,
    pub slug: String,
    pub overview: String,
}

/// Body of the newsletter digest.
pub fn digest(site_url: &str, posts: &[DigestPost], conferences: &[Conference]) -> Vec<String> {
    let site_url = site_url.trim_end_matches('/');

    let mut posts_section = String::from("\n# Posts \n");
    for post in posts {
        posts_section.push_str(&format!(
            "\n### [{}]({}/content/{})\n",
            post.title, site_url, post.slug
        ));
        posts_section.push_str(&format!("\n{}\n", post.overview));
    }

    let mut conference_section = String::from("\n# Conferences \n");
    for conference in conferences {
        conference_section.push_str(&format!(
            "\n### [{}]({})\n",
            conference.name,
            conference.url.as_deref().unwrap_or_default()
        ));
        conference_section.push_str(&format!("\n- Location:{}\n", conference.location));
        conference_section.push_str(&format!("\n- Start date:{}\n", conference.start_date()));
        conference_section.push_str(&format!("\n- End date:{}\n", conference.end_date()));
    }

    vec![posts_section, conference_section]
}
