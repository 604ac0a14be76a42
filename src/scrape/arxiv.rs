//! scrape::arxiv
//!
//! Fetches an arXiv abstract page and extracts the fields needed to
//! publish it.
//!
//! Pages are fetched from the `export.` mirror of the given host, which
//! is the one arXiv asks automated clients to use. Fields come from the
//! `citation_*` meta tags, the abstract block, the subject sub-header and
//! the author list.

use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use super::ScrapeError;
use crate::content::records::ArxivRecord;

/// Retries after the first attempt.
pub const MAX_RETRIES: u32 = 3;

/// Backoff before retry n (zero-based) is `BASE_BACKOFF * 2^n`.
pub const BASE_BACKOFF: Duration = Duration::from_millis(500);

const AUTHOR_LINK_BASE: &str = "https://arxiv.org";

/// Rewrite `scheme://host/path` to `scheme://export.host/path`.
///
/// ```
/// use quarto_press::scrape::export_url;
///
/// assert_eq!(
///     export_url("https://arxiv.org/abs/2301.00001").unwrap(),
///     "https://export.arxiv.org/abs/2301.00001"
/// );
/// ```
pub fn export_url(url: &str) -> Result<String, ScrapeError> {
    let (scheme, rest) = url
        .trim()
        .split_once("://")
        .ok_or_else(|| ScrapeError::InvalidUrl(url.to_string()))?;
    if scheme.is_empty() || rest.is_empty() || rest.starts_with('/') {
        return Err(ScrapeError::InvalidUrl(url.to_string()));
    }
    if rest.starts_with("export.") {
        return Ok(format!("{}://{}", scheme, rest));
    }
    Ok(format!("{}://export.{}", scheme, rest))
}

/// HTTP client for arXiv abstract pages.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    client: reqwest::Client,
    backoff: Duration,
}

impl ArxivClient {
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("qpress/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::Http(e.to_string()))?;
        Ok(Self {
            client,
            backoff: BASE_BACKOFF,
        })
    }

    /// Override the retry backoff base.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Fetch and parse the abstract page at `abs_url`.
    pub async fn fetch(&self, abs_url: &str) -> Result<ArxivRecord, ScrapeError> {
        let url = export_url(abs_url)?;
        self.fetch_from(&url).await
    }

    /// Fetch and parse a page without rewriting its host.
    pub async fn fetch_from(&self, url: &str) -> Result<ArxivRecord, ScrapeError> {
        let html = self.get_with_retry(url).await?;
        parse_abs_page(&html)
    }

    async fn get_with_retry(&self, url: &str) -> Result<String, ScrapeError> {
        let mut attempt = 0;
        loop {
            debug!(%url, attempt, "fetching arXiv page");
            let retryable = match self.client.get(url).send().await {
                Ok(response) if response.status().is_server_error() => {
                    format!("server error {}", response.status().as_u16())
                }
                Ok(response) if !response.status().is_success() => {
                    return Err(ScrapeError::Http(format!(
                        "unexpected status {} from {}",
                        response.status().as_u16(),
                        url
                    )));
                }
                Ok(response) => {
                    return response
                        .text()
                        .await
                        .map_err(|e| ScrapeError::Http(e.to_string()));
                }
                Err(e) if e.is_connect() || e.is_timeout() => e.to_string(),
                Err(e) => return Err(ScrapeError::Http(e.to_string())),
            };

            if attempt >= MAX_RETRIES {
                return Err(ScrapeError::Http(format!(
                    "giving up after {} attempts: {}",
                    attempt + 1,
                    retryable
                )));
            }
            let delay = self.backoff * 2u32.pow(attempt);
            warn!(%url, attempt, error = %retryable, ?delay, "retrying arXiv fetch");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn pattern(re: &str) -> Result<Regex, ScrapeError> {
    Regex::new(re).map_err(|e| ScrapeError::Pattern(e.to_string()))
}

/// Extract an [`ArxivRecord`] from abstract-page HTML.
///
/// `citation_title` and the abstract block are required. The PDF link,
/// research area and author links are optional.
pub fn parse_abs_page(html: &str) -> Result<ArxivRecord, ScrapeError> {
    let meta = pattern(r#"(?is)<meta\s+name\s*=\s*"(citation_[a-z_]+)"\s+content\s*=\s*"([^"]*)""#)?;

    let mut title = None;
    let mut pdf_url = None;
    let mut authors = Vec::new();
    for cap in meta.captures_iter(html) {
        let value = unescape(cap[2].trim());
        match &cap[1] {
            "citation_title" => title = Some(value),
            "citation_pdf_url" => pdf_url = Some(value),
            "citation_author" => authors.push(value),
            _ => {}
        }
    }
    let title = title
        .filter(|t| !t.is_empty())
        .ok_or(ScrapeError::MissingField("citation_title"))?;

    let tags = pattern(r"(?s)<[^>]*>")?;
    let strip_tags = |fragment: &str| tags.replace_all(fragment, "").into_owned();

    let block = pattern(r#"(?is)<(blockquote|div|p)[^>]*class\s*=\s*"abstract[^"]*"[^>]*>(.*?)</(?:blockquote|div|p)>"#)?;
    let abstract_text = block
        .captures(html)
        .map(|cap| {
            let text = strip_tags(&cap[2]).replace('\n', " ");
            collapse_whitespace(&unescape(&text.replacen("Abstract:", "", 1)))
        })
        .filter(|t| !t.is_empty())
        .ok_or(ScrapeError::MissingField("abstract"))?;

    let subheader = pattern(r#"(?is)<div[^>]*class\s*=\s*"subheader"[^>]*>\s*<h1[^>]*>(.*?)</h1>"#)?;
    let research_area = subheader
        .captures_iter(html)
        .last()
        .map(|cap| unescape(&strip_tags(&cap[1])))
        .map(|heading| {
            heading
                .rsplit('>')
                .next()
                .unwrap_or_default()
                .trim()
                .to_lowercase()
        })
        .filter(|area| !area.is_empty());

    let authors_block = pattern(r#"(?is)<div[^>]*class\s*=\s*"authors"[^>]*>(.*?)</div>"#)?;
    let href = pattern(r#"(?i)<a\s[^>]*href\s*=\s*"([^"]+)""#)?;
    let author_links = authors_block
        .captures(html)
        .map(|cap| {
            href.captures_iter(&cap[1])
                .map(|link| format!("{}{}", AUTHOR_LINK_BASE, unescape(&link[1])))
                .collect()
        })
        .unwrap_or_default();

    Ok(ArxivRecord {
        title: collapse_whitespace(&title),
        abstract_text,
        pdf_url,
        authors,
        author_links,
        research_area,
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
