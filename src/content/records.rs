//! content::records
//!
//! Validated domain records handed to the formatter.
//!
//! Records arrive already validated by whatever collected them (a form,
//! a JSON file on the command line, an arXiv scrape). The only invariant
//! enforced here is the conference date order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::UtcTimestamp;

/// Errors constructing records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("conference '{name}' ends ({end}) before it starts ({start})")]
    DateOrder {
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// A researcher credited on a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>, url: Option<String>) -> Self {
        Self {
            name: name.into(),
            url,
        }
    }
}

/// A research area label. Titles are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ResearchArea {
    title: String,
}

impl ResearchArea {
    pub fn new(title: impl AsRef<str>) -> Self {
        Self {
            title: title.as_ref().trim().to_lowercase(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl From<String> for ResearchArea {
    fn from(title: String) -> Self {
        Self::new(title)
    }
}

impl From<ResearchArea> for String {
    fn from(area: ResearchArea) -> Self {
        area.title
    }
}

/// A publication entered by a group member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub research_areas: Vec<ResearchArea>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub pdf: Option<String>,
    #[serde(default)]
    pub supplement: Option<String>,
    #[serde(default)]
    pub slides: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "UtcTimestamp::now")]
    pub updated_at: UtcTimestamp,
}

/// Metadata scraped from an arXiv abstract page.
///
/// Author names are in citation order ("Last, First").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArxivRecord {
    pub title: String,
    pub abstract_text: String,
    pub pdf_url: Option<String>,
    pub authors: Vec<String>,
    #[serde(default)]
    pub author_links: Vec<String>,
    #[serde(default)]
    pub research_area: Option<String>,
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "UtcTimestamp::now")]
    pub updated_at: UtcTimestamp,
}

/// A researcher's public profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearcherProfile {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub orcid: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub research_areas: Vec<ResearchArea>,
}

/// A conference on the event calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConference")]
pub struct Conference {
    pub name: String,
    pub url: Option<String>,
    pub location: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    pub updated_at: UtcTimestamp,
}

impl Conference {
    /// Build a conference, rejecting an end date before the start date.
    pub fn new(
        name: impl Into<String>,
        url: Option<String>,
        location: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        updated_at: UtcTimestamp,
    ) -> Result<Self, RecordError> {
        let name = name.into();
        if end_date < start_date {
            return Err(RecordError::DateOrder {
                name,
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            name,
            url,
            location: location.into(),
            start_date,
            end_date,
            updated_at,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

#[derive(Deserialize)]
struct RawConference {
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    location: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(default = "UtcTimestamp::now")]
    updated_at: UtcTimestamp,
}

impl TryFrom<RawConference> for Conference {
    type Error = RecordError;

    fn try_from(raw: RawConference) -> Result<Self, Self::Error> {
        Conference::new(
            raw.name,
            raw.url,
            raw.location,
            raw.start_date,
            raw.end_date,
            raw.updated_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn research_area_lowercased() {
        assert_eq!(ResearchArea::new(" Machine Learning ").title(), "machine learning");
    }

    #[test]
    fn conference_rejects_reversed_dates() {
        let err = Conference::new(
            "NeurIPS",
            None,
            "New Orleans",
            date(2023, 12, 16),
            date(2023, 12, 10),
            UtcTimestamp::epoch(),
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::DateOrder { .. }));
    }

    #[test]
    fn single_day_conference_is_fine() {
        let c = Conference::new(
            "Workshop",
            None,
            "Bristol",
            date(2023, 5, 1),
            date(2023, 5, 1),
            UtcTimestamp::epoch(),
        )
        .unwrap();
        assert_eq!(c.start_date(), c.end_date());
    }

    #[test]
    fn conference_json_is_validated() {
        let json = r#"{"name":"X","location":"Y","start_date":"2023-02-02","end_date":"2023-02-01"}"#;
        assert!(serde_json::from_str::<Conference>(json).is_err());
    }

    #[test]
    fn publication_json_defaults() {
        let json = r#"{"name":"Paper","authors":[{"name":"Ada"}],"research_areas":["NLP"]}"#;
        let p: Publication = serde_json::from_str(json).unwrap();
        assert_eq!(p.research_areas[0].title(), "nlp");
        assert!(p.thumbnail.is_none());
        assert_eq!(p.authors[0].url, None);
    }
}
