//! publish::pipeline
//!
//! Format, write locally, then (in production) publish.
//!
//! # Flow
//!
//! ```text
//! record -> Formatter -> Materializer [-> CsvIndex] [-> pull clone] -> Publisher
//! ```
//!
//! The environment decides where a run stops. A preview run ends after
//! the local write so the result can be inspected with `quarto preview`;
//! a production run goes on to publish.
//!
//! Publications, arXiv imports and conferences are checked against the
//! store after formatting. A record whose name is already stored is not
//! written or published. A record is stored only once its publish
//! succeeds: a failed or preview run leaves the store untouched, so the
//! same record can simply be submitted again.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::{default_commit_message, PublishError, PublishFile, PublishReceipt, Publisher};
use crate::content::records::{
    ArxivRecord, Author, BlogPost, Conference, Publication, ResearchArea, ResearcherProfile,
};
use crate::content::{
    formatter::citation_name_to_display, DigestInput, FormatError, Formatter, PublishableContent,
};
use crate::core::config::{Config, Environment, SiteKind, SiteTarget};
use crate::core::types::UtcTimestamp;
use crate::git::{GitError, PullOutcome, WorkingClone};
use crate::materialize::{
    AppendOutcome, ConferenceCalendar, CsvIndex, MaterializeError, MaterializedFile, Materializer,
};
use crate::store::{ContentStore, InsertOutcome, StoreError};

/// File name of the publications side-index, at the publications site root.
pub const INDEX_FILE: &str = "input.csv";

/// File name of the conference calendar, at the calendar site root.
///
/// Both sites read a file of this name, so it matches [`INDEX_FILE`]. The
/// two are never written to the same directory; always join either one
/// onto its own site's root.
pub const CALENDAR_FILE: &str = "input.csv";

/// Errors from a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to update working clone: {0}")]
    Git(#[from] GitError),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Written locally and published.
    Published,
    /// Written locally only.
    Previewed,
    /// Nothing done: the record already exists.
    Skipped,
}

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub status: OutcomeStatus,
    /// Local files written, in publish order
    pub files: Vec<MaterializedFile>,
    pub receipt: Option<PublishReceipt>,
}

impl PipelineOutcome {
    /// A run skipped because the record already exists.
    pub fn skipped() -> Self {
        Self {
            status: OutcomeStatus::Skipped,
            files: Vec::new(),
            receipt: None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.status == OutcomeStatus::Skipped
    }
}

/// One publishing target as the pipeline sees it.
#[derive(Debug, Clone)]
pub struct Site {
    pub target: SiteTarget,
    pub publisher: Publisher,
    /// Remote to fast-forward the local clone from before publishing
    pub sync_remote: Option<String>,
}

impl Site {
    pub fn new(target: SiteTarget, publisher: Publisher) -> Self {
        Self {
            target,
            publisher,
            sync_remote: None,
        }
    }

    /// Pull `remote` into the site root before each publish.
    pub fn with_sync(mut self, remote: impl Into<String>) -> Self {
        self.sync_remote = Some(remote.into());
        self
    }
}

/// The three sites and everything needed to publish to them.
pub struct Pipeline {
    environment: Environment,
    store: Arc<dyn ContentStore>,
    publications: Site,
    newsletter: Site,
    conferences: Site,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("environment", &self.environment)
            .field("publications", &self.publications.target.repo)
            .field("newsletter", &self.newsletter.target.repo)
            .field("conferences", &self.conferences.target.repo)
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        environment: Environment,
        store: Arc<dyn ContentStore>,
        publications: Site,
        newsletter: Site,
        conferences: Site,
    ) -> Self {
        Self {
            environment,
            store,
            publications,
            newsletter,
            conferences,
        }
    }

    /// Build a pipeline from configuration, with one publisher per site.
    ///
    /// The newsletter and calendar sites are pulled from `origin` before
    /// each publish.
    pub fn from_config<E>(
        config: &Config,
        store: Arc<dyn ContentStore>,
        publisher_for: impl Fn(&SiteTarget) -> Result<Publisher, E>,
    ) -> Result<Self, E> {
        let site = |kind| -> Result<Site, E> {
            let target = config.site(kind);
            let publisher = publisher_for(&target)?;
            Ok(Site::new(target, publisher))
        };
        Ok(Self::new(
            config.environment(),
            store,
            site(SiteKind::Publications)?,
            site(SiteKind::Newsletter)?.with_sync("origin"),
            site(SiteKind::Conferences)?.with_sync("origin"),
        ))
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn site(&self, kind: SiteKind) -> &Site {
        match kind {
            SiteKind::Publications => &self.publications,
            SiteKind::Newsletter => &self.newsletter,
            SiteKind::Conferences => &self.conferences,
        }
    }

    /// Format and publish a publication with its index row, then store it.
    pub async fn publish_publication(
        &self,
        publication: &Publication,
    ) -> Result<PipelineOutcome, PipelineError> {
        let content = Formatter::publication(publication)?;
        if self.store.contains_publication(&publication.name)? {
            info!(name = %publication.name, "publication already exists, skipping");
            return Ok(PipelineOutcome::skipped());
        }
        let outcome = self.publish_with_index(&content).await?;
        self.record_if_published(&outcome, || self.store.insert_publication(publication))?;
        Ok(outcome)
    }

    /// Format and publish an arXiv import, then store it.
    pub async fn publish_arxiv(
        &self,
        record: &ArxivRecord,
    ) -> Result<PipelineOutcome, PipelineError> {
        let content = Formatter::arxiv(record)?;
        let stored = publication_from_arxiv(record);
        if self.store.contains_publication(&stored.name)? {
            info!(title = %record.title, "arxiv record already imported, skipping");
            return Ok(PipelineOutcome::skipped());
        }
        let outcome = self.publish_with_index(&content).await?;
        self.record_if_published(&outcome, || self.store.insert_publication(&stored))?;
        Ok(outcome)
    }

    /// Format and publish a blog post.
    pub async fn publish_blog_post(&self, post: &BlogPost) -> Result<PipelineOutcome, PipelineError> {
        let content = Formatter::blog_post(post)?;
        self.publish_pages(&self.publications, &content, Vec::new())
            .await
    }

    /// Format and publish a researcher profile.
    pub async fn publish_profile(
        &self,
        profile: &ResearcherProfile,
    ) -> Result<PipelineOutcome, PipelineError> {
        let content = Formatter::profile(profile)?;
        self.publish_pages(&self.publications, &content, Vec::new())
            .await
    }

    /// Republish the calendar with `conference` added, then store it.
    pub async fn publish_conference(
        &self,
        conference: &Conference,
    ) -> Result<PipelineOutcome, PipelineError> {
        if self.store.contains_conference(&conference.name)? {
            info!(name = %conference.name, "conference already exists, skipping");
            return Ok(PipelineOutcome::skipped());
        }
        let outcome = self.publish_calendar(Some(conference)).await?;
        self.record_if_published(&outcome, || self.store.insert_conference(conference))?;
        Ok(outcome)
    }

    /// Rewrite the calendar from the store and publish it.
    pub async fn publish_conference_calendar(&self) -> Result<PipelineOutcome, PipelineError> {
        self.publish_calendar(None).await
    }

    async fn publish_calendar(
        &self,
        extra: Option<&Conference>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let site = &self.conferences;
        self.sync_clone(site)?;

        let mut conferences = self.store.conferences()?;
        conferences.extend(extra.cloned());
        let path = site.target.root.join(CALENDAR_FILE);
        ConferenceCalendar::write(&path, &conferences)?;
        let file = MaterializedFile {
            absolute_path: path,
            relative_path: CALENDAR_FILE.to_string(),
        };

        self.finish(site, vec![file], &default_commit_message(CALENDAR_FILE))
            .await
    }

    /// Format and publish the newsletter digest.
    pub async fn publish_digest(&self, input: &DigestInput) -> Result<PipelineOutcome, PipelineError> {
        let site = &self.newsletter;
        self.sync_clone(site)?;
        let content = Formatter::digest(input)?;
        self.publish_pages(site, &content, Vec::new()).await
    }

    async fn publish_with_index(
        &self,
        content: &PublishableContent,
    ) -> Result<PipelineOutcome, PipelineError> {
        let site = &self.publications;
        let mut extra = Vec::new();
        if let Some(row) = &content.index_row {
            let index = CsvIndex::new(site.target.root.join(INDEX_FILE));
            if index.append(row)? == AppendOutcome::Duplicate {
                warn!(publication = %row.publication, "index row already present");
            }
            extra.push(MaterializedFile {
                absolute_path: index.path().to_path_buf(),
                relative_path: INDEX_FILE.to_string(),
            });
        }
        self.publish_pages(site, content, extra).await
    }

    async fn publish_pages(
        &self,
        site: &Site,
        content: &PublishableContent,
        extra: Vec<MaterializedFile>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let page = Materializer::new(&site.target.root).write(content)?;
        let folder = match content.folder() {
            "" => content.target_relative_path.clone(),
            folder => folder.to_string(),
        };
        let mut files = vec![page];
        files.extend(extra);
        self.finish(site, files, &default_commit_message(&folder))
            .await
    }

    async fn finish(
        &self,
        site: &Site,
        files: Vec<MaterializedFile>,
        message: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        if self.environment == Environment::Preview {
            info!(
                root = %site.target.root.display(),
                "preview only; run `quarto preview` in the site directory to inspect"
            );
            return Ok(PipelineOutcome {
                status: OutcomeStatus::Previewed,
                files,
                receipt: None,
            });
        }

        let publish_files: Vec<PublishFile> = files
            .iter()
            .map(|f| PublishFile::new(f.absolute_path.clone(), f.relative_path.clone()))
            .collect();
        let receipt = site.publisher.publish(&publish_files, message).await?;
        info!(repo = %site.target.repo, commit = %receipt.commit.short(7), "site updated");

        Ok(PipelineOutcome {
            status: OutcomeStatus::Published,
            files,
            receipt: Some(receipt),
        })
    }

    /// Store a record once its content is live. Preview runs store nothing,
    /// so a later production run of the same record is not skipped.
    fn record_if_published(
        &self,
        outcome: &PipelineOutcome,
        insert: impl FnOnce() -> Result<InsertOutcome, StoreError>,
    ) -> Result<(), PipelineError> {
        if outcome.status != OutcomeStatus::Published {
            return Ok(());
        }
        if insert()? == InsertOutcome::AlreadyExists {
            warn!("record was stored by a concurrent run");
        }
        Ok(())
    }

    fn sync_clone(&self, site: &Site) -> Result<(), PipelineError> {
        let Some(remote) = site.sync_remote.as_deref() else {
            return Ok(());
        };
        if self.environment == Environment::Preview {
            return Ok(());
        }

        let clone = WorkingClone::open(&site.target.root)?;
        if let Some(url) = clone.remote_url(remote)? {
            if let Some((_, repo)) = WorkingClone::parse_github_remote(&url) {
                if repo != site.target.repo {
                    warn!(%url, expected = %site.target.repo, "working clone tracks a different repository");
                }
            }
        }
        match clone.pull_fast_forward(remote, site.publisher.branch())? {
            PullOutcome::UpToDate => {}
            PullOutcome::FastForwarded { from, to } => {
                info!(from = %from.short(7), to = %to.short(7), "pulled working clone");
            }
        }
        Ok(())
    }
}

/// The stored form of an arXiv import.
fn publication_from_arxiv(record: &ArxivRecord) -> Publication {
    Publication {
        name: record.title.trim().to_string(),
        overview: record.abstract_text.clone(),
        authors: record
            .authors
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                Author::new(citation_name_to_display(name), record.author_links.get(idx).cloned())
            })
            .collect(),
        research_areas: record
            .research_area
            .iter()
            .map(ResearchArea::new)
            .collect(),
        thumbnail: None,
        citation: None,
        pdf: record.pdf_url.clone(),
        supplement: None,
        slides: None,
        poster: None,
        code: None,
        updated_at: UtcTimestamp::now(),
    }
}
