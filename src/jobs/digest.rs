//! jobs::digest
//!
//! The weekly newsletter aggregation.
//!
//! Each run covers everything updated since the previous digest: with T
//! the `created_at` of the latest digest (the epoch if there is none), it
//! selects publications and conferences with `T < updated_at <= now`,
//! publishes the digest page, and records a new digest stamped `now`.
//! An empty selection still produces a page.
//!
//! The digest row is recorded only after the page is published. A failed
//! publish or a preview run leaves the window open for the next run.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::scheduler::ScheduledJob;
use crate::content::formatter::DigestInput;
use crate::core::config::SiteKind;
use crate::core::types::UtcTimestamp;
use crate::publish::pipeline::{OutcomeStatus, Pipeline};
use crate::store::{ContentStore, DigestRecord};

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> UtcTimestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcTimestamp {
        UtcTimestamp::now()
    }
}

/// A settable clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<UtcTimestamp>,
}

impl ManualClock {
    pub fn new(now: UtcTimestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: UtcTimestamp) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UtcTimestamp {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// What one digest run produced. `record` is stored only when `status`
/// is [`OutcomeStatus::Published`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestReport {
    pub record: DigestRecord,
    pub status: OutcomeStatus,
}

/// Aggregates recent publications and conferences into the newsletter.
pub struct DigestJob {
    store: Arc<dyn ContentStore>,
    pipeline: Arc<Pipeline>,
    clock: Arc<dyn Clock>,
}

impl DigestJob {
    pub fn new(store: Arc<dyn ContentStore>, pipeline: Arc<Pipeline>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            pipeline,
            clock,
        }
    }

    /// Run one aggregation.
    pub async fn run_once(&self) -> anyhow::Result<DigestReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("digest", run = %run_id);
        self.aggregate(run_id).instrument(span).await
    }

    async fn aggregate(&self, run_id: Uuid) -> anyhow::Result<DigestReport> {
        let now = self.clock.now();
        let since = self
            .store
            .latest_digest()
            .context("reading digest history")?
            .map(|d| d.created_at)
            .unwrap_or_else(UtcTimestamp::epoch);

        let publications = self
            .store
            .publications_updated_between(since, now)
            .context("selecting publications")?;
        let conferences = self
            .store
            .conferences_updated_between(since, now)
            .context("selecting conferences")?;
        info!(
            %since,
            until = %now,
            publications = publications.len(),
            conferences = conferences.len(),
            "aggregating"
        );

        let site_url = self
            .pipeline
            .site(SiteKind::Publications)
            .target
            .url
            .clone()
            .unwrap_or_default();
        let input = DigestInput {
            site_url,
            publications,
            conferences,
        };

        let outcome = self
            .pipeline
            .publish_digest(&input)
            .await
            .context("publishing digest")?;

        let record = DigestRecord {
            id: run_id,
            created_at: now,
            publications: input.publications.len(),
            conferences: input.conferences.len(),
            commit: outcome.receipt.as_ref().map(|r| r.commit.to_string()),
        };
        if outcome.status == OutcomeStatus::Published {
            self.store
                .record_digest(record.clone())
                .context("recording digest")?;
            info!(commit = ?record.commit, "digest recorded");
        } else {
            info!(status = ?outcome.status, "digest not recorded; window left open");
        }

        Ok(DigestReport {
            record,
            status: outcome.status,
        })
    }
}

#[async_trait]
impl ScheduledJob for DigestJob {
    fn name(&self) -> &str {
        "newsletter-digest"
    }

    async fn run(&self) -> anyhow::Result<()> {
        self.run_once().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::records::{Conference, Publication};
    use crate::core::config::{Environment, SiteTarget};
    use crate::core::types::BranchName;
    use crate::forge::mock::{FailOn, MockGitData};
    use crate::forge::{CommitAuthor, ForgeError};
    use crate::publish::pipeline::Site;
    use crate::publish::Publisher;
    use crate::store::MemoryStore;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn at(hours: i64) -> UtcTimestamp {
        UtcTimestamp::from_datetime(
            Utc.with_ymd_and_hms(2023, 3, 15, 0, 0, 0).unwrap() + Duration::hours(hours),
        )
    }

    fn publication(name: &str, updated: UtcTimestamp) -> Publication {
        Publication {
            name: name.into(),
            overview: format!("About {}", name),
            authors: vec![],
            research_areas: vec![],
            thumbnail: None,
            citation: None,
            pdf: None,
            supplement: None,
            slides: None,
            poster: None,
            code: None,
            updated_at: updated,
        }
    }

    fn conference(name: &str, updated: UtcTimestamp) -> Conference {
        let day = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        Conference::new(name, Some("https://conf.example.org".into()), "Vancouver", day, day, updated).unwrap()
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<MemoryStore>,
        mock: MockGitData,
        clock: Arc<ManualClock>,
        job: DigestJob,
    }

    fn fixture(env: Environment) -> Fixture {
        let dir = TempDir::new().unwrap();
        let mock = MockGitData::new();
        let store = Arc::new(MemoryStore::new());
        let site = |name: &str| {
            Site::new(
                SiteTarget {
                    repo: name.into(),
                    root: dir.path().join(name),
                    url: Some(format!("https://group.github.io/{}", name)),
                },
                Publisher::new(
                    Arc::new(mock.clone()),
                    BranchName::main(),
                    CommitAuthor {
                        name: "Bot".into(),
                        email: "bot@example.org".into(),
                    },
                ),
            )
        };
        let pipeline = Arc::new(Pipeline::new(
            env,
            store.clone(),
            site("icr"),
            site("newsletter"),
            site("calendar"),
        ));
        let clock = Arc::new(ManualClock::new(at(10)));
        let job = DigestJob::new(store.clone(), pipeline, clock.clone());
        Fixture {
            _dir: dir,
            store,
            mock,
            clock,
            job,
        }
    }

    #[tokio::test]
    async fn first_run_covers_everything_up_to_now() {
        let f = fixture(Environment::Production);
        f.store.insert_publication(&publication("Old", at(-100))).unwrap();
        f.store.insert_publication(&publication("Future", at(11))).unwrap();
        f.store.insert_conference(&conference("NeurIPS", at(2))).unwrap();

        let report = f.job.run_once().await.unwrap();
        assert_eq!(report.status, OutcomeStatus::Published);
        assert_eq!(report.record.created_at, at(10));
        assert_eq!(report.record.publications, 1);
        assert_eq!(report.record.conferences, 1);
        assert!(report.record.commit.is_some());
        assert_eq!(f.store.latest_digest().unwrap().unwrap(), report.record);
    }

    #[tokio::test]
    async fn record_at_previous_digest_time_is_not_repeated() {
        let f = fixture(Environment::Production);
        f.store
            .record_digest(DigestRecord {
                id: Uuid::new_v4(),
                created_at: at(5),
                publications: 0,
                conferences: 0,
                commit: None,
            })
            .unwrap();
        f.store.insert_publication(&publication("AtT", at(5))).unwrap();
        f.store.insert_publication(&publication("AfterT", at(6))).unwrap();

        let report = f.job.run_once().await.unwrap();
        assert_eq!(report.status, OutcomeStatus::Published);
        assert_eq!(report.record.publications, 1);
        assert!(report.record.commit.is_some());
    }

    #[tokio::test]
    async fn empty_window_still_publishes_a_page() {
        let f = fixture(Environment::Production);
        let report = f.job.run_once().await.unwrap();
        assert_eq!(report.record.publications, 0);
        assert_eq!(report.record.conferences, 0);
        assert_eq!(report.status, OutcomeStatus::Published);
        assert!(!f.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_publish_records_nothing() {
        let f = fixture(Environment::Production);
        f.store.insert_publication(&publication("A", at(1))).unwrap();
        let _ = f.mock.clone().fail_on(FailOn::CreateCommit(ForgeError::NetworkError("down".into())));

        assert!(f.job.run_once().await.is_err());
        assert!(f.store.latest_digest().unwrap().is_none());

        // The next run still sees the publication.
        f.mock.clear_fail_on();
        f.clock.set(at(20));
        let report = f.job.run_once().await.unwrap();
        assert_eq!(report.record.publications, 1);
    }

    #[tokio::test]
    async fn consecutive_runs_advance_the_window() {
        let f = fixture(Environment::Production);
        f.store.insert_publication(&publication("A", at(1))).unwrap();
        assert_eq!(f.job.run_once().await.unwrap().record.publications, 1);

        f.clock.set(at(20));
        f.store.insert_publication(&publication("B", at(15))).unwrap();
        let second = f.job.run_once().await.unwrap();
        assert_eq!(second.record.publications, 1);
        assert_eq!(second.record.created_at, at(20));
    }

    #[tokio::test]
    async fn preview_digest_leaves_window_open() {
        let f = fixture(Environment::Preview);
        f.store.insert_publication(&publication("A", at(1))).unwrap();

        let preview = f.job.run_once().await.unwrap();
        assert_eq!(preview.status, OutcomeStatus::Previewed);
        assert_eq!(preview.record.publications, 1);
        assert!(f.store.latest_digest().unwrap().is_none());

        // Previewing again still covers the same publication.
        f.clock.set(at(20));
        assert_eq!(f.job.run_once().await.unwrap().record.publications, 1);
        assert!(f.mock.calls().is_empty());
    }
}
