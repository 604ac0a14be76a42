//! publish commands - publication, arxiv, blog, profile, conference

use std::path::Path;

use anyhow::{Context as _, Result};

use super::{build_pipeline, open_store, read_json, runtime, Context, ServiceUnavailable};
use crate::content::records::{BlogPost, Conference, Publication, ResearcherProfile};
use crate::publish::pipeline::{Pipeline, PipelineError, PipelineOutcome};
use crate::scrape::ArxivClient;
use crate::ui::output;

/// A record read from a JSON file, with the operation that publishes it.
enum Request {
    Publication(Publication),
    BlogPost(BlogPost),
    Profile(ResearcherProfile),
    Conference(Conference),
}

impl Request {
    fn label(&self) -> &'static str {
        match self {
            Request::Publication(_) => "Publication",
            Request::BlogPost(_) => "Blog post",
            Request::Profile(_) => "Profile",
            Request::Conference(_) => "Conference calendar",
        }
    }

    async fn execute(&self, pipeline: &Pipeline) -> Result<PipelineOutcome, PipelineError> {
        match self {
            Request::Publication(record) => pipeline.publish_publication(record).await,
            Request::BlogPost(record) => pipeline.publish_blog_post(record).await,
            Request::Profile(record) => pipeline.publish_profile(record).await,
            Request::Conference(record) => pipeline.publish_conference(record).await,
        }
    }
}

/// Publish a publication from a JSON file.
pub fn publication(ctx: &Context, file: &Path) -> Result<()> {
    run(ctx, Request::Publication(read_json(file)?))
}

/// Import an arXiv abstract page and publish it.
pub fn arxiv(ctx: &Context, url: &str) -> Result<()> {
    // Reject malformed URLs before touching config or the network.
    crate::scrape::export_url(url)?;
    let config = ctx.load_config()?;
    let pipeline = build_pipeline(&config, open_store(&config))?;
    let client = ArxivClient::new(config.request_timeout())?;

    let outcome = runtime()?.block_on(async {
        let record = client
            .fetch(url)
            .await
            .context("Failed to fetch arXiv page")
            .context(ServiceUnavailable)?;
        tracing::info!(title = %record.title, "scraped arXiv page");
        pipeline
            .publish_arxiv(&record)
            .await
            .map_err(|err| tag_failure(err, "Failed to publish arXiv import".to_string()))
    })?;
    report(ctx, "arXiv import", &outcome);
    Ok(())
}

/// Publish a blog post from a JSON file.
pub fn blog_post(ctx: &Context, file: &Path) -> Result<()> {
    run(ctx, Request::BlogPost(read_json(file)?))
}

/// Publish a researcher profile from a JSON file.
pub fn profile(ctx: &Context, file: &Path) -> Result<()> {
    run(ctx, Request::Profile(read_json(file)?))
}

/// Store a conference from a JSON file and republish the calendar.
pub fn conference(ctx: &Context, file: &Path) -> Result<()> {
    run(ctx, Request::Conference(read_json(file)?))
}

fn run(ctx: &Context, request: Request) -> Result<()> {
    let config = ctx.load_config()?;
    let pipeline = build_pipeline(&config, open_store(&config))?;
    let what = request.label();
    let outcome = runtime()?
        .block_on(request.execute(&pipeline))
        .map_err(|err| tag_failure(err, format!("Failed to publish {}", what.to_lowercase())))?;
    report(ctx, what, &outcome);
    Ok(())
}

/// Attach `message`, and mark the error as a service failure unless the
/// record itself could not be formatted or written locally.
fn tag_failure(err: PipelineError, message: String) -> anyhow::Error {
    let remote = matches!(
        err,
        PipelineError::Publish(_) | PipelineError::Store(_) | PipelineError::Git(_)
    );
    let err = anyhow::Error::new(err).context(message);
    if remote {
        err.context(ServiceUnavailable)
    } else {
        err
    }
}

fn report(ctx: &Context, what: &str, outcome: &PipelineOutcome) {
    if outcome.is_skipped() {
        output::warn(output::format_outcome(what, outcome), ctx.verbosity());
    } else {
        output::success(output::format_outcome(what, outcome), ctx.verbosity());
    }
}
