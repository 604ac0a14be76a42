//! digest and schedule commands

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::info;

use super::{build_pipeline, open_store, runtime, Context, ServiceUnavailable};
use crate::jobs::{DigestJob, ScheduleConfig, Scheduler, SystemClock};
use crate::publish::pipeline::OutcomeStatus;
use crate::ui::output;

fn digest_job(ctx: &Context) -> Result<(crate::core::config::Config, DigestJob)> {
    let config = ctx.load_config()?;
    let store = open_store(&config);
    let pipeline = Arc::new(build_pipeline(&config, store.clone())?);
    let job = DigestJob::new(store, pipeline, Arc::new(SystemClock));
    Ok((config, job))
}

/// Run one aggregation now.
pub fn digest(ctx: &Context) -> Result<()> {
    let (_, job) = digest_job(ctx)?;
    let report = runtime()?
        .block_on(job.run_once())
        .context("Failed to build the newsletter digest")
        .context(ServiceUnavailable)?;

    let verb = match report.status {
        OutcomeStatus::Published => "published",
        _ => "written locally",
    };
    output::success(
        format!(
            "Digest {} with {} publication(s) and {} conference(s)",
            verb, report.record.publications, report.record.conferences
        ),
        ctx.verbosity(),
    );
    Ok(())
}

/// Run the digest on its schedule until Ctrl-C.
pub fn schedule(ctx: &Context) -> Result<()> {
    let (config, job) = digest_job(ctx)?;
    let schedule = ScheduleConfig {
        start: config.schedule_start(),
        interval: config.schedule_interval(),
    };

    runtime()?.block_on(async {
        let handle = Scheduler::start(schedule, Arc::new(job));
        output::print(
            format!(
                "Scheduler running from {} every {} day(s); press Ctrl-C to stop",
                schedule.start.to_rfc3339(),
                schedule.interval.as_secs() / 86_400
            ),
            ctx.verbosity(),
        );

        let signal = tokio::signal::ctrl_c().await;
        info!("stopping scheduler");
        handle.stop().await;
        signal.context("Failed to listen for Ctrl-C")
    })?;

    output::success("Scheduler stopped", ctx.verbosity());
    Ok(())
}
