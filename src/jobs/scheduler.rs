//! jobs::scheduler
//!
//! Fires one job on a fixed interval anchored at a start instant.
//!
//! # Semantics
//!
//! - Firings happen at `start + k * interval`; the first is the earliest
//!   one not before the moment the scheduler starts
//! - Runs are sequential: a firing that comes due while the job is still
//!   running is delayed, never overlapped
//! - A failed run is logged and the scheduler waits for the next firing
//! - Missed firings are not remembered across restarts
//!
//! The scheduler is an ordinary value: construct it, keep the handle, and
//! call [`SchedulerHandle::stop`] to shut it down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// A unit of periodic work.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> anyhow::Result<()>;
}

/// When the job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub start: DateTime<Utc>,
    pub interval: Duration,
}

/// The first firing `start + k * interval` (k >= 0) not earlier than `now`.
pub fn next_fire_after(start: DateTime<Utc>, interval: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    if now <= start {
        return start;
    }
    let Ok(step) = chrono::Duration::from_std(interval) else {
        return start;
    };
    let step_ms = step.num_milliseconds().max(1);
    let elapsed_ms = (now - start).num_milliseconds();
    let periods = (elapsed_ms + step_ms - 1) / step_ms;
    start + chrono::Duration::milliseconds(periods * step_ms)
}

/// Starts schedulers.
pub struct Scheduler;

impl Scheduler {
    /// Spawn the scheduling loop on the current tokio runtime.
    pub fn start(config: ScheduleConfig, job: Arc<dyn ScheduledJob>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let runs = Arc::new(AtomicU64::new(0));
        let runs_in_task = Arc::clone(&runs);

        let now = Utc::now();
        let first = next_fire_after(config.start, config.interval, now);
        let delay = (first - now).to_std().unwrap_or(Duration::ZERO);
        info!(job = job.name(), first = %first, every = ?config.interval, "scheduler started");

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + delay, config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let run = runs_in_task.fetch_add(1, Ordering::SeqCst) + 1;
                        info!(job = job.name(), run, "job firing");
                        match job.run().await {
                            Ok(()) => info!(job = job.name(), run, "job finished"),
                            Err(e) => error!(job = job.name(), run, error = %format!("{:#}", e), "job failed; waiting for next firing"),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!(job = job.name(), "scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        });

        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
            runs,
        }
    }
}

/// Handle to a running scheduler.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    runs: Arc<AtomicU64>,
}

impl SchedulerHandle {
    /// Number of firings so far.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Signal shutdown and wait for the loop to exit. A run in progress
    /// finishes first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "scheduler task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn t(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, day, hour, 0, 0).unwrap()
    }

    const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

    #[test]
    fn before_start_fires_at_start() {
        assert_eq!(next_fire_after(t(15, 0), WEEK, t(1, 0)), t(15, 0));
    }

    #[test]
    fn exactly_on_a_firing() {
        assert_eq!(next_fire_after(t(1, 0), WEEK, t(8, 0)), t(8, 0));
    }

    #[test]
    fn between_firings_rounds_up() {
        assert_eq!(next_fire_after(t(1, 0), WEEK, t(8, 1)), t(15, 0));
        assert_eq!(next_fire_after(t(1, 0), WEEK, t(14, 23)), t(15, 0));
    }

    struct Counting {
        calls: Mutex<u32>,
        fail_first: bool,
    }

    #[async_trait]
    impl ScheduledJob for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self) -> anyhow::Result<()> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if self.fail_first && *calls == 1 {
                anyhow::bail!("first run fails");
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_on_interval_and_survives_failure() {
        let job = Arc::new(Counting {
            calls: Mutex::new(0),
            fail_first: true,
        });
        let handle = Scheduler::start(
            ScheduleConfig {
                start: Utc::now() - chrono::Duration::hours(1),
                interval: Duration::from_secs(3600),
            },
            job.clone(),
        );

        // First firing is due now (start + 1h).
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*job.calls.lock().unwrap(), 1);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(*job.calls.lock().unwrap(), 2);
        assert_eq!(handle.runs(), 2);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_runs() {
        let job = Arc::new(Counting {
            calls: Mutex::new(0),
            fail_first: false,
        });
        let handle = Scheduler::start(
            ScheduleConfig {
                start: Utc::now() + chrono::Duration::hours(2),
                interval: Duration::from_secs(3600),
            },
            job.clone(),
        );
        handle.stop().await;

        tokio::time::sleep(Duration::from_secs(5 * 3600)).await;
        assert_eq!(*job.calls.lock().unwrap(), 0);
    }
}
