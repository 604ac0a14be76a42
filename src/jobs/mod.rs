//! jobs
//!
//! Periodic work: a small interval scheduler and the newsletter digest
//! it drives.
//!
//! # Example
//!
//! ```ignore
//! let job = Arc::new(DigestJob::new(store, pipeline, Arc::new(SystemClock)));
//! let handle = Scheduler::start(
//!     ScheduleConfig { start: config.schedule_start(), interval: config.schedule_interval() },
//!     job,
//! );
//! tokio::signal::ctrl_c().await?;
//! handle.stop().await;
//! ```

mod digest;
mod scheduler;

pub use digest::{Clock, DigestJob, DigestReport, ManualClock, SystemClock};
pub use scheduler::{next_fire_after, ScheduleConfig, ScheduledJob, Scheduler, SchedulerHandle};
