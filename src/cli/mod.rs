//! cli
//!
//! Command-line interface layer for qpress.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the tracing subscriber
//! - Delegate to command handlers and turn their failures into messages
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers load configuration, build a
//! [`crate::publish::pipeline::Pipeline`] and call one operation on it.
//! Network-bound handlers drive their async work on a tokio runtime.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::Result;
use tracing::{debug, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::ui::output;
use commands::{Context, ServiceUnavailable};

/// Message shown when publishing or fetching fails for reasons the user
/// cannot fix from the command line.
pub const TRY_LATER: &str = "the request could not be completed; please try again later";

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug, cli.quiet);

    let ctx = Context {
        config: cli.config.clone(),
        content_root: cli.content_root.clone(),
        preview: cli.preview,
        debug: cli.debug,
        quiet: cli.quiet,
    };

    match commands::dispatch(cli.command, &ctx) {
        Ok(()) => Ok(()),
        Err(err) if err.downcast_ref::<ServiceUnavailable>().is_some() => {
            debug!(error = %format!("{:#}", err), "command failed");
            output::error(TRY_LATER);
            if ctx.debug {
                output::error(format!("{:#}", err));
            }
            Err(err)
        }
        Err(err) => {
            output::error(format!("{:#}", err));
            Err(err)
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(debug: bool, quiet: bool) {
    let level = if debug {
        Level::DEBUG
    } else if quiet {
        Level::ERROR
    } else {
        Level::WARN
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}
