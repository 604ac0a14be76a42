//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration and reads its input
//! 2. Builds the pipeline and calls one operation
//! 3. Formats and displays the outcome
//!
//! # Async Commands
//!
//! Publishing, importing and scheduling involve network I/O. `dispatch`
//! stays synchronous and each such handler builds a tokio runtime for its
//! async part.
//!
//! # Failures
//!
//! Failures of the remote side (GitHub, arXiv, the store) are tagged with
//! [`ServiceUnavailable`] so the CLI can show a generic message instead of
//! transport details. Problems with the user's own input are shown as-is.

mod completion;
mod config_cmd;
mod publish;
mod schedule;

pub use completion::completion;
pub use config_cmd::show as config_show;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;

use super::args::Command;
use crate::auth::EnvTokenProvider;
use crate::core::config::{Config, Environment};
use crate::forge::github::GitHubDataApi;
use crate::publish::pipeline::Pipeline;
use crate::publish::Publisher;
use crate::store::{ContentStore, FileStore};
use crate::ui::output::Verbosity;

/// Global flags every handler sees.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub config: Option<PathBuf>,
    pub content_root: Option<PathBuf>,
    pub preview: bool,
    pub debug: bool,
    pub quiet: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Load configuration and apply the global flags to it.
    pub fn load_config(&self) -> Result<Config> {
        let loaded = Config::load(self.config.as_deref()).context("Failed to load configuration")?;
        if loaded.dotenv_loaded {
            tracing::debug!("loaded .env");
        }
        let mut config = loaded.config;
        if self.preview {
            config.env.environment = Some(Environment::Preview.to_string());
        }
        if let Some(root) = &self.content_root {
            config = config.with_content_root(root.clone());
        }
        Ok(config)
    }
}

/// Marker attached to errors caused by a remote service.
#[derive(Debug, Clone, Copy)]
pub struct ServiceUnavailable;

impl std::fmt::Display for ServiceUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "service unavailable")
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Publication { file } => publish::publication(ctx, &file),
        Command::Arxiv { url } => publish::arxiv(ctx, &url),
        Command::Blog { file } => publish::blog_post(ctx, &file),
        Command::Profile { file } => publish::profile(ctx, &file),
        Command::Conference { file } => publish::conference(ctx, &file),
        Command::Digest => schedule::digest(ctx),
        Command::Schedule => schedule::schedule(ctx),
        Command::Config => config_show(ctx),
        Command::Completion { shell } => completion(shell),
    }
}

/// Parse a JSON record file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid record in {}", path.display()))
}

/// The store named by the configuration.
pub(crate) fn open_store(config: &Config) -> Arc<dyn ContentStore> {
    Arc::new(FileStore::with_path(config.store_path()))
}

/// Build a pipeline with one GitHub publisher per site.
///
/// Tokens are read from the environment at request time, so a preview
/// run works without one.
pub(crate) fn build_pipeline(config: &Config, store: Arc<dyn ContentStore>) -> Result<Pipeline> {
    let owner = config
        .owner()
        .context("No GitHub owner configured; set GH_USER or github.owner")?
        .to_string();
    let provider = Arc::new(EnvTokenProvider::default());

    Pipeline::from_config(config, store, |target| {
        let api = GitHubDataApi::with_options(
            provider.clone(),
            owner.clone(),
            target.repo.clone(),
            config.api_base(),
            config.request_timeout(),
        )
        .context("Failed to build GitHub client")?;
        Ok(Publisher::new(Arc::new(api), config.branch(), config.committer()))
    })
}

/// A single-use runtime for one command's async work.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}
