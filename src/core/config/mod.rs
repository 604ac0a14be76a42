//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables (`GH_USER`, `GH_REPOSITORY`, `ENV_NAME`,
//!    `GH_API_BASE`), optionally loaded from a `.env` file
//! 4. CLI flags (not handled here)
//!
//! The GitHub token is deliberately absent: it is read from the process
//! environment at request time by [`crate::auth::EnvTokenProvider`].
//!
//! # Example
//!
//! ```no_run
//! use quarto_press::core::config::{Config, SiteKind};
//!
//! let result = Config::load(None).unwrap();
//! let config = result.config;
//!
//! let site = config.site(SiteKind::Publications);
//! println!("publishing to {} from {}", site.repo, site.root.display());
//! println!("branch: {}", config.branch());
//! ```

pub mod schema;

pub use schema::FileConfig;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeZone;
use thiserror::Error;

use crate::core::types::BranchName;
use crate::forge::CommitAuthor;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Push generated content to the remote repository.
    Production,
    /// Write content locally only, for `quarto preview`.
    Preview,
}

impl Environment {
    /// Interpret an `ENV_NAME`-style value. Only `prod`/`production` publish.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Environment::Production,
            _ => Environment::Preview,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "prod"),
            Environment::Preview => write!(f, "preview"),
        }
    }
}

/// The publishing targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    Publications,
    Newsletter,
    Conferences,
}

/// A resolved publishing target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTarget {
    /// Repository name under the configured owner.
    pub repo: String,
    /// Local directory mirroring the repository.
    pub root: PathBuf,
    /// Public URL of the rendered site.
    pub url: Option<String>,
}

/// Values picked up from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub owner: Option<String>,
    pub repository: Option<String>,
    pub environment: Option<String>,
    pub api_base: Option<String>,
}

impl EnvOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            owner: get("GH_USER"),
            repository: get("GH_REPOSITORY"),
            environment: get("ENV_NAME"),
            api_base: get("GH_API_BASE"),
        }
    }
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Whether a `.env` file was found and applied.
    pub dotenv_loaded: bool,
}

/// Merged configuration from all sources.
///
/// Accessor methods apply precedence and defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed config file (defaults if none was found)
    pub file: FileConfig,
    /// Environment overlay
    pub env: EnvOverrides,
    /// Path the file was loaded from
    path: Option<PathBuf>,
    /// Directory relative site roots and the store path resolve against
    content_root: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `explicit_path` or the default locations,
    /// then overlay the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or if
    /// the merged values are invalid. A missing file is not an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let dotenv_loaded = dotenvy::dotenv().is_ok();

        let (file, path) = match explicit_path {
            Some(path) => (Self::read_file(path)?, Some(path.to_path_buf())),
            None => Self::load_default()?,
        };

        let config = Self::from_parts(file, EnvOverrides::from_env(), path)?;
        Ok(ConfigLoadResult {
            config,
            dotenv_loaded,
        })
    }

    /// Build a config from already-parsed parts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the file values are invalid.
    pub fn from_parts(
        file: FileConfig,
        env: EnvOverrides,
        path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self {
            file,
            env,
            path,
            content_root: None,
        })
    }

    fn load_default() -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
        // 1. Check $QPRESS_CONFIG
        if let Ok(path) = std::env::var("QPRESS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok((Self::read_file(&path)?, Some(path)));
            }
        }

        // 2. Check $XDG_CONFIG_HOME/qpress/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("qpress/config.toml");
            if path.exists() {
                return Ok((Self::read_file(&path)?, Some(path)));
            }
        }

        // 3. Check ~/.qpress/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".qpress/config.toml");
            if path.exists() {
                return Ok((Self::read_file(&path)?, Some(path)));
            }
        }

        Ok((FileConfig::default(), None))
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for the user config file.
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".qpress/config.toml"))
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Deployment environment. Defaults to preview.
    pub fn environment(&self) -> Environment {
        self.env
            .environment
            .as_deref()
            .or(self.file.environment.as_deref())
            .map(Environment::from_name)
            .unwrap_or(Environment::Preview)
    }

    /// Repository owner, if configured anywhere.
    pub fn owner(&self) -> Option<&str> {
        self.env.owner.as_deref().or_else(|| {
            self.file
                .github
                .as_ref()
                .and_then(|g| g.owner.as_deref())
        })
    }

    /// GitHub API base URL.
    pub fn api_base(&self) -> &str {
        self.env
            .api_base
            .as_deref()
            .or_else(|| {
                self.file
                    .github
                    .as_ref()
                    .and_then(|g| g.api_base.as_deref())
            })
            .unwrap_or(DEFAULT_API_BASE)
    }

    /// Branch content is published to. Defaults to `main`.
    pub fn branch(&self) -> BranchName {
        self.file
            .github
            .as_ref()
            .and_then(|g| g.branch.as_deref())
            .and_then(|b| BranchName::new(b).ok())
            .unwrap_or_else(BranchName::main)
    }

    /// Per-request timeout for GitHub calls.
    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .file
            .github
            .as_ref()
            .and_then(|g| g.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// Identity recorded as the author of publish commits.
    pub fn committer(&self) -> CommitAuthor {
        let section = self.file.committer.as_ref();
        CommitAuthor {
            name: section
                .and_then(|c| c.name.clone())
                .unwrap_or_else(|| "quarto-press".to_string()),
            email: section
                .and_then(|c| c.email.clone())
                .unwrap_or_else(|| "quarto-press@users.noreply.github.com".to_string()),
        }
    }

    /// Resolve a publishing target.
    pub fn site(&self, kind: SiteKind) -> SiteTarget {
        let sites = self.file.sites.as_ref();
        let (section, default_repo, default_root) = match kind {
            SiteKind::Publications => (
                sites.and_then(|s| s.publications.as_ref()),
                self.env.repository.as_deref().unwrap_or("icr"),
                "icr_frontend",
            ),
            SiteKind::Newsletter => (
                sites.and_then(|s| s.newsletter.as_ref()),
                "newsletter_frontend",
                "newsletter_frontend",
            ),
            SiteKind::Conferences => (
                sites.and_then(|s| s.conferences.as_ref()),
                "conference_calendar",
                "conference_calendar",
            ),
        };

        // GH_REPOSITORY names the publications site and wins over the file.
        let repo = match (kind, self.env.repository.as_deref()) {
            (SiteKind::Publications, Some(env_repo)) => env_repo.to_string(),
            _ => section
                .and_then(|s| s.repo.clone())
                .unwrap_or_else(|| default_repo.to_string()),
        };

        let root = section
            .and_then(|s| s.root.clone())
            .unwrap_or_else(|| default_root.to_string());

        let url = section.and_then(|s| s.url.clone()).or_else(|| {
            self.owner()
                .map(|owner| format!("https://{}.github.io/{}", owner.to_ascii_lowercase(), repo))
        });

        SiteTarget {
            repo,
            root: self.resolve(PathBuf::from(root)),
            url,
        }
    }

    /// First scheduled digest firing.
    pub fn schedule_start(&self) -> chrono::DateTime<chrono::Utc> {
        self.file
            .schedule
            .as_ref()
            .and_then(|s| s.start)
            .unwrap_or_else(|| {
                chrono::Utc
                    .with_ymd_and_hms(2023, 3, 15, 0, 0, 0)
                    .single()
                    .unwrap_or(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH)
            })
    }

    /// Interval between digest firings. Defaults to one week.
    pub fn schedule_interval(&self) -> Duration {
        let days = self
            .file
            .schedule
            .as_ref()
            .and_then(|s| s.interval_days)
            .unwrap_or(7);
        Duration::from_secs(u64::from(days) * 24 * 60 * 60)
    }

    /// Path to the content store document.
    pub fn store_path(&self) -> PathBuf {
        self.file
            .store
            .as_ref()
            .and_then(|s| s.path.clone())
            .map(PathBuf::from)
            .map(|p| self.resolve(p))
            .unwrap_or_else(|| self.resolve(PathBuf::from("qpress-store.json")))
    }

    /// Resolve relative site roots and the store path against `dir`.
    pub fn with_content_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.content_root = Some(dir.into());
        self
    }

    fn resolve(&self, path: PathBuf) -> PathBuf {
        match &self.content_root {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }

    /// Get the path the config file was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> EnvOverrides {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvOverrides::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = Config::from_parts(FileConfig::default(), EnvOverrides::default(), None)
            .unwrap();

        assert_eq!(config.environment(), Environment::Preview);
        assert_eq!(config.api_base(), DEFAULT_API_BASE);
        assert_eq!(config.branch().as_str(), "main");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.schedule_interval(), Duration::from_secs(7 * 24 * 3600));
        assert_eq!(config.schedule_start().to_rfc3339(), "2023-03-15T00:00:00+00:00");
        assert!(config.owner().is_none());

        let site = config.site(SiteKind::Publications);
        assert_eq!(site.repo, "icr");
        assert_eq!(site.root, PathBuf::from("icr_frontend"));
        assert!(site.url.is_none());
    }

    #[test]
    fn environment_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
            environment = "dev"
            [github]
            owner = "file-owner"
            "#,
        )
        .unwrap();
        let config = Config::from_parts(
            file,
            env(&[("ENV_NAME", "prod"), ("GH_USER", "EnvOwner"), ("GH_REPOSITORY", "site")]),
            None,
        )
        .unwrap();

        assert_eq!(config.environment(), Environment::Production);
        assert_eq!(config.owner(), Some("EnvOwner"));
        let site = config.site(SiteKind::Publications);
        assert_eq!(site.repo, "site");
        assert_eq!(site.url.as_deref(), Some("https://envowner.github.io/site"));
        // GH_REPOSITORY only names the publications site
        assert_eq!(config.site(SiteKind::Newsletter).repo, "newsletter_frontend");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let overrides = env(&[("GH_USER", "  "), ("ENV_NAME", "")]);
        assert!(overrides.owner.is_none());
        assert!(overrides.environment.is_none());
    }

    #[test]
    fn only_prod_names_publish() {
        assert_eq!(Environment::from_name("prod"), Environment::Production);
        assert_eq!(Environment::from_name("Production"), Environment::Production);
        assert_eq!(Environment::from_name("dev"), Environment::Preview);
        assert_eq!(Environment::from_name("staging"), Environment::Preview);
    }

    #[test]
    fn load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [committer]
            name = "Lab Bot"
            email = "bot@lab.example"

            [sites.conferences]
            repo = "calendar"
            root = "cal"
            url = "https://lab.example/calendar"

            [store]
            path = "data/store.json"
            "#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap().config;
        assert_eq!(config.loaded_from(), Some(path.as_path()));
        assert_eq!(config.committer().name, "Lab Bot");
        let site = config.site(SiteKind::Conferences);
        assert_eq!(site.repo, "calendar");
        assert_eq!(site.root, PathBuf::from("cal"));
        assert_eq!(site.url.as_deref(), Some("https://lab.example/calendar"));
        assert_eq!(config.store_path(), PathBuf::from("data/store.json"));
    }

    #[test]
    fn load_rejects_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "environment = [").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(Some(&temp.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn content_root_resolves_relative_paths_only() {
        let mut file = FileConfig::default();
        file.store = Some(schema::StoreSection {
            path: Some("/var/lib/qpress/store.json".into()),
        });
        let config = Config::from_parts(file, EnvOverrides::default(), None)
            .unwrap()
            .with_content_root("/srv/sites");

        assert_eq!(
            config.site(SiteKind::Newsletter).root,
            PathBuf::from("/srv/sites/newsletter_frontend")
        );
        assert_eq!(config.store_path(), PathBuf::from("/var/lib/qpress/store.json"));
    }
}
