//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Location
//!
//! In order of precedence:
//! 1. `$QPRESS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/qpress/config.toml`
//! 3. `~/.qpress/config.toml`
//!
//! # Validation
//!
//! Values are validated after parsing (and again after the environment
//! overlay) so that an empty owner or a zero interval never reaches the
//! publisher or the scheduler.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Full configuration file.
///
/// # Example
///
/// ```toml
/// environment = "prod"
///
/// [github]
/// owner = "research-group"
/// branch = "main"
///
/// [committer]
/// name = "Site Publisher"
/// email = "publisher@example.org"
///
/// [sites.publications]
/// repo = "icr"
/// root = "icr_frontend"
///
/// [schedule]
/// start = "2023-03-15T00:00:00Z"
/// interval_days = 7
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Deployment environment ("prod" publishes, anything else previews)
    pub environment: Option<String>,

    /// GitHub API settings
    pub github: Option<GitHubSection>,

    /// Commit author identity
    pub committer: Option<CommitterSection>,

    /// Target sites
    pub sites: Option<SitesSection>,

    /// Digest schedule
    pub schedule: Option<ScheduleSection>,

    /// Content store location
    pub store: Option<StoreSection>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(github) = &self.github {
            github.validate()?;
        }
        if let Some(sites) = &self.sites {
            for site in [&sites.publications, &sites.newsletter, &sites.conferences]
                .into_iter()
                .flatten()
            {
                site.validate()?;
            }
        }
        if let Some(schedule) = &self.schedule {
            if schedule.interval_days == Some(0) {
                return Err(ConfigError::InvalidValue(
                    "schedule.interval_days must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// GitHub API settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSection {
    /// Repository owner (user or organization)
    pub owner: Option<String>,

    /// API base URL (GitHub Enterprise or a test server)
    pub api_base: Option<String>,

    /// Branch that content is published to
    pub branch: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl GitHubSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(owner) = &self.owner {
            if owner.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "github.owner cannot be empty".to_string(),
                ));
            }
        }
        if let Some(branch) = &self.branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid github.branch: {}", e))
            })?;
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "github.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Commit author identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CommitterSection {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// The three publishing targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SitesSection {
    /// Publications, arXiv imports, blog posts and profiles
    pub publications: Option<SiteSection>,

    /// Newsletter digest
    pub newsletter: Option<SiteSection>,

    /// Conference calendar
    pub conferences: Option<SiteSection>,
}

/// One publishing target: a remote repository and its local source tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Repository name under the configured owner
    pub repo: Option<String>,

    /// Local directory mirroring the repository contents
    pub root: Option<String>,

    /// Public URL of the rendered site (used for digest links)
    pub url: Option<String>,
}

impl SiteSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(repo) = &self.repo {
            if repo.trim().is_empty() || repo.contains('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid site repository name '{}'",
                    repo
                )));
            }
        }
        Ok(())
    }
}

/// Digest schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleSection {
    /// First firing (RFC3339)
    pub start: Option<chrono::DateTime<chrono::Utc>>,

    /// Days between firings
    pub interval_days: Option<u32>,
}

/// Content store location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_example() {
        let toml_str = r#"
            environment = "prod"

            [github]
            owner = "research-group"
            branch = "main"
            timeout_secs = 10

            [committer]
            name = "Site Publisher"
            email = "publisher@example.org"

            [sites.publications]
            repo = "icr"
            root = "icr_frontend"

            [schedule]
            start = "2023-03-15T00:00:00Z"
            interval_days = 7
        "#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.environment.as_deref(), Some("prod"));
        assert_eq!(
            config.sites.unwrap().publications.unwrap().repo.as_deref(),
            Some("icr")
        );
        assert_eq!(config.schedule.unwrap().interval_days, Some(7));
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("unknown = true");
        assert!(result.is_err());
    }

    #[test]
    fn zero_interval_rejected() {
        let config = FileConfig {
            schedule: Some(ScheduleSection {
                start: None,
                interval_days: Some(0),
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_branch_rejected() {
        let config = FileConfig {
            github: Some(GitHubSection {
                branch: Some("bad..branch".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn repo_with_slash_rejected() {
        let config = FileConfig {
            sites: Some(SitesSection {
                publications: Some(SiteSection {
                    repo: Some("owner/icr".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
