//! config command - Show the effective configuration

use super::Context;
use crate::auth::TOKEN_ENV_VAR;
use crate::core::config::{Config, SiteKind};
use crate::ui::output;
use anyhow::Result;

/// Print every effective setting, one `key = value` per line.
pub fn show(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    for line in render(&config, std::env::var(TOKEN_ENV_VAR).ok().as_deref()) {
        println!("{}", line);
    }
    if config.owner().is_none() {
        output::warn("no GitHub owner configured; set GH_USER or github.owner", ctx.verbosity());
    }
    Ok(())
}

fn render(config: &Config, token: Option<&str>) -> Vec<String> {
    let mut lines = vec![
        "# Effective configuration".to_string(),
        format!(
            "config.file = {}",
            config
                .loaded_from()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        ),
        format!("environment = {}", config.environment()),
        format!("github.owner = {}", config.owner().unwrap_or("(not set)")),
        format!(
            "github.token = {}",
            token
                .filter(|t| !t.trim().is_empty())
                .map(|t| output::redact(t.trim()))
                .unwrap_or_else(|| "(not set)".to_string())
        ),
        format!("github.api_base = {}", config.api_base()),
        format!("github.branch = {}", config.branch()),
        format!("github.timeout_secs = {}", config.request_timeout().as_secs()),
    ];

    let committer = config.committer();
    lines.push(format!("committer = {} <{}>", committer.name, committer.email));

    for (key, kind) in [
        ("publications", SiteKind::Publications),
        ("newsletter", SiteKind::Newsletter),
        ("conferences", SiteKind::Conferences),
    ] {
        let site = config.site(kind);
        lines.push(format!("sites.{}.repo = {}", key, site.repo));
        lines.push(format!("sites.{}.root = {}", key, site.root.display()));
        lines.push(format!(
            "sites.{}.url = {}",
            key,
            site.url.as_deref().unwrap_or("(not set)")
        ));
    }

    lines.push(format!("schedule.start = {}", config.schedule_start().to_rfc3339()));
    lines.push(format!(
        "schedule.interval_days = {}",
        config.schedule_interval().as_secs() / 86_400
    ));
    lines.push(format!("store.path = {}", config.store_path().display()));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{EnvOverrides, FileConfig};

    #[test]
    fn token_is_redacted() {
        let config = Config::from_parts(
            FileConfig::default(),
            EnvOverrides {
                owner: Some("Lab".into()),
                ..Default::default()
            },
            None,
        )
        .unwrap();
        let lines = render(&config, Some("ghp_0123456789abcdefWXYZ"));
        let joined = lines.join("\n");
        assert!(joined.contains("github.token = ****WXYZ"));
        assert!(!joined.contains("0123456789"));
        assert!(joined.contains("github.owner = Lab"));
        assert!(joined.contains("sites.publications.url = https://lab.github.io/icr"));
    }

    #[test]
    fn missing_values_are_marked() {
        let config = Config::default();
        let joined = render(&config, None).join("\n");
        assert!(joined.contains("github.token = (not set)"));
        assert!(joined.contains("github.owner = (not set)"));
        assert!(joined.contains("environment = preview"));
    }
}
