//! ui::output
//!
//! Terminal output for the CLI.
//!
//! Everything except errors is suppressed by `--quiet`. Diagnostics go
//! through `tracing`; this module is only for results the user asked for.

use std::fmt::Display;

use crate::publish::pipeline::{OutcomeStatus, PipelineOutcome};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Debug,
}

impl Verbosity {
    /// `--quiet` wins over `--debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("✓ {}", message);
    }
}

/// One-paragraph summary of a pipeline run.
pub fn format_outcome(what: &str, outcome: &PipelineOutcome) -> String {
    let headline = match (&outcome.status, &outcome.receipt) {
        (OutcomeStatus::Published, Some(receipt)) => {
            format!("{} published in commit {}", what, receipt.commit.short(7))
        }
        (OutcomeStatus::Published, None) => format!("{} published", what),
        (OutcomeStatus::Previewed, _) => {
            format!("{} written locally; run `quarto preview` to inspect", what)
        }
        (OutcomeStatus::Skipped, _) => format!("{} already exists; nothing to do", what),
    };
    if outcome.files.is_empty() {
        return headline;
    }
    let files: Vec<String> = outcome
        .files
        .iter()
        .map(|f| f.relative_path.clone())
        .collect();
    format!("{}\n{}", headline, format_list(&files, "  "))
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hide all but the last four characters of a secret.
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::MaterializedFile;

    #[test]
    fn quiet_wins() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
    }

    #[test]
    fn redact_keeps_tail_only() {
        assert_eq!(redact("ghp_abcdefghijkl1234"), "****1234");
        assert_eq!(redact("short"), "****");
    }

    #[test]
    fn previewed_outcome_lists_files() {
        let outcome = PipelineOutcome {
            status: OutcomeStatus::Previewed,
            files: vec![MaterializedFile {
                absolute_path: "/tmp/site/posts/x/index.qmd".into(),
                relative_path: "posts/x/index.qmd".into(),
            }],
            receipt: None,
        };
        let text = format_outcome("Blog post", &outcome);
        assert!(text.starts_with("Blog post written locally"));
        assert!(text.ends_with("  posts/x/index.qmd"));
    }

    #[test]
    fn skipped_outcome() {
        assert_eq!(
            format_outcome("Publication", &PipelineOutcome::skipped()),
            "Publication already exists; nothing to do"
        );
    }
}
