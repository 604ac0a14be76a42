//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Read this config file instead of the default ones
//! - `--content-root <dir>`: Resolve relative site roots against this directory
//! - `--preview`: Write locally only, whatever the configured environment
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// qpress - publish research-group content as Quarto pages on GitHub
#[derive(Parser, Debug)]
#[command(name = "qpress")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to read
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory relative site roots and the store path resolve against
    #[arg(long, global = true, value_name = "DIR")]
    pub content_root: Option<PathBuf>,

    /// Write pages locally without publishing
    #[arg(long, global = true)]
    pub preview: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish a publication page and add it to the publications index
    #[command(
        long_about = "Publish a publication page and add it to the publications index.\n\n\
            The publication is read from a JSON file. It is stored first; a publication \
            whose name is already stored is skipped.",
        after_help = "\
EXAMPLES:
    qpress publication --file paper.json
    qpress --preview publication --file paper.json"
    )]
    Publication {
        /// JSON file holding the publication
        #[arg(long, value_name = "JSON")]
        file: PathBuf,
    },

    /// Import an arXiv abstract page and publish it
    #[command(after_help = "\
EXAMPLES:
    qpress arxiv https://arxiv.org/abs/1706.03762")]
    Arxiv {
        /// Abstract page URL
        url: String,
    },

    /// Publish a blog post
    Blog {
        /// JSON file holding the post
        #[arg(long, value_name = "JSON")]
        file: PathBuf,
    },

    /// Publish a researcher profile
    Profile {
        /// JSON file holding the profile
        #[arg(long, value_name = "JSON")]
        file: PathBuf,
    },

    /// Store a conference and republish the conference calendar
    Conference {
        /// JSON file holding the conference
        #[arg(long, value_name = "JSON")]
        file: PathBuf,
    },

    /// Build and publish the newsletter digest once
    Digest,

    /// Run the digest on its schedule until interrupted
    #[command(
        long_about = "Run the digest on its schedule until interrupted.\n\n\
            Firings happen at the configured start plus whole multiples of the \
            interval. Firings missed while the process was not running are not \
            made up."
    )]
    Schedule,

    /// Show the effective configuration (token redacted)
    Config,

    /// Generate shell completion scripts
    #[command(after_help = "\
EXAMPLES:
    # Bash (add to ~/.bashrc)
    eval \"$(qpress completion bash)\"

    # Zsh
    qpress completion zsh > \"${fpath[1]}/_qpress\"

    # Fish
    qpress completion fish > ~/.config/fish/completions/qpress.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shells with completion support.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["qpress", "digest", "--preview", "-q"]).unwrap();
        assert!(cli.preview);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Digest));
    }

    #[test]
    fn file_is_required() {
        assert!(Cli::try_parse_from(["qpress", "blog"]).is_err());
        let cli = Cli::try_parse_from(["qpress", "blog", "--file", "post.json"]).unwrap();
        assert!(matches!(cli.command, Command::Blog { file } if file == PathBuf::from("post.json")));
    }
}
