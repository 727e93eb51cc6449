//! CLI argument parsing using clap derive

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use alertsync_core::Overrides;

/// alertsync - Validate alert rules and sync them to an alerting backend
#[derive(Parser, Debug)]
#[command(name = "alertsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub backend: BackendArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Backend connection and run settings shared by every command
#[derive(Args, Clone, Default)]
pub struct BackendArgs {
    /// Base URL of the alerting backend
    #[arg(long, env = "GRAFANA_URL", global = true)]
    pub url: Option<String>,

    /// API token (only accepted from the environment or this flag)
    #[arg(long, env = "GRAFANA_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Organization the rules belong to
    #[arg(long, env = "GRAFANA_ORG_ID", global = true)]
    pub org_id: Option<u64>,

    /// User config file to read instead of the platform default
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Deadline for the whole run, in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout_secs: Option<u64>,

    /// Attempts per backend call, including the first
    #[arg(long, value_name = "N", global = true)]
    pub retries: Option<u32>,

    /// Delay before the first retry, in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub retry_base_ms: Option<u64>,
}

impl BackendArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            token: self.token.clone(),
            org_id: self.org_id,
            timeout_secs: self.timeout_secs,
            retries: self.retries,
            retry_base_ms: self.retry_base_ms,
        }
    }
}

impl fmt::Debug for BackendArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendArgs")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("org_id", &self.org_id)
            .field("config", &self.config)
            .field("timeout_secs", &self.timeout_secs)
            .field("retries", &self.retries)
            .field("retry_base_ms", &self.retry_base_ms)
            .finish()
    }
}

/// Rules directory and optional policy document
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RulesArgs {
    /// Directory of rule files (`<folderUID>/<uid>.json`)
    pub dir: PathBuf,

    /// Notification policy document (defaults to `<dir>/_policies.json`)
    #[arg(long, value_name = "FILE")]
    pub policies: Option<PathBuf>,
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Colored text for terminals
    #[default]
    Human,
    /// A single JSON document on stdout
    Json,
    /// Markdown, for pull request comments
    Markdown,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Validate local rules without contacting the backend
    ///
    /// Exits 1 if any rule has an error violation. Warnings are reported
    /// but do not fail the run.
    Validate {
        #[command(flatten)]
        rules: RulesArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Human)]
        format: Format,
    },

    /// Show what apply would change on the backend
    Plan {
        #[command(flatten)]
        rules: RulesArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Human)]
        format: Format,

        /// Print a unified diff for every rule to update
        #[arg(long)]
        diff: bool,
    },

    /// Apply local rules to the backend
    ///
    /// Prints the plan and asks for confirmation. Non-interactive sessions
    /// must pass --yes. Exits 2 if some operations failed.
    ///
    /// Examples:
    ///   alertsync apply rules/            # Prompt before writing
    ///   alertsync apply rules/ --yes      # CI usage
    Apply {
        #[command(flatten)]
        rules: RulesArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Human)]
        format: Format,

        /// Print a unified diff for every rule to update
        #[arg(long)]
        diff: bool,

        /// Apply without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Write every backend rule into a local rules directory
    Export {
        /// Destination directory
        dir: PathBuf,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   alertsync completions bash > ~/.local/share/bash-completion/completions/alertsync
    ///   alertsync completions zsh > ~/.zfunc/_alertsync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
