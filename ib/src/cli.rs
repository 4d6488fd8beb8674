//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ib - resolve issue keys in debounced, grouped batches
#[derive(Parser)]
#[command(
    name = "ib",
    about = "Resolve issue keys in debounced, grouped, rate-limited batches",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/issuebatch/logs/issuebatch.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (overrides config)
    #[arg(short, long, global = true, help = "Log level: trace, debug, info, warn, error")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Resolve one or more issue keys
    Resolve {
        /// Issue keys to resolve
        #[arg(required = true, value_name = "KEY")]
        keys: Vec<String>,

        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Extract issue keys from a file and resolve them as one burst
    Scan {
        /// File to scan
        file: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config,
}

/// Where lookups go and which account they run under
#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// Account alias to resolve under (default: no account)
    #[arg(short, long)]
    pub account: Option<String>,

    /// YAML/JSON file of issues per account to resolve against
    #[arg(long, value_name = "FILE")]
    pub fixtures: PathBuf,
}

/// Output format for resolved issues
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
