//! Command-line interface definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ArcSentinel: endpoint malware detection and quarantine
#[derive(Parser, Debug)]
#[command(name = "arc-sentinel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Use this settings file instead of the default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine processing
    Json,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a malware scan
    Scan {
        /// Scan common malware locations (default)
        #[arg(short, long, conflicts_with_all = ["full", "path"])]
        quick: bool,

        /// Scan the whole system drive
        #[arg(short, long, conflicts_with_all = ["quick", "path"])]
        full: bool,

        /// Scan specific path(s)
        #[arg(short, long, num_args = 1.., conflicts_with_all = ["quick", "full"])]
        path: Option<Vec<PathBuf>>,

        /// Move every detected file into quarantine
        #[arg(long)]
        quarantine: bool,
    },

    /// Run real-time protection until interrupted
    Monitor {
        /// Move every detected file into quarantine
        #[arg(long)]
        quarantine: bool,
    },

    /// Manage quarantined items
    Quarantine {
        #[command(subcommand)]
        action: QuarantineAction,
    },

    /// Show scan history
    History {
        /// Number of recent scans to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Manage the signature set
    Signatures {
        #[command(subcommand)]
        action: SignatureAction,
    },

    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the end of the activity log
    Logs {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

/// Quarantine subcommands.
#[derive(Subcommand, Debug)]
pub enum QuarantineAction {
    /// List quarantined items
    List,

    /// Move a file into quarantine
    Add {
        /// File to quarantine
        path: PathBuf,
    },

    /// Restore a quarantined item to its original location
    Restore {
        /// Quarantine artifact path or name
        item: PathBuf,
    },

    /// Delete a quarantined item permanently
    Purge {
        /// Quarantine artifact path or name
        item: PathBuf,
    },

    /// Find metadata left behind by interrupted operations
    Orphans {
        /// Delete the orphaned metadata files
        #[arg(long)]
        remove: bool,
    },
}

/// Signature subcommands.
#[derive(Subcommand, Debug)]
pub enum SignatureAction {
    /// Show signature counts
    Info,

    /// Replace the signature set with the contents of a file
    Import {
        /// JSON file with md5/sha1/sha256 digest lists
        file: PathBuf,
    },

    /// Add a single digest
    Add {
        /// Digest algorithm (md5, sha1, sha256)
        algorithm: String,
        /// Hex digest
        digest: String,
    },
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Add an excluded path
    ExcludeAdd {
        path: String,
    },

    /// Remove an excluded path
    ExcludeRemove {
        path: String,
    },

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file location
    Path,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
