//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// claimsync: reconcile source metadata into a Wikibase-style store
#[derive(Parser)]
#[command(name = "claimsync")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile and submit a file of observations (one JSON object per line)
    Sync {
        /// Path to the observations file (JSONL)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Compute and print mutations without submitting anything
        #[arg(long)]
        dry_run: bool,

        /// Create subjects the store does not have yet
        #[arg(long)]
        create: bool,

        /// Run against an empty in-memory store instead of the remote one
        #[arg(long)]
        offline: bool,

        /// Override the duplicate report path
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Show the mutations a file of observations would cause against a snapshot
    Plan {
        /// Path to the observations file (JSONL)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSON array of subjects to reconcile against
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a free-text date expression
    ParseDate {
        /// Date text, e.g. "c. 1780-1790"
        #[arg(value_name = "TEXT")]
        text: String,

        /// Century for fully two-digit ranges such as "23-34"
        #[arg(long)]
        century: Option<i32>,
    },

    /// Print the content fingerprint of a file
    Fingerprint {
        /// File to hash
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Hash algorithm (sha1, sha256)
        #[arg(short, long, default_value = "sha1")]
        algorithm: claimsync::FingerprintAlgorithm,
    },
}
