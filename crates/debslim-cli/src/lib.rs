//! debslim - slim Debian mirror tooling
//!
//! Curates a full Debian package index down to a bounded, ranked,
//! dependency-closed subset, filters the archive indexes to that subset,
//! and republishes the filtered tree through an object store.
//!
//! # Pipeline
//!
//! ```text
//! debslim curate   popcon + Packages  ->  packages.txt / deps.txt / all.txt
//! debslim filter   Packages + all.txt ->  filtered Packages per input
//! debslim publish  artifact tree      ->  reconciled remote key space
//! ```

#![allow(clippy::missing_errors_doc)]

pub mod cmd;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the `debslim` binary.
#[derive(Debug, Parser)]
#[command(name = "debslim")]
#[command(author, version, about = "Curate and republish slim Debian package indexes")]
pub struct Cli {
    /// Selected subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the curated package lists from popularity and index data
    Curate(CurateArgs),
    /// Filter Packages indexes down to an allow-list
    Filter(FilterArgs),
    /// Publish an artifact tree to the object store
    Publish(PublishArgs),
}

/// Arguments for `debslim curate`.
#[derive(Debug, Args)]
pub struct CurateArgs {
    /// Distribution suite
    #[arg(long, default_value = "trixie")]
    pub suite: String,

    /// Architecture
    #[arg(long, default_value = "amd64")]
    pub arch: String,

    /// Upstream mirror base URL
    #[arg(long, default_value = "https://deb.debian.org/debian")]
    pub mirror: String,

    /// Popularity data source (URL or local file)
    #[arg(long, default_value = "https://popcon.debian.org/main/by_inst.gz")]
    pub popcon: String,

    /// Packages index source (URL or local file); derived from
    /// mirror/suite/arch when omitted
    #[arg(long)]
    pub index: Option<String>,

    /// TOML policy file overriding the built-in selection policy
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Override the policy's primary budget
    #[arg(long)]
    pub primary_budget: Option<usize>,

    /// Override the policy's dependency budget
    #[arg(long)]
    pub dep_budget: Option<usize>,

    /// Override the policy's minimum popularity score
    #[arg(long)]
    pub threshold: Option<u64>,

    /// Directory the curated lists are written into
    #[arg(short, long, default_value = "curated")]
    pub output_dir: PathBuf,
}

/// Arguments for `debslim filter`.
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Allowed package names, one per line
    #[arg(short, long)]
    pub allowed: PathBuf,

    /// Input index file (single-file mode)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output index file (single-file mode)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TSV batch file: input<TAB>output, one job per line
    #[arg(short, long, conflicts_with_all = ["input", "output"])]
    pub batch: Option<PathBuf>,

    /// Print per-file stanza counts
    #[arg(long)]
    pub stats: bool,
}

/// Arguments for `debslim publish`.
#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Local artifact tree to publish
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Bucket name (or DEBSLIM_STORE_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// S3-compatible endpoint URL (or DEBSLIM_STORE_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Access key ID (or DEBSLIM_STORE_ACCESS_KEY)
    #[arg(long)]
    pub access_key: Option<String>,

    /// Secret access key (or DEBSLIM_STORE_SECRET_KEY)
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Keys per upload/delete batch
    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Show what would happen without touching the store
    #[arg(long)]
    pub dry_run: bool,
}
