//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Load hourly pageview dumps named by a manifest into BigQuery.
#[derive(Parser, Debug, Default)]
#[command(version)]
pub struct CliArgs {
    /// Path to the manifest JSON ({"base_url": ..., "files": [...]})
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Destination GCP project
    #[arg(long, alias = "project_id")]
    pub project_id: Option<String>,

    /// Destination dataset
    #[arg(long)]
    pub dataset: Option<String>,

    /// Destination table
    #[arg(long)]
    pub table: Option<String>,

    /// Count rows without writing to the destination
    #[arg(long = "dry-run", alias = "dry_run")]
    pub dry_run: bool,

    /// Path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the failed subset of the manifest here
    #[arg(long = "failed-manifest")]
    pub failed_manifest: Option<PathBuf>,
}
