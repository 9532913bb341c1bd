//! Flurry: manifest-driven loader for hourly pageview dumps.
//!
//! This crate handles:
//! - Resolving the hourly partition encoded in each dump filename
//! - Streaming and decompressing gzip dumps over HTTP(S) or from local disk
//! - Filtering and shaping lines into pageview rows
//! - Appending fixed-size batches to BigQuery with per-file failure isolation

pub mod config;
pub mod error;
pub mod manifest;
pub mod partition;
pub mod pipeline;
pub mod record;
pub mod sink;
pub mod source;

// Re-export commonly used items
pub use config::{CliArgs, Config};
pub use error::PipelineError;
pub use manifest::Manifest;
pub use partition::Partition;
pub use pipeline::{Ingestor, Loader, RunSummary, run};
pub use record::{PageviewRow, Rejection, RowShaper};

pub use flurry_core::{
    MetricsConfig, StorageProvider, StorageProviderRef, cancel_on_signal, init_metrics,
    init_tracing, shutdown_signal,
};
