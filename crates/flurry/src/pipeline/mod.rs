//! Manifest-driven ingestion.
//!
//! Each manifest entry moves through
//! `Pending -> PartitionResolved -> Streaming -> Completed | Failed`.
//! Within a file, decode, shape, batch and load form one pull-driven
//! pipeline, so memory stays proportional to the batch size. A failing file
//! never stops the run.

mod batcher;
mod loader;
mod summary;

pub use batcher::Batcher;
pub use loader::Loader;
pub use summary::{FileOutcome, FileProgress, FileReport, RunSummary};

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use snafu::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use flurry_core::emit;
use flurry_core::metrics::events::{FileFailed, FileProcessed, FileStatus, LineRejected};
use flurry_core::{StorageProvider, StorageProviderRef};

use crate::config::{Config, SourceConfig};
use crate::error::{
    ConfigError, FileError, ManifestSnafu, PipelineError, SinkBuildSnafu, StorageSnafu,
    StreamOpenSnafu,
};
use crate::manifest::Manifest;
use crate::partition::Partition;
use crate::record::{PageviewRow, RowContext, RowShaper};
use crate::sink::BigQuerySink;
use crate::source;

/// Runs every manifest entry through the pipeline.
pub struct Ingestor {
    storage: StorageProviderRef,
    shaper: RowShaper,
    loader: Loader,
    batch_size: usize,
    max_concurrent_files: usize,
    shutdown: CancellationToken,
}

impl Ingestor {
    pub fn new(
        source: &SourceConfig,
        storage: StorageProviderRef,
        loader: Loader,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            storage,
            shaper: RowShaper::new(source.exclude_project_prefixes.clone()),
            loader,
            batch_size: source.batch_size.max(1),
            max_concurrent_files: source.max_concurrent_files.max(1),
            shutdown,
        }
    }

    /// Process `files` and report on each, in the order given.
    pub async fn run(&self, files: &[String]) -> RunSummary {
        info!(
            source = %self.storage.canonical_url(),
            files = files.len(),
            dry_run = self.loader.is_dry_run(),
            "Starting ingestion run"
        );

        let reports: Vec<FileReport> = stream::iter(files)
            .map(|file| self.process_entry(file))
            .buffered(self.max_concurrent_files)
            .collect()
            .await;

        let summary = RunSummary::new(self.loader.is_dry_run(), reports);
        info!(
            total_rows = summary.total_rows(),
            completed = summary.completed(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            "Ingestion run finished"
        );
        summary
    }

    async fn process_entry(&self, file: &str) -> FileReport {
        if self.shutdown.is_cancelled() {
            debug!(file = %file, "Skipping file, shutdown requested");
            emit!(FileProcessed {
                status: FileStatus::Skipped,
            });
            return FileReport::skipped(file);
        }

        let start = Instant::now();
        let mut progress = FileProgress::default();
        let result = self.process_file(file, &mut progress).await;

        let outcome = match result {
            Ok(()) => {
                info!(
                    file = %file,
                    rows = progress.rows_loaded,
                    lines = progress.lines_read,
                    rejected = progress.lines_rejected,
                    batches = progress.batches_loaded,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "File completed"
                );
                FileOutcome::Completed
            }
            Err(e) => {
                let stage = e.stage();
                warn!(
                    file = %file,
                    stage = %stage,
                    rows_delivered = progress.rows_loaded,
                    error = %e,
                    "File failed"
                );
                emit!(FileFailed { stage });
                FileOutcome::Failed {
                    stage,
                    reason: e.to_string(),
                }
            }
        };

        emit!(FileProcessed {
            status: outcome.status(),
        });

        FileReport {
            file: file.to_string(),
            outcome,
            progress,
            duration: start.elapsed(),
        }
    }

    async fn process_file(&self, file: &str, progress: &mut FileProgress) -> Result<(), FileError> {
        let partition = Partition::from_filename(file)?;
        debug!(file = %file, partition = %partition, "Partition resolved");

        let mut lines = source::open_lines(&self.storage, file)
            .await
            .context(StreamOpenSnafu)?;
        let ctx = RowContext {
            partition,
            ingested_at: Utc::now(),
        };
        info!(file = %file, partition = %partition, "Streaming file");

        let mut batcher = Batcher::new(self.batch_size);
        loop {
            let next = tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    return Err(FileError::Cancelled {
                        rows_loaded: progress.rows_loaded,
                    });
                }

                next = lines.next_line() => next,
            };

            let Some(line) = next else { break };
            let line = line?;
            progress.lines_read += 1;

            match self.shaper.shape(&line, &ctx) {
                Ok(row) => {
                    if let Some(batch) = batcher.push(row) {
                        self.deliver(file, batch, progress).await?;
                    }
                }
                Err(reason) => {
                    progress.lines_rejected += 1;
                    trace!(file = %file, reason = %reason, line = %line, "Line rejected");
                    emit!(LineRejected {
                        reason: reason.as_str(),
                    });
                }
            }
        }

        if let Some(batch) = batcher.finish() {
            self.deliver(file, batch, progress).await?;
        }

        Ok(())
    }

    /// Hand one batch to the loader. Cancellation is only honored before the
    /// call starts.
    async fn deliver(
        &self,
        file: &str,
        batch: Vec<PageviewRow>,
        progress: &mut FileProgress,
    ) -> Result<(), FileError> {
        if self.shutdown.is_cancelled() {
            return Err(FileError::Cancelled {
                rows_loaded: progress.rows_loaded,
            });
        }

        let rows = batch.len();
        let acknowledged = self.loader.load(batch).await?;
        progress.rows_loaded += acknowledged;
        progress.batches_loaded += 1;

        debug!(
            file = %file,
            rows,
            batch = progress.batches_loaded,
            total = progress.rows_loaded,
            "Batch delivered"
        );
        Ok(())
    }
}

/// Load the manifest named by `config` and ingest every entry.
///
/// Fails only on run-level problems (manifest, source URL, destination
/// client). Per-file failures are reported in the summary.
pub async fn run(config: &Config, shutdown: CancellationToken) -> Result<RunSummary, PipelineError> {
    let manifest_path = config
        .manifest
        .as_deref()
        .ok_or_else(|| ConfigError::MissingField {
            field: "manifest".to_string(),
        })?;
    let manifest = Manifest::load(manifest_path).context(ManifestSnafu)?;

    let storage = Arc::new(
        StorageProvider::for_url(&manifest.base_url, config.source.storage_options())
            .context(StorageSnafu)?,
    );

    let loader = if config.dry_run {
        info!("Dry run: rows will be counted, not inserted");
        Loader::dry_run()
    } else {
        let sink = BigQuerySink::new(&config.destination).context(SinkBuildSnafu)?;
        info!(table = %config.destination.table_ref(), "Loading into BigQuery");
        Loader::live(Arc::new(sink), config.destination.load_timeout())
    };

    let ingestor = Ingestor::new(&config.source, storage, loader, shutdown);
    let summary = ingestor.run(&manifest.files).await;

    if let Some(path) = &config.error_handling.failed_manifest_path {
        let unfinished = summary.unfinished_files();
        if !unfinished.is_empty() {
            let count = unfinished.len();
            match manifest.subset(unfinished).write(path) {
                Ok(()) => info!(
                    path = %path.display(),
                    files = count,
                    "Wrote manifest of unfinished files"
                ),
                Err(e) => error!(error = %e, "Failed to write manifest of unfinished files"),
            }
        }
    }

    Ok(summary)
}
