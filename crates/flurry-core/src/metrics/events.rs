//! Internal events for flurry metrics emission.
//!
//! Each event struct represents a measurable occurrence in the ingestion
//! pipeline. Events implement the `InternalEvent` trait which records the
//! corresponding metric on whatever recorder is installed.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Rows acknowledged by the destination (or counted in dry-run mode).
pub struct RowsLoaded {
    pub count: u64,
    pub dry_run: bool,
}

impl InternalEvent for RowsLoaded {
    fn emit(self) {
        trace!(count = self.count, dry_run = self.dry_run, "Rows loaded");
        let mode = if self.dry_run { "dry_run" } else { "live" };
        counter!("flurry_rows_loaded_total", "mode" => mode).increment(self.count);
    }
}

/// A decoded line that did not produce a row.
pub struct LineRejected {
    pub reason: &'static str,
}

impl InternalEvent for LineRejected {
    fn emit(self) {
        counter!("flurry_lines_rejected_total", "reason" => self.reason).increment(1);
    }
}

/// A batch delivered to the destination.
pub struct BatchLoaded {
    pub rows: usize,
    pub duration: Duration,
}

impl InternalEvent for BatchLoaded {
    fn emit(self) {
        trace!(rows = self.rows, duration_ms = self.duration.as_millis() as u64, "Batch loaded");
        counter!("flurry_batches_loaded_total").increment(1);
        histogram!("flurry_batch_load_duration_seconds").record(self.duration.as_secs_f64());
    }
}

/// Compressed bytes pulled from a remote object.
pub struct BytesRead {
    pub bytes: u64,
}

impl InternalEvent for BytesRead {
    fn emit(self) {
        counter!("flurry_bytes_read_total").increment(self.bytes);
    }
}

/// Final status of a manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Completed,
    Failed,
    Skipped,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Completed => "completed",
            FileStatus::Failed => "failed",
            FileStatus::Skipped => "skipped",
        }
    }
}

/// Stage at which a manifest entry failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Partition,
    Open,
    Read,
    Decode,
    Load,
    Cancelled,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Partition => "partition",
            FailureStage::Open => "open",
            FailureStage::Read => "read",
            FailureStage::Decode => "decode",
            FailureStage::Load => "load",
            FailureStage::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A manifest entry reached a terminal state.
pub struct FileProcessed {
    pub status: FileStatus,
}

impl InternalEvent for FileProcessed {
    fn emit(self) {
        trace!(status = self.status.as_str(), "File processed");
        counter!("flurry_files_processed_total", "status" => self.status.as_str()).increment(1);
    }
}

/// A manifest entry failed.
pub struct FileFailed {
    pub stage: FailureStage,
}

impl InternalEvent for FileFailed {
    fn emit(self) {
        trace!(stage = self.stage.as_str(), "File failed");
        counter!("flurry_files_failed_total", "stage" => self.stage.as_str()).increment(1);
    }
}
