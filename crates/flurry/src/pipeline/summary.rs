//! Per-file reports and the end-of-run summary.

use std::fmt;
use std::time::Duration;

use flurry_core::metrics::events::{FailureStage, FileStatus};

/// Counters for one file, updated as it streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileProgress {
    pub lines_read: u64,
    pub lines_rejected: u64,
    pub batches_loaded: u64,
    /// Rows acknowledged by the destination (or counted in dry-run mode).
    pub rows_loaded: u64,
}

/// Terminal state of a manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Completed,
    Failed { stage: FailureStage, reason: String },
    /// Never started because the run was cancelled.
    Skipped,
}

impl FileOutcome {
    pub fn status(&self) -> FileStatus {
        match self {
            FileOutcome::Completed => FileStatus::Completed,
            FileOutcome::Failed { .. } => FileStatus::Failed,
            FileOutcome::Skipped => FileStatus::Skipped,
        }
    }
}

/// What happened to one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub file: String,
    pub outcome: FileOutcome,
    pub progress: FileProgress,
    pub duration: Duration,
}

impl FileReport {
    pub fn skipped(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            outcome: FileOutcome::Skipped,
            progress: FileProgress::default(),
            duration: Duration::ZERO,
        }
    }

    /// Rows this entry adds to the run total. Failed files add none, even
    /// when some of their batches were delivered.
    pub fn credited_rows(&self) -> u64 {
        match self.outcome {
            FileOutcome::Completed => self.progress.rows_loaded,
            _ => 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == FileOutcome::Completed
    }
}

/// Outcome of a whole run, in manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub dry_run: bool,
    pub reports: Vec<FileReport>,
}

impl RunSummary {
    pub fn new(dry_run: bool, reports: Vec<FileReport>) -> Self {
        Self { dry_run, reports }
    }

    /// Rows from completed files.
    pub fn total_rows(&self) -> u64 {
        self.reports.iter().map(FileReport::credited_rows).sum()
    }

    pub fn completed(&self) -> usize {
        self.count(FileStatus::Completed)
    }

    pub fn failed(&self) -> usize {
        self.count(FileStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(FileStatus::Skipped)
    }

    fn count(&self, status: FileStatus) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.status() == status)
            .count()
    }

    /// True when every entry completed.
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(FileReport::is_completed)
    }

    /// Entries that did not complete, in manifest order.
    pub fn unfinished_files(&self) -> Vec<String> {
        self.reports
            .iter()
            .filter(|r| !r.is_completed())
            .map(|r| r.file.clone())
            .collect()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run {
            "counted (dry run)"
        } else {
            "inserted"
        };
        write!(
            f,
            "Total rows {verb}: {} ({} completed, {} failed",
            self.total_rows(),
            self.completed(),
            self.failed()
        )?;
        if self.skipped() > 0 {
            write!(f, ", {} skipped", self.skipped())?;
        }
        write!(f, ")")?;

        for report in &self.reports {
            if let FileOutcome::Failed { stage, reason } = &report.outcome {
                write!(f, "\n  FAILED {} [{stage}]: {reason}", report.file)?;
                if report.progress.rows_loaded > 0 {
                    write!(
                        f,
                        " ({} rows delivered before failure)",
                        report.progress.rows_loaded
                    )?;
                }
            }
        }
        Ok(())
    }
}
