//! Error types for the flurry loader.

use snafu::prelude::*;

use flurry_core::metrics::events::FailureStage;

// Re-export common errors
pub use flurry_core::error::{ConfigError, StorageError};

/// Filename did not encode a valid hourly partition.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PartitionError {
    #[snafu(display("Malformed filename '{filename}': {reason}"))]
    MalformedFilename { filename: String, reason: String },
}

/// Errors raised while turning a compressed byte stream into lines.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReaderError {
    /// Corrupt gzip framing (bad header, bad deflate data, truncation, CRC).
    #[snafu(display("Failed to decompress {path}: {source}"))]
    Decode {
        path: String,
        source: std::io::Error,
    },

    /// The underlying byte stream failed mid-file.
    #[snafu(display("Failed to read {path}: {source}"))]
    Read { path: String, source: StorageError },
}

/// Errors raised by the destination store when appending a batch.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LoadError {
    /// The store refused some or all rows (validation, quota, permissions).
    #[snafu(display("Destination rejected batch of {rows} rows: {}", details.join("; ")))]
    Rejected { rows: usize, details: Vec<String> },

    /// The request never produced a store verdict.
    #[snafu(display("Transport error delivering batch: {source}"))]
    Transport { source: reqwest::Error },

    /// The load call did not return within the configured bound.
    #[snafu(display("Timed out after {timeout_secs}s delivering batch"))]
    Timeout { timeout_secs: u64 },
}

impl LoadError {
    /// True for failures where the store never answered.
    pub fn is_transport(&self) -> bool {
        matches!(self, LoadError::Transport { .. } | LoadError::Timeout { .. })
    }
}

/// Why a single manifest entry did not complete.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FileError {
    #[snafu(display("{source}"))]
    Partition { source: PartitionError },

    #[snafu(display("Failed to open stream: {source}"))]
    StreamOpen { source: StorageError },

    #[snafu(display("{source}"))]
    Reader { source: ReaderError },

    #[snafu(display("{source}"))]
    Load { source: LoadError },

    #[snafu(display("Cancelled after {rows_loaded} rows were delivered"))]
    Cancelled { rows_loaded: u64 },
}

impl FileError {
    /// Stage label used in logs, metrics and the run summary.
    pub fn stage(&self) -> FailureStage {
        match self {
            FileError::Partition { .. } => FailureStage::Partition,
            FileError::StreamOpen { .. } => FailureStage::Open,
            FileError::Reader {
                source: ReaderError::Decode { .. },
            } => FailureStage::Decode,
            FileError::Reader {
                source: ReaderError::Read { .. },
            } => FailureStage::Read,
            FileError::Load { .. } => FailureStage::Load,
            FileError::Cancelled { .. } => FailureStage::Cancelled,
        }
    }
}

impl From<PartitionError> for FileError {
    fn from(source: PartitionError) -> Self {
        FileError::Partition { source }
    }
}

impl From<ReaderError> for FileError {
    fn from(source: ReaderError) -> Self {
        FileError::Reader { source }
    }
}

impl From<LoadError> for FileError {
    fn from(source: LoadError) -> Self {
        FileError::Load { source }
    }
}

/// Errors loading the manifest. Fatal before any file is processed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ManifestError {
    #[snafu(display("Failed to read manifest {}: {source}", path.display()))]
    ReadManifest {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to parse manifest {}: {source}", path.display()))]
    ParseManifest {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("Manifest {} has an empty base_url", path.display()))]
    EmptyBaseUrl { path: std::path::PathBuf },

    #[snafu(display("Failed to write manifest {}: {source}", path.display()))]
    WriteManifest {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to serialize manifest: {source}"))]
    SerializeManifest { source: serde_json::Error },
}

/// Top-level run errors. Any of these aborts the whole run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Manifest could not be loaded.
    #[snafu(display("Manifest error: {source}"))]
    Manifest { source: ManifestError },

    /// Source storage could not be set up for the manifest's base_url.
    #[snafu(display("Storage error: {source}"))]
    Storage { source: StorageError },

    /// Destination client could not be built.
    #[snafu(display("Failed to build destination client: {source}"))]
    SinkBuild { source: reqwest::Error },
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}

impl From<ManifestError> for PipelineError {
    fn from(source: ManifestError) -> Self {
        PipelineError::Manifest { source }
    }
}

impl From<StorageError> for PipelineError {
    fn from(source: StorageError) -> Self {
        PipelineError::Storage { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        let decode = FileError::from(ReaderError::Decode {
            path: "a.gz".into(),
            source: std::io::Error::other("bad header"),
        });
        assert_eq!(decode.stage(), FailureStage::Decode);

        let read = FileError::from(ReaderError::Read {
            path: "a.gz".into(),
            source: StorageError::ReadTimeout {
                path: "a.gz".into(),
                timeout_secs: 1,
            },
        });
        assert_eq!(read.stage(), FailureStage::Read);

        let load = FileError::from(LoadError::Timeout { timeout_secs: 3 });
        assert_eq!(load.stage(), FailureStage::Load);
    }

    #[test]
    fn test_rejected_display_lists_details() {
        let err = LoadError::Rejected {
            rows: 2,
            details: vec!["row 0: invalid views".into(), "row 1: invalid views".into()],
        };
        assert_eq!(
            err.to_string(),
            "Destination rejected batch of 2 rows: row 0: invalid views; row 1: invalid views"
        );
        assert!(!err.is_transport());
        assert!(LoadError::Timeout { timeout_secs: 1 }.is_transport());
    }
}
