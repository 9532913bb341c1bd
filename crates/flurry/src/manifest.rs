//! Manifest of remote files to load.
//!
//! ```json
//! { "base_url": "https://dumps.wikimedia.org/other/pageviews/2024/2024-01/",
//!   "files": ["pageviews-20240115-070000.gz"] }
//! ```

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::path::Path;

use crate::error::{
    EmptyBaseUrlSnafu, ManifestError, ParseManifestSnafu, ReadManifestSnafu,
    SerializeManifestSnafu, WriteManifestSnafu,
};

/// The sole source of work for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Prefix each filename is appended to.
    pub base_url: String,
    /// Filenames, processed in order.
    pub files: Vec<String>,
}

impl Manifest {
    /// Read and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path).context(ReadManifestSnafu { path })?;
        let manifest: Manifest =
            serde_json::from_str(&contents).context(ParseManifestSnafu { path })?;

        ensure!(!manifest.base_url.trim().is_empty(), EmptyBaseUrlSnafu { path });

        Ok(manifest)
    }

    /// A manifest with the same base URL restricted to `files`.
    pub fn subset<I>(&self, files: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            base_url: self.base_url.clone(),
            files: files.into_iter().collect(),
        }
    }

    /// Write the manifest as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
        let json = serde_json::to_string_pretty(self).context(SerializeManifestSnafu)?;
        std::fs::write(path, json + "\n").context(WriteManifestSnafu { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir,
            r#"{"base_url": "https://example.org/dumps/", "files": ["a.gz", "b.gz"]}"#,
        );

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.base_url, "https://example.org/dumps/");
        assert_eq!(manifest.files, vec!["a.gz", "b.gz"]);
    }

    #[test]
    fn test_empty_files_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(&dir, r#"{"base_url": "/data", "files": []}"#);
        assert!(Manifest::load(&path).unwrap().files.is_empty());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = Manifest::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ManifestError::ReadManifest { .. }));

        let path = write_manifest(&dir, r#"{"base_url": "/data"}"#);
        let no_files = Manifest::load(&path).unwrap_err();
        assert!(matches!(no_files, ManifestError::ParseManifest { .. }));

        let path = write_manifest(&dir, "{not json");
        let malformed = Manifest::load(&path).unwrap_err();
        assert!(matches!(malformed, ManifestError::ParseManifest { .. }));

        let path = write_manifest(&dir, r#"{"base_url": " ", "files": ["a.gz"]}"#);
        let empty_base = Manifest::load(&path).unwrap_err();
        assert!(matches!(empty_base, ManifestError::EmptyBaseUrl { .. }));
    }

    #[test]
    fn test_subset_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest {
            base_url: "/data".to_string(),
            files: vec!["a.gz".into(), "b.gz".into(), "c.gz".into()],
        };

        let failed = manifest.subset(vec!["b.gz".to_string()]);
        let path = dir.path().join("failed.json");
        failed.write(&path).unwrap();

        let reloaded = Manifest::load(&path).unwrap();
        assert_eq!(reloaded.base_url, "/data");
        assert_eq!(reloaded.files, vec!["b.gz"]);
    }
}
