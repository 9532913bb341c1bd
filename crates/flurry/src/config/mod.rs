//! Configuration for the flurry loader.
//!
//! Settings come from an optional YAML file (with environment variable
//! interpolation) and are then overridden by command-line flags.

mod cli;

pub use cli::CliArgs;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flurry_core::StorageOptions;
pub use flurry_core::config::{InterpolationResult, MetricsConfig, interpolate};

use crate::error::ConfigError;
use flurry_core::error::{ReadFileSnafu, YamlParseSnafu};

/// Default number of rows per insert call.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Default destination table.
pub const DEFAULT_TABLE: &str = "raw_pageviews";

/// Default BigQuery API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com";

/// Configuration for reading and shaping the source dumps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Number of rows per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Projects starting with any of these prefixes are dropped.
    #[serde(default = "default_exclude_project_prefixes")]
    pub exclude_project_prefixes: Vec<String>,
    /// Timeout for opening a remote file.
    #[serde(default = "default_timeout_secs")]
    pub open_timeout_secs: u64,
    /// Timeout for each chunk read from an open file.
    #[serde(default = "default_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Number of manifest entries processed at once.
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            exclude_project_prefixes: default_exclude_project_prefixes(),
            open_timeout_secs: default_timeout_secs(),
            read_timeout_secs: default_timeout_secs(),
            max_concurrent_files: default_max_concurrent_files(),
        }
    }
}

impl SourceConfig {
    pub fn storage_options(&self) -> StorageOptions {
        StorageOptions {
            open_timeout: Duration::from_secs(self.open_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_exclude_project_prefixes() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_concurrent_files() -> usize {
    1
}

/// Configuration for the BigQuery destination table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationConfig {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub dataset: String,
    #[serde(default = "default_table")]
    pub table: String,
    /// API root; overridden in tests to point at a local server.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// OAuth bearer token, usually `${BIGQUERY_ACCESS_TOKEN}`.
    #[serde(default)]
    pub access_token: String,
    /// Timeout for a single insert call.
    #[serde(default = "default_timeout_secs")]
    pub load_timeout_secs: u64,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: String::new(),
            table: default_table(),
            endpoint: default_endpoint(),
            access_token: String::new(),
            load_timeout_secs: default_timeout_secs(),
        }
    }
}

impl DestinationConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    /// `project.dataset.table`, for logging.
    pub fn table_ref(&self) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset, self.table)
    }
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// What to do with entries that failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorHandlingConfig {
    /// Write a manifest of the failed entries here, for re-running.
    #[serde(default)]
    pub failed_manifest_path: Option<PathBuf>,
}

/// Main configuration for flurry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Path to the manifest JSON.
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    /// Count rows instead of writing them.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub destination: DestinationConfig,
    #[serde(default)]
    pub error_handling: ErrorHandlingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Build the effective configuration from command-line arguments.
    ///
    /// Reads `--config` when given, applies flag overrides and validates.
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(args);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu {
            path: path.to_path_buf(),
        })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Does not validate: flags may still fill in required settings.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let result = interpolate(contents);
        if !result.is_ok() {
            return Err(ConfigError::EnvInterpolation {
                message: result.errors.join("\n"),
            });
        }

        serde_yaml::from_str(&result.text).context(YamlParseSnafu)
    }

    /// Apply command-line overrides. Flags win over file settings.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(manifest) = &args.manifest {
            self.manifest = Some(manifest.clone());
        }
        if let Some(project_id) = &args.project_id {
            self.destination.project_id = project_id.clone();
        }
        if let Some(dataset) = &args.dataset {
            self.destination.dataset = dataset.clone();
        }
        if let Some(table) = &args.table {
            self.destination.table = table.clone();
        }
        if args.dry_run {
            self.dry_run = true;
        }
        if let Some(path) = &args.failed_manifest {
            self.error_handling.failed_manifest_path = Some(path.clone());
        }
    }

    /// Validate the configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.manifest.is_none() {
            errors.push(ConfigError::MissingField {
                field: "manifest".to_string(),
            });
        }

        let positive = [
            ("source.batch_size", self.source.batch_size as u64),
            (
                "source.max_concurrent_files",
                self.source.max_concurrent_files as u64,
            ),
            ("source.open_timeout_secs", self.source.open_timeout_secs),
            ("source.read_timeout_secs", self.source.read_timeout_secs),
            (
                "destination.load_timeout_secs",
                self.destination.load_timeout_secs,
            ),
        ];
        for (field, value) in positive {
            if value == 0 {
                errors.push(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
        }

        if !self.dry_run {
            let required = [
                ("destination.project_id", &self.destination.project_id),
                ("destination.dataset", &self.destination.dataset),
                ("destination.table", &self.destination.table),
                ("destination.endpoint", &self.destination.endpoint),
                ("destination.access_token", &self.destination.access_token),
            ];
            for (field, value) in required {
                if value.trim().is_empty() {
                    errors.push(ConfigError::MissingField {
                        field: field.to_string(),
                    });
                }
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleErrors {
                errors: errors.iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("manifest: m.json\ndry_run: true\n").unwrap();
        assert_eq!(config.source.batch_size, 10_000);
        assert_eq!(config.source.exclude_project_prefixes, vec!["en"]);
        assert_eq!(config.source.max_concurrent_files, 1);
        assert_eq!(config.destination.table, "raw_pageviews");
        assert_eq!(config.destination.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.destination.load_timeout(), Duration::from_secs(60));
        assert!(config.metrics.address.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
manifest: /data/manifest.json
source:
  batch_size: 500
  exclude_project_prefixes: ["en", "de"]
  read_timeout_secs: 30
  max_concurrent_files: 4
destination:
  project_id: analytics
  dataset: wiki
  access_token: secret
  load_timeout_secs: 15
error_handling:
  failed_manifest_path: /tmp/failed.json
metrics:
  address: "127.0.0.1:9090"
"#;
        let config = Config::parse(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.source.batch_size, 500);
        assert_eq!(config.source.exclude_project_prefixes, vec!["en", "de"]);
        assert_eq!(
            config.source.storage_options().read_timeout,
            Duration::from_secs(30)
        );
        assert_eq!(config.destination.table_ref(), "analytics.wiki.raw_pageviews");
        assert_eq!(
            config.error_handling.failed_manifest_path,
            Some(PathBuf::from("/tmp/failed.json"))
        );
        assert_eq!(config.metrics.address.as_deref(), Some("127.0.0.1:9090"));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = Config::parse("manifest: m.json\nsource:\n  batch_sise: 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::YamlParse { .. }));
    }

    #[test]
    fn test_missing_env_var_is_reported() {
        let err = Config::parse(
            "destination:\n  access_token: ${FLURRY_TEST_UNSET_TOKEN_VARIABLE}\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EnvInterpolation { .. }));
    }

    #[test]
    fn test_live_mode_requires_destination() {
        let config = Config::parse("manifest: m.json\n").unwrap();
        let err = config.validate().unwrap_err();
        let ConfigError::MultipleErrors { errors } = err else {
            panic!("expected multiple errors, got {err:?}");
        };
        assert!(errors.iter().any(|e| e.contains("destination.project_id")));
        assert!(errors.iter().any(|e| e.contains("destination.access_token")));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = Config::parse("manifest: m.json\ndry_run: true\nsource:\n  batch_size: 0\n")
            .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "source.batch_size"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = Config::parse(
            "manifest: a.json\ndestination:\n  project_id: p\n  dataset: d\n  table: t\n",
        )
        .unwrap();
        let args = CliArgs {
            manifest: Some(PathBuf::from("b.json")),
            table: Some("other".to_string()),
            dry_run: true,
            failed_manifest: Some(PathBuf::from("failed.json")),
            ..Default::default()
        };

        config.apply_cli(&args);

        assert_eq!(config.manifest, Some(PathBuf::from("b.json")));
        assert_eq!(config.destination.project_id, "p");
        assert_eq!(config.destination.table, "other");
        assert!(config.dry_run);
        assert_eq!(
            config.error_handling.failed_manifest_path,
            Some(PathBuf::from("failed.json"))
        );
    }

    #[test]
    fn test_load_without_config_file() {
        let args = CliArgs {
            manifest: Some(PathBuf::from("m.json")),
            dry_run: true,
            ..Default::default()
        };
        let config = Config::load(&args).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.destination.table, "raw_pageviews");
    }
}
