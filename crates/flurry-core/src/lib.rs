//! flurry-core: Shared plumbing for the flurry loader.
//!
//! - `storage/` - Streaming reads from HTTP(S) prefixes and local directories
//! - `metrics/` - Internal events and the Prometheus endpoint
//! - `config/` - Environment variable interpolation and metrics settings
//! - `signal` - Signal handling for graceful shutdown
//! - `tracing` - Log subscriber setup
//! - `error` - Common error types

pub mod config;
pub mod error;
pub mod metrics;
pub mod signal;
pub mod storage;
pub mod tracing;

pub use config::{InterpolationResult, MetricsConfig, interpolate, interpolate_with};
pub use error::{ConfigError, MetricsError, StorageError};
pub use self::metrics::{MetricsController, init as init_metrics};
pub use signal::{cancel_on_signal, shutdown_signal};
pub use storage::{ByteStream, StorageOptions, StorageProvider, StorageProviderRef};
pub use self::tracing::init_tracing;
