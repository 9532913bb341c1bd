//! Configuration types shared by flurry components.

mod vars;

pub use vars::{InterpolationResult, interpolate, interpolate_with};

use serde::{Deserialize, Serialize};

/// Metrics configuration for the Prometheus endpoint.
///
/// Batch runs are short-lived, so the endpoint is opt-in: it is only served
/// when `address` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP server (e.g. "0.0.0.0:9090").
    #[serde(default)]
    pub address: Option<String>,
}
