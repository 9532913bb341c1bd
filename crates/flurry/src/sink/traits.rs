//! Destination abstraction.

use async_trait::async_trait;

use crate::error::LoadError;
use crate::record::PageviewRow;

/// An append-only table that accepts batches of rows.
///
/// One call per batch. Implementations do not retry or split batches; the
/// whole batch either lands or the call fails.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Append `rows`, returning the number acknowledged.
    async fn insert(&self, rows: &[PageviewRow]) -> Result<u64, LoadError>;

    /// Human-readable destination name, for logging.
    fn name(&self) -> &str;
}
