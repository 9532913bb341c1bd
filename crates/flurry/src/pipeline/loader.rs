//! Batch delivery.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use flurry_core::emit;
use flurry_core::metrics::events::{BatchLoaded, RowsLoaded};

use crate::error::LoadError;
use crate::record::PageviewRow;
use crate::sink::RowSink;

/// Delivers batches to a sink, or just counts them in dry-run mode.
#[derive(Clone)]
pub struct Loader {
    sink: Option<Arc<dyn RowSink>>,
    timeout: Duration,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.sink {
            Some(sink) => write!(f, "Loader<{}>", sink.name()),
            None => f.write_str("Loader<dry-run>"),
        }
    }
}

impl Loader {
    /// A loader that never calls the destination.
    pub fn dry_run() -> Self {
        Self {
            sink: None,
            timeout: Duration::ZERO,
        }
    }

    /// A loader writing to `sink`, each call bounded by `timeout`.
    pub fn live(sink: Arc<dyn RowSink>, timeout: Duration) -> Self {
        Self {
            sink: Some(sink),
            timeout,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.sink.is_none()
    }

    /// Deliver one batch, returning the acknowledged row count.
    pub async fn load(&self, batch: Vec<PageviewRow>) -> Result<u64, LoadError> {
        let Some(sink) = &self.sink else {
            let count = batch.len() as u64;
            emit!(RowsLoaded {
                count,
                dry_run: true,
            });
            return Ok(count);
        };

        let start = Instant::now();
        let count = tokio::time::timeout(self.timeout, sink.insert(&batch))
            .await
            .map_err(|_| LoadError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })??;
        let duration = start.elapsed();

        debug!(
            sink = sink.name(),
            rows = count,
            duration_ms = duration.as_millis() as u64,
            "Batch loaded"
        );
        emit!(BatchLoaded {
            rows: batch.len(),
            duration,
        });
        emit!(RowsLoaded {
            count,
            dry_run: false,
        });

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use std::sync::Mutex;

    fn rows(n: usize) -> Vec<PageviewRow> {
        (0..n)
            .map(|i| PageviewRow {
                project: "fr.wikipedia".into(),
                article: format!("Article_{i}"),
                views: i as u64,
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                hour: 7,
                ingested_at: Utc::now(),
            })
            .collect()
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl RowSink for RecordingSink {
        async fn insert(&self, rows: &[PageviewRow]) -> Result<u64, LoadError> {
            self.calls.lock().unwrap().push(rows.len());
            Ok(rows.len() as u64)
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct StalledSink;

    #[async_trait]
    impl RowSink for StalledSink {
        async fn insert(&self, _rows: &[PageviewRow]) -> Result<u64, LoadError> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_sink() {
        let loader = Loader::dry_run();
        assert!(loader.is_dry_run());
        assert_eq!(loader.load(rows(7)).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_live_makes_one_call_per_batch() {
        let sink = Arc::new(RecordingSink::default());
        let loader = Loader::live(sink.clone(), Duration::from_secs(5));

        assert_eq!(loader.load(rows(3)).await.unwrap(), 3);
        assert_eq!(loader.load(rows(1)).await.unwrap(), 1);
        assert_eq!(*sink.calls.lock().unwrap(), vec![3, 1]);
    }

    #[tokio::test]
    async fn test_load_timeout() {
        let loader = Loader::live(Arc::new(StalledSink), Duration::from_millis(20));
        let err = loader.load(rows(2)).await.unwrap_err();
        assert!(matches!(err, LoadError::Timeout { .. }));
        assert!(err.is_transport());
    }
}
