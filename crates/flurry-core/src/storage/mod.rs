//! Remote object access.
//!
//! Provides a unified, streaming read interface over HTTP(S) prefixes and
//! local directories, built on `object_store`.

mod url_parser;

pub use url_parser::{BackendConfig, HttpConfig, LocalConfig};

use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use object_store::http::HttpBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{ClientOptions, ObjectStore};
use snafu::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::emit;
use crate::error::{
    HttpConfigSnafu, ObjectStoreSnafu, OpenTimeoutSnafu, ReadTimeoutSnafu, StorageError,
};
use crate::metrics::events::BytesRead;

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// A stream of compressed chunks read from one object.
pub type ByteStream = BoxStream<'static, Result<Bytes, StorageError>>;

/// Timeouts bounding every storage suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageOptions {
    /// Bound on establishing the request and receiving response headers.
    pub open_timeout: Duration,
    /// Bound on waiting for any single chunk of the body.
    pub read_timeout: Duration,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(60),
        }
    }
}

/// Storage provider that abstracts over HTTP(S) and the local filesystem.
#[derive(Clone)]
pub struct StorageProvider {
    config: BackendConfig,
    object_store: Arc<dyn ObjectStore>,
    options: StorageOptions,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.config.canonical_url())
    }
}

impl StorageProvider {
    /// Create a storage provider for the given base URL.
    pub fn for_url(url: &str, options: StorageOptions) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url)?;

        let object_store: Arc<dyn ObjectStore> = match &config {
            BackendConfig::Http(http) => {
                // The request-wide timeout would also cap body streaming, so it is
                // disabled and replaced by the per-chunk read timeout.
                let client_options = ClientOptions::new()
                    .with_allow_http(true)
                    .with_timeout_disabled()
                    .with_connect_timeout(options.open_timeout);
                Arc::new(
                    HttpBuilder::new()
                        .with_url(http.url.as_str())
                        .with_client_options(client_options)
                        .build()
                        .context(HttpConfigSnafu)?,
                )
            }
            BackendConfig::Local(local) => Arc::new(
                LocalFileSystem::new_with_prefix(&local.path).context(ObjectStoreSnafu)?,
            ),
        };

        Ok(Self {
            config,
            object_store,
            options,
        })
    }

    /// Canonical base URL, for logging.
    pub fn canonical_url(&self) -> String {
        self.config.canonical_url()
    }

    /// Open `name` (relative to the base URL) as a stream of raw chunks.
    ///
    /// Opening is bounded by the open timeout; each subsequent chunk by the
    /// read timeout. The returned stream ends after its first error.
    pub async fn open(&self, name: &str) -> Result<ByteStream, StorageError> {
        let path = Path::from(name);
        let open_timeout = self.options.open_timeout;

        let result = tokio::time::timeout(open_timeout, self.object_store.get(&path))
            .await
            .map_err(|_| {
                OpenTimeoutSnafu {
                    path: name.to_string(),
                    timeout_secs: open_timeout.as_secs(),
                }
                .build()
            })?
            .context(ObjectStoreSnafu)?;

        debug!(path = %name, size = result.meta.size, "Opened object");

        let chunks = result.into_stream().map_err(|source| StorageError::ObjectStore { source });
        Ok(with_read_timeout(chunks.boxed(), name, self.options.read_timeout))
    }
}

/// Bound every chunk read by `timeout`, ending the stream after the first error.
fn with_read_timeout(inner: ByteStream, name: &str, timeout: Duration) -> ByteStream {
    let name: Arc<str> = Arc::from(name);

    stream::unfold(Some(inner), move |state| {
        let name = Arc::clone(&name);
        async move {
            let mut inner = state?;
            match tokio::time::timeout(timeout, inner.next()).await {
                Ok(Some(Ok(chunk))) => {
                    emit!(BytesRead {
                        bytes: chunk.len() as u64,
                    });
                    Some((Ok(chunk), Some(inner)))
                }
                Ok(Some(Err(e))) => Some((Err(e), None)),
                Ok(None) => None,
                Err(_) => {
                    let err = ReadTimeoutSnafu {
                        path: name.to_string(),
                        timeout_secs: timeout.as_secs(),
                    }
                    .build();
                    Some((Err(err), None))
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn collect(stream: ByteStream) -> Vec<Result<Bytes, StorageError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_open_local_file_streams_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("a.gz")).unwrap();
        file.write_all(b"hello world").unwrap();

        let provider =
            StorageProvider::for_url(dir.path().to_str().unwrap(), StorageOptions::default())
                .unwrap();
        let chunks = collect(provider.open("a.gz").await.unwrap()).await;

        let bytes: Vec<u8> = chunks
            .into_iter()
            .flat_map(|c| c.unwrap().to_vec())
            .collect();
        assert_eq!(bytes, b"hello world");
    }

    #[tokio::test]
    async fn test_open_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider =
            StorageProvider::for_url(dir.path().to_str().unwrap(), StorageOptions::default())
                .unwrap();

        let Err(err) = provider.open("missing.gz").await else {
            panic!("expected missing.gz to fail to open");
        };
        assert!(err.is_not_found(), "unexpected error: {err}");
    }

    #[test]
    fn test_rejects_unsupported_url() {
        let result = StorageProvider::for_url("s3://bucket/x", StorageOptions::default());
        assert!(matches!(result, Err(StorageError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_read_timeout_ends_stream() {
        let stalled: ByteStream = stream::pending().boxed();
        let mut stream = with_read_timeout(stalled, "slow.gz", Duration::from_millis(20));

        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(StorageError::ReadTimeout { .. })));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let failing: ByteStream = stream::iter(vec![
            Ok(Bytes::from_static(b"a")),
            Err(StorageError::Io {
                source: std::io::Error::other("reset"),
            }),
            Ok(Bytes::from_static(b"never")),
        ])
        .boxed();

        let chunks = collect(with_read_timeout(failing, "x", Duration::from_secs(1))).await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].is_err());
    }
}
