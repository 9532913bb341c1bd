//! Reading remote dump files.
//!
//! A file is opened through the storage provider and exposed as a lazy
//! sequence of decoded text lines.

mod decoder;

pub use decoder::{LineDecoder, LineStream};

use flurry_core::{StorageError, StorageProvider};

/// Open `filename` under the provider's base URL as a line stream.
pub async fn open_lines(
    storage: &StorageProvider,
    filename: &str,
) -> Result<LineStream, StorageError> {
    let chunks = storage.open(filename).await?;
    Ok(LineStream::new(filename, chunks))
}
