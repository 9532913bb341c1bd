//! Streaming gzip line decoder.
//!
//! Compressed chunks are pushed into a write-side gzip decoder as they arrive
//! and complete lines are pulled back out, so a file is never held in memory
//! beyond one chunk and its decompressed output.

use std::io::{self, Write};

use flate2::write::MultiGzDecoder;
use futures::StreamExt;

use flurry_core::ByteStream;

use crate::error::ReaderError;

/// Incremental gzip-to-lines decoder.
///
/// Concatenated gzip members decode as one continuous stream.
/// Invalid UTF-8 is replaced with U+FFFD. A final line without a trailing
/// newline is yielded once [`LineDecoder::finish`] has succeeded.
pub struct LineDecoder {
    inner: MultiGzDecoder<Vec<u8>>,
    /// Start of the unconsumed region of the decompressed buffer.
    pos: usize,
    finished: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            inner: MultiGzDecoder::new(Vec::new()),
            pos: 0,
            finished: false,
        }
    }

    /// Push one compressed chunk. Everything it decompresses to is
    /// available to [`LineDecoder::next_line`] on return.
    pub fn feed(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.compact();
        self.inner.write_all(chunk)?;
        self.inner.flush()
    }

    /// Signal end of input. Fails on a truncated stream or CRC mismatch.
    pub fn finish(&mut self) -> io::Result<()> {
        self.compact();
        self.inner.try_finish()?;
        self.finished = true;
        Ok(())
    }

    /// Pop the next complete line, without its `\n`.
    pub fn next_line(&mut self) -> Option<String> {
        let out = self.inner.get_ref();
        let pending = &out[self.pos..];

        if let Some(end) = pending.iter().position(|b| *b == b'\n') {
            let line = String::from_utf8_lossy(&pending[..end]).into_owned();
            self.pos += end + 1;
            return Some(line);
        }

        if self.finished && !pending.is_empty() {
            let line = String::from_utf8_lossy(pending).into_owned();
            self.pos = out.len();
            return Some(line);
        }

        None
    }

    fn compact(&mut self) {
        if self.pos > 0 {
            self.inner.get_mut().drain(..self.pos);
            self.pos = 0;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Reading,
    Draining,
    Failed,
}

/// Lazy, single-pass sequence of lines read from one remote file.
pub struct LineStream {
    path: String,
    chunks: ByteStream,
    decoder: LineDecoder,
    state: State,
}

impl LineStream {
    pub fn new(path: impl Into<String>, chunks: ByteStream) -> Self {
        Self {
            path: path.into(),
            chunks,
            decoder: LineDecoder::new(),
            state: State::Reading,
        }
    }

    /// Next decoded line, `None` at end of file.
    ///
    /// The first error ends the stream.
    pub async fn next_line(&mut self) -> Option<Result<String, ReaderError>> {
        loop {
            if self.state == State::Failed {
                return None;
            }
            if let Some(line) = self.decoder.next_line() {
                return Some(Ok(line));
            }
            if self.state == State::Draining {
                return None;
            }

            match self.chunks.next().await {
                Some(Ok(chunk)) => {
                    if let Err(source) = self.decoder.feed(&chunk) {
                        return Some(Err(self.fail_decode(source)));
                    }
                }
                Some(Err(source)) => {
                    self.state = State::Failed;
                    return Some(Err(ReaderError::Read {
                        path: self.path.clone(),
                        source,
                    }));
                }
                None => {
                    if let Err(source) = self.decoder.finish() {
                        return Some(Err(self.fail_decode(source)));
                    }
                    self.state = State::Draining;
                }
            }
        }
    }

    fn fail_decode(&mut self, source: io::Error) -> ReaderError {
        self.state = State::Failed;
        ReaderError::Decode {
            path: self.path.clone(),
            source,
        }
    }
}
