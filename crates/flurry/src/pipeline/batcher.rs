//! Fixed-size batching.

/// Accumulates items into batches of at most `threshold`.
///
/// The filling buffer is handed out by move when it reaches the threshold,
/// and a fresh one takes its place.
#[derive(Debug)]
pub struct Batcher<T> {
    threshold: usize,
    buffer: Vec<T>,
}

impl<T> Batcher<T> {
    /// `threshold` is clamped to at least 1.
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            threshold,
            buffer: Vec::with_capacity(threshold),
        }
    }

    /// Add an item, returning a full batch once the threshold is reached.
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.buffer.push(item);
        if self.buffer.len() >= self.threshold {
            Some(std::mem::replace(
                &mut self.buffer,
                Vec::with_capacity(self.threshold),
            ))
        } else {
            None
        }
    }

    /// The remainder, if any.
    pub fn finish(self) -> Option<Vec<T>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer)
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
