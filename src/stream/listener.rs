//! Per-stream progress accumulator.
//!
//! One listener per stream instance, one writer. Readers may hold a clone
//! and query it at any time; the handle is an `Arc` around the shared state,
//! so totals observed through any clone are the same.

use std::sync::{Arc, Mutex};

/// Cloneable accumulator of lifetime row/batch totals for one stream.
///
/// The invariant the insert side maintains: after the stream is closed, the
/// row total equals exactly the number of successful insert calls, whatever
/// the batch size and whether or not the last batch was partial.
#[derive(Clone, Default, Debug)]
pub struct StreamListener {
    inner: Arc<Mutex<ListenerInner>>,
}

#[derive(Default, Debug)]
struct ListenerInner {
    rows: u64,
    batches: u64,
    last_progress: Option<String>,
    error: Option<String>,
    finalized: bool,
}

impl StreamListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a completed batch's rows and bump the batch count.
    pub fn add_batch(&self, rows: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.rows += rows;
        inner.batches += 1;
    }

    /// Record the latest emitted progress line.
    pub fn set_last_progress(&self, line: String) {
        self.inner.lock().unwrap().last_progress = Some(line);
    }

    /// Record a failure observed on the stream. The first error wins.
    pub fn record_error(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.error.is_none() {
            inner.error = Some(message.into());
        }
    }

    /// Mark the stream closed; totals are final from here on.
    pub fn finalize(&self) {
        self.inner.lock().unwrap().finalized = true;
    }

    pub fn row_count(&self) -> u64 {
        self.inner.lock().unwrap().rows
    }

    pub fn batch_count(&self) -> u64 {
        self.inner.lock().unwrap().batches
    }

    pub fn last_progress(&self) -> Option<String> {
        self.inner.lock().unwrap().last_progress.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().unwrap().error.clone()
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.lock().unwrap().finalized
    }
}
