//! The batched push-based write contract.

use tracing::info;

use crate::error::Result;
use crate::stream::listener::StreamListener;
use crate::Record;

/// Options applied when opening an insert stream.
#[derive(Debug, Clone)]
pub struct InsertOptions {
    /// Rows per batch before bookkeeping runs.
    pub batch_size: usize,
    /// Emit one progress line every this many batches.
    pub feedback_frequency: u64,
    /// Human-readable name of the producer feeding this stream, used in
    /// progress lines.
    pub producer: Option<String>,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            feedback_frequency: 10,
            producer: None,
        }
    }
}

impl InsertOptions {
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_feedback_frequency(mut self, every_n_batches: u64) -> Self {
        self.feedback_frequency = every_n_batches.max(1);
        self
    }

    #[must_use]
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }
}

/// A batched write stream into one resource.
pub trait InsertStream: Send {
    /// Append one record. Batch bookkeeping runs when the per-batch counter
    /// reaches the configured batch size.
    fn insert(&mut self, record: Record) -> Result<()>;

    /// Force propagation of buffered writes without ending the stream.
    ///
    /// Distinct from [`close`](Self::close): resources with parent/child
    /// write ordering use this to push buffered rows through, then keep
    /// inserting.
    fn flush(&mut self) -> Result<()>;

    /// End the stream: one final bookkeeping pass so an under-threshold
    /// partial batch is still counted and, subject to the feedback rule,
    /// reported.
    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// The listener accumulating this stream's totals.
    fn listener(&self) -> StreamListener;
}

impl std::fmt::Debug for dyn InsertStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsertStream")
            .field("is_closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Shared push-side bookkeeping: the per-batch row counter, the batch
/// counters on the listener, and the feedback-frequency progress line.
///
/// Implementations call [`record_insert`](Self::record_insert) after each
/// successful append and [`finish`](Self::finish) from `close`.
pub struct BatchTracker {
    resource: String,
    producer: Option<String>,
    batch_size: usize,
    feedback_frequency: u64,
    rows_in_batch: u64,
    listener: StreamListener,
}

impl BatchTracker {
    pub fn new(resource: impl Into<String>, options: &InsertOptions) -> Self {
        Self {
            resource: resource.into(),
            producer: options.producer.clone(),
            batch_size: options.batch_size.max(1),
            feedback_frequency: options.feedback_frequency.max(1),
            rows_in_batch: 0,
            listener: StreamListener::new(),
        }
    }

    pub fn listener(&self) -> StreamListener {
        self.listener.clone()
    }

    /// Count one inserted row; roll the batch when it is full.
    pub fn record_insert(&mut self) {
        self.rows_in_batch += 1;
        if self.rows_in_batch >= self.batch_size as u64 {
            self.roll_batch();
        }
    }

    /// Final bookkeeping pass: a partial batch still counts.
    pub fn finish(&mut self) {
        if self.rows_in_batch > 0 {
            self.roll_batch();
        }
        self.listener.finalize();
    }

    fn roll_batch(&mut self) {
        self.listener.add_batch(self.rows_in_batch);
        self.rows_in_batch = 0;
        if self.listener.batch_count() % self.feedback_frequency == 0 {
            let line = match &self.producer {
                Some(producer) => format!(
                    "{} rows loaded into ({}) from ({producer})",
                    self.listener.row_count(),
                    self.resource
                ),
                None => format!(
                    "{} rows loaded into ({})",
                    self.listener.row_count(),
                    self.resource
                ),
            };
            info!("{line}");
            self.listener.set_last_progress(line);
        }
    }
}
