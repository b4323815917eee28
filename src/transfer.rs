//! The transfer orchestrator: drives one select stream into one insert
//! stream.
//!
//! A transfer is synchronous and single-threaded by default. In decoupled
//! mode a dedicated producer thread feeds a queue-shaped intermediate
//! resource so a slow, latency-bound source does not block the consumer
//! (or the reverse); records keep their order end-to-end through the FIFO.
//!
//! There is no row-level retry or skip: the first error during a read or a
//! write is recorded on the listener and aborts the whole transfer. There
//! is no cancellation primitive either — a running transfer completes or
//! raises, and killing the executing thread leaves a partially written
//! target with no rollback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TabflowError};
use crate::queue::QueueTable;
use crate::resource::{ResourceHandle, TabularResource};
use crate::stream::{InsertOptions, InsertStream, SelectStream, StreamListener};

/// Knobs for one transfer.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Rows per insert batch.
    pub batch_size: usize,
    /// One progress line every this many batches.
    pub feedback_frequency: u64,
    /// Capacity of the intermediate queue in decoupled mode.
    pub queue_capacity: usize,
    /// Consumer poll interval on the queue's timed advance.
    pub poll_timeout: Duration,
    /// Overrides the producer tag on the target's insert stream; the
    /// source's logical name otherwise.
    pub producer_name: Option<String>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            feedback_frequency: 10,
            queue_capacity: 1000,
            poll_timeout: Duration::from_millis(50),
            producer_name: None,
        }
    }
}

/// Outcome of one completed transfer.
#[derive(Debug)]
pub struct TransferReport {
    pub source: String,
    pub target: String,
    pub rows: u64,
    pub batches: u64,
    /// The target stream's listener, finalized at close.
    pub listener: StreamListener,
}

/// One source-to-target record movement.
pub struct Transfer {
    source: ResourceHandle,
    target: ResourceHandle,
    options: TransferOptions,
}

impl Transfer {
    pub fn new(source: ResourceHandle, target: ResourceHandle) -> Self {
        Self {
            source,
            target,
            options: TransferOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    fn insert_options(&self) -> InsertOptions {
        let producer = self
            .options
            .producer_name
            .clone()
            .unwrap_or_else(|| self.source.logical_name().to_string());
        InsertOptions::default()
            .with_batch_size(self.options.batch_size)
            .with_feedback_frequency(self.options.feedback_frequency)
            .with_producer(producer)
    }

    /// Run the transfer on the calling thread.
    pub fn run(&self) -> Result<TransferReport> {
        let mut insert = self.target.open_insert(self.insert_options())?;
        let listener = insert.listener();
        let mut select = self.source.open_select()?;

        if let Err(error) = drive(select.as_mut(), insert.as_mut()) {
            listener.record_error(error.to_string());
            return Err(error);
        }

        // Closing flushes and logs the final partial batch.
        insert.close()?;
        select.close()?;
        Ok(self.report(listener))
    }

    /// Run the transfer with the source decoupled onto a background thread.
    ///
    /// The producer moves source records into a bounded queue shaped like
    /// the source; the calling thread drains the queue into the target with
    /// timed advances, then one final blocking drain once the producer has
    /// finished.
    pub fn run_decoupled(&self) -> Result<TransferReport> {
        let buffer_name = format!("{}-buffer", self.source.logical_name());
        let queue: ResourceHandle = Arc::new(QueueTable::new(
            buffer_name,
            self.source.schema(),
            self.options.queue_capacity,
        ));

        let producer_done = Arc::new(AtomicBool::new(false));
        let producer = {
            let source = Arc::clone(&self.source);
            let queue = Arc::clone(&queue);
            let done = Arc::clone(&producer_done);
            let mut options = self.options.clone();
            options.producer_name = Some(source.logical_name().to_string());
            thread::Builder::new()
                .name(format!("tabflow-producer-{}", source.logical_name()))
                .spawn(move || {
                    let result = Transfer::new(source, queue).with_options(options).run();
                    done.store(true, Ordering::Release);
                    result
                })
                .map_err(|e| TabflowError::stream(self.source.logical_name(), e))?
        };

        let mut insert = self.target.open_insert(self.insert_options())?;
        let listener = insert.listener();
        let mut select = queue.open_select()?;

        let consumed = self.consume(select.as_mut(), insert.as_mut(), &producer_done);
        if let Err(error) = &consumed {
            listener.record_error(error.to_string());
        }

        // Dropping the receiver on a consumer failure unblocks a producer
        // stuck on a full queue; it errors out and the join below returns.
        if consumed.is_err() {
            drop(select);
        }
        let produced = producer
            .join()
            .unwrap_or_else(|_| Err(TabflowError::stream(self.source.logical_name(), "the producer thread panicked")));

        consumed?;
        if let Err(error) = produced {
            listener.record_error(error.to_string());
            return Err(error);
        }

        insert.close()?;
        Ok(self.report(listener))
    }

    fn consume(
        &self,
        select: &mut dyn SelectStream,
        insert: &mut dyn InsertStream,
        producer_done: &AtomicBool,
    ) -> Result<()> {
        loop {
            if select.advance_timeout(self.options.poll_timeout)? {
                insert.insert(select.record()?)?;
            } else if producer_done.load(Ordering::Acquire) {
                // The producer closed its end; a blocking drain is now
                // terminal once the buffer empties.
                while select.advance()? {
                    insert.insert(select.record()?)?;
                }
                break;
            } else if select.is_exhausted() {
                // The producer vanished without flagging completion; the
                // drained queue is terminal all the same.
                break;
            }
        }
        select.close()?;
        Ok(())
    }

    fn report(&self, listener: StreamListener) -> TransferReport {
        let report = TransferReport {
            source: self.source.logical_name().to_string(),
            target: self.target.logical_name().to_string(),
            rows: listener.row_count(),
            batches: listener.batch_count(),
            listener,
        };
        debug!(
            "transfer of ({}) into ({}) complete: {} rows in {} batches",
            report.source, report.target, report.rows, report.batches
        );
        report
    }
}

/// The core loop: every column position of every record, in order.
///
/// The column range is spelled out over the full schema width on purpose —
/// the record handed to the insert side must carry all columns, not a
/// single one.
fn drive(select: &mut dyn SelectStream, insert: &mut dyn InsertStream) -> Result<()> {
    let column_count = select.schema().column_count();
    while select.advance()? {
        let mut record = Vec::with_capacity(column_count);
        for position in 0..column_count {
            record.push(select.value(position)?);
        }
        insert.insert(record)?;
    }
    Ok(())
}
