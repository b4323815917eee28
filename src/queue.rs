//! Queue-shaped intermediate resource.
//!
//! A bounded FIFO that decouples one producer from one consumer while
//! preserving record order end-to-end. The insert side is the sending half
//! of a `std::sync::mpsc::sync_channel`; the select side is the receiving
//! half. Closing the insert stream drops the sender, which the select side
//! observes as exhaustion once the buffer is drained.
//!
//! Each half can be opened exactly once. A queue cannot be rewound:
//! `reset` is an explicit unsupported operation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Result, TabflowError};
use crate::resource::{ResourceHandle, TabularResource};
use crate::schema::Schema;
use crate::stream::{BatchTracker, Cursor, InsertOptions, InsertStream, SelectStream, StreamListener};
use crate::{Record, Value};

/// A bounded, single-producer single-consumer queue resource.
pub struct QueueTable {
    name: String,
    schema: Schema,
    sender: Mutex<Option<SyncSender<Record>>>,
    receiver: Mutex<Option<Receiver<Record>>>,
    buffered: Arc<AtomicU64>,
}

impl QueueTable {
    /// A queue shaped like `schema`, holding at most `capacity` records.
    pub fn new(name: impl Into<String>, schema: Schema, capacity: usize) -> Self {
        let (sender, receiver) = sync_channel(capacity.max(1));
        Self {
            name: name.into(),
            schema,
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            buffered: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn into_handle(self) -> ResourceHandle {
        Arc::new(self)
    }
}

impl TabularResource for QueueTable {
    fn logical_name(&self) -> &str {
        &self.name
    }

    fn connection(&self) -> &str {
        "memory"
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn open_select(&self) -> Result<Box<dyn SelectStream>> {
        let receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| TabflowError::unsupported(&self.name, "a second select stream"))?;
        Ok(Box::new(QueueSelectStream {
            name: self.name.clone(),
            schema: self.schema.clone(),
            receiver,
            buffered: Arc::clone(&self.buffered),
            cursor: Cursor::new(),
            current: None,
        }))
    }

    fn open_insert(&self, options: InsertOptions) -> Result<Box<dyn InsertStream>> {
        let sender = self
            .sender
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| TabflowError::unsupported(&self.name, "a second insert stream"))?;
        Ok(Box::new(QueueInsertStream {
            name: self.name.clone(),
            schema: self.schema.clone(),
            sender: Some(sender),
            buffered: Arc::clone(&self.buffered),
            tracker: BatchTracker::new(self.name.clone(), &options),
        }))
    }

    /// Records currently buffered, not a total.
    fn row_count(&self) -> Result<u64> {
        Ok(self.buffered.load(Ordering::Acquire))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

struct QueueSelectStream {
    name: String,
    schema: Schema,
    receiver: Receiver<Record>,
    buffered: Arc<AtomicU64>,
    cursor: Cursor,
    current: Option<Record>,
}

impl QueueSelectStream {
    fn deliver(&mut self, record: Record) -> bool {
        self.buffered.fetch_sub(1, Ordering::AcqRel);
        self.current = Some(record);
        self.cursor.step();
        true
    }
}

impl SelectStream for QueueSelectStream {
    fn advance(&mut self) -> Result<bool> {
        if self.cursor.is_exhausted() {
            return Ok(false);
        }
        match self.receiver.recv() {
            Ok(record) => Ok(self.deliver(record)),
            // Every producer is gone and the buffer is drained.
            Err(_) => {
                self.current = None;
                self.cursor.finish();
                Ok(false)
            }
        }
    }

    fn advance_timeout(&mut self, timeout: Duration) -> Result<bool> {
        if self.cursor.is_exhausted() {
            return Ok(false);
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(record) => Ok(self.deliver(record)),
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => {
                self.current = None;
                self.cursor.finish();
                Ok(false)
            }
        }
    }

    fn value(&self, position: usize) -> Result<Value> {
        self.cursor.require_record(&self.name)?;
        let record = self.current.as_ref().expect("cursor is on a record");
        record.get(position).cloned().ok_or_else(|| {
            TabflowError::stream(
                &self.name,
                format!("the column position ({position}) does not exist"),
            )
        })
    }

    fn reset(&mut self) -> Result<()> {
        Err(TabflowError::unsupported(&self.name, "reset on a queue"))
    }

    fn position(&self) -> u64 {
        self.cursor.position()
    }

    fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }

    fn close(&mut self) -> Result<()> {
        self.cursor.close();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.cursor.is_closed()
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn schema_name(&self) -> String {
        self.name.clone()
    }
}

struct QueueInsertStream {
    name: String,
    schema: Schema,
    sender: Option<SyncSender<Record>>,
    buffered: Arc<AtomicU64>,
    tracker: BatchTracker,
}

impl InsertStream for QueueInsertStream {
    fn insert(&mut self, record: Record) -> Result<()> {
        self.schema.check_record(&self.name, &record)?;
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| TabflowError::stream(&self.name, "the queue insert stream is closed"))?;
        // Counted before the send so the consumer's decrement can never
        // observe the record ahead of the increment.
        self.buffered.fetch_add(1, Ordering::AcqRel);
        // Blocks while the queue is at capacity; fails when the consumer is
        // gone.
        if sender.send(record).is_err() {
            self.buffered.fetch_sub(1, Ordering::AcqRel);
            return Err(TabflowError::stream(
                &self.name,
                "the queue consumer is gone; the record was dropped",
            ));
        }
        self.tracker.record_insert();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // Records are handed to the channel on insert; nothing to push.
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.sender.is_none() {
            return Ok(());
        }
        // Dropping the sender is the end-of-stream signal to the consumer.
        self.sender = None;
        self.tracker.finish();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    fn listener(&self) -> StreamListener {
        self.tracker.listener()
    }
}
