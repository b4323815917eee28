//! In-memory table resource.
//!
//! The reference implementation of both stream contracts, and the backing
//! store for generated data in tests and table loads. Rows live in a shared
//! `RwLock<Vec<Record>>`; a select stream iterates by index against the live
//! store, so `reset` is a plain cursor rewind with no reopening involved.

use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::resource::{ResourceHandle, TabularResource};
use crate::schema::Schema;
use crate::stream::{BatchTracker, Cursor, InsertOptions, InsertStream, SelectStream, StreamListener};
use crate::{Record, Value};

/// A named, schema-checked, in-memory table.
pub struct MemoryTable {
    name: String,
    connection: String,
    schema: Schema,
    rows: Arc<RwLock<Vec<Record>>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            connection: "memory".to_string(),
            schema,
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Place the table in a named connection. Tables in different
    /// connections cannot be filled together.
    #[must_use]
    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    /// Seed the table with rows, schema-checked.
    pub fn with_rows(self, rows: Vec<Record>) -> Result<Self> {
        for row in &rows {
            self.schema.check_record(&self.name, row)?;
        }
        *self.rows.write().unwrap() = rows;
        Ok(self)
    }

    /// Wrap into the shared handle the engine works with.
    pub fn into_handle(self) -> ResourceHandle {
        Arc::new(self)
    }

    /// Drop all rows.
    pub fn truncate(&self) {
        self.rows.write().unwrap().clear();
    }

    /// A copy of the current rows.
    pub fn rows(&self) -> Vec<Record> {
        self.rows.read().unwrap().clone()
    }
}

impl TabularResource for MemoryTable {
    fn logical_name(&self) -> &str {
        &self.name
    }

    fn connection(&self) -> &str {
        &self.connection
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn open_select(&self) -> Result<Box<dyn SelectStream>> {
        Ok(Box::new(MemorySelectStream {
            name: self.name.clone(),
            schema: self.schema.clone(),
            rows: Arc::clone(&self.rows),
            cursor: Cursor::new(),
            current: None,
        }))
    }

    fn open_insert(&self, options: InsertOptions) -> Result<Box<dyn InsertStream>> {
        Ok(Box::new(MemoryInsertStream {
            name: self.name.clone(),
            schema: self.schema.clone(),
            rows: Arc::clone(&self.rows),
            tracker: BatchTracker::new(self.name.clone(), &options),
            closed: false,
        }))
    }

    fn row_count(&self) -> Result<u64> {
        Ok(self.rows.read().unwrap().len() as u64)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

struct MemorySelectStream {
    name: String,
    schema: Schema,
    rows: Arc<RwLock<Vec<Record>>>,
    cursor: Cursor,
    current: Option<Record>,
}

impl SelectStream for MemorySelectStream {
    fn advance(&mut self) -> Result<bool> {
        if self.cursor.is_exhausted() {
            return Ok(false);
        }
        let index = self.cursor.position() as usize;
        let next = self.rows.read().unwrap().get(index).cloned();
        match next {
            Some(record) => {
                self.current = Some(record);
                self.cursor.step();
                Ok(true)
            }
            None => {
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
            crate::error::TabflowError::stream(
                &self.name,
                format!("the column position ({position}) does not exist"),
            )
        })
    }

    fn reset(&mut self) -> Result<()> {
        self.cursor.reset();
        self.current = None;
        Ok(())
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

struct MemoryInsertStream {
    name: String,
    schema: Schema,
    rows: Arc<RwLock<Vec<Record>>>,
    tracker: BatchTracker,
    closed: bool,
}

impl InsertStream for MemoryInsertStream {
    fn insert(&mut self, record: Record) -> Result<()> {
        self.schema.check_record(&self.name, &record)?;
        self.rows.write().unwrap().push(record);
        self.tracker.record_insert();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // Rows land in the shared store immediately; nothing is buffered.
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.tracker.finish();
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn listener(&self) -> StreamListener {
        self.tracker.listener()
    }
}
