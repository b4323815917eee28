//! CSV-file resource: both stream contracts over a file on disk.
//!
//! Values are parsed and written per the declared column types; an empty
//! field reads as null. The select side holds a `csv` reader and rebuilds
//! it on `reset`, so the resource itself is never reopened by the caller.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::error::{Result, TabflowError};
use crate::resource::{ResourceHandle, TabularResource};
use crate::schema::{ColumnType, Schema};
use crate::stream::{BatchTracker, Cursor, InsertOptions, InsertStream, SelectStream, StreamListener};
use crate::{Record, Value};

/// A tabular resource backed by one CSV file.
pub struct CsvTable {
    name: String,
    path: PathBuf,
    schema: Schema,
    has_headers: bool,
}

impl CsvTable {
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
            schema,
            has_headers: true,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn into_handle(self) -> ResourceHandle {
        Arc::new(self)
    }

    fn open_reader(&self) -> Result<csv::StringRecordsIntoIter<File>> {
        let file = File::open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))
            .map_err(|e| TabflowError::Stream {
                resource: self.name.clone(),
                source: e,
            })?;
        let reader = csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .from_reader(file);
        Ok(reader.into_records())
    }
}

impl TabularResource for CsvTable {
    fn logical_name(&self) -> &str {
        &self.name
    }

    fn connection(&self) -> &str {
        "fs"
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn open_select(&self) -> Result<Box<dyn SelectStream>> {
        Ok(Box::new(CsvSelectStream {
            name: self.name.clone(),
            path: self.path.clone(),
            schema: self.schema.clone(),
            has_headers: self.has_headers,
            records: self.open_reader()?,
            cursor: Cursor::new(),
            current: None,
        }))
    }

    fn open_insert(&self, options: InsertOptions) -> Result<Box<dyn InsertStream>> {
        let is_new = !self.path.exists()
            || self
                .path
                .metadata()
                .map(|m| m.len() == 0)
                .unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open for append {}", self.path.display()))
            .map_err(|e| TabflowError::Stream {
                resource: self.name.clone(),
                source: e,
            })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new && self.has_headers {
            let header: Vec<&str> = self.schema.columns.iter().map(|c| c.name.as_str()).collect();
            writer.write_record(&header).map_err(|e| TabflowError::Stream {
                resource: self.name.clone(),
                source: e.into(),
            })?;
        }
        Ok(Box::new(CsvInsertStream {
            name: self.name.clone(),
            schema: self.schema.clone(),
            writer,
            tracker: BatchTracker::new(self.name.clone(), &options),
            closed: false,
        }))
    }

    fn row_count(&self) -> Result<u64> {
        if !self.path.exists() {
            return Ok(0);
        }
        let mut count = 0u64;
        let mut records = self.open_reader()?;
        while let Some(record) = records.next() {
            record.map_err(|e| TabflowError::Stream {
                resource: self.name.clone(),
                source: e.into(),
            })?;
            count += 1;
        }
        Ok(count)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn parse_field(name: &str, column: &crate::schema::Column, raw: &str) -> Result<Value> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    let mismatch = || TabflowError::SchemaMismatch {
        resource: name.to_string(),
        column: column.name.clone(),
        expected: column.column_type.to_string(),
        value: raw.to_string(),
    };
    match column.column_type {
        ColumnType::Boolean => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| mismatch()),
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| mismatch()),
        ColumnType::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(mismatch),
        ColumnType::Text => Ok(Value::String(raw.to_string())),
    }
}

fn format_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

struct CsvSelectStream {
    name: String,
    path: PathBuf,
    schema: Schema,
    has_headers: bool,
    records: csv::StringRecordsIntoIter<File>,
    cursor: Cursor,
    current: Option<Record>,
}

impl SelectStream for CsvSelectStream {
    fn advance(&mut self) -> Result<bool> {
        if self.cursor.is_exhausted() {
            return Ok(false);
        }
        match self.records.next() {
            Some(record) => {
                let record = record.map_err(|e| TabflowError::Stream {
                    resource: self.name.clone(),
                    source: e.into(),
                })?;
                let mut parsed = Vec::with_capacity(self.schema.column_count());
                for (position, column) in self.schema.columns.iter().enumerate() {
                    let raw = record.get(position).unwrap_or("");
                    parsed.push(parse_field(&self.name, column, raw)?);
                }
                self.current = Some(parsed);
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
            TabflowError::stream(
                &self.name,
                format!("the column position ({position}) does not exist"),
            )
        })
    }

    fn reset(&mut self) -> Result<()> {
        let file = File::open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))
            .map_err(|e| TabflowError::Stream {
                resource: self.name.clone(),
                source: e,
            })?;
        self.records = csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .from_reader(file)
            .into_records();
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

struct CsvInsertStream {
    name: String,
    schema: Schema,
    writer: csv::Writer<File>,
    tracker: BatchTracker,
    closed: bool,
}

impl InsertStream for CsvInsertStream {
    fn insert(&mut self, record: Record) -> Result<()> {
        self.schema.check_record(&self.name, &record)?;
        let fields: Vec<String> = record.iter().map(format_field).collect();
        self.writer
            .write_record(&fields)
            .map_err(|e| TabflowError::Stream {
                resource: self.name.clone(),
                source: e.into(),
            })?;
        self.tracker.record_insert();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| TabflowError::Stream {
            resource: self.name.clone(),
            source: e.into(),
        })
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.flush()?;
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
