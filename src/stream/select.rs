//! The pull-based read contract.

use std::time::Duration;

use crate::error::{Result, TabflowError};
use crate::schema::Schema;
use crate::Value;

/// A single-pass, restartable cursor over a resource's records.
///
/// The cursor starts "before first"; each successful [`advance`] delivers
/// one record. Past exhaustion, `advance` keeps returning false. [`reset`]
/// returns the cursor to "before first" without reopening the resource.
pub trait SelectStream: Send {
    /// Move to the next record. False once exhausted, and false on every
    /// call after that.
    fn advance(&mut self) -> Result<bool>;

    /// Timed variant for queue-shaped resources: block up to `timeout`
    /// waiting for a producer, returning false when nothing arrived.
    ///
    /// Resources without a blocking producer side don't implement it.
    fn advance_timeout(&mut self, _timeout: Duration) -> Result<bool> {
        Err(TabflowError::unsupported(
            self.schema_name(),
            "a timed advance",
        ))
    }

    /// The value at the 0-based column `position` of the current record.
    /// An error before the first successful advance.
    fn value(&self, position: usize) -> Result<Value>;

    /// The value of the named column of the current record.
    fn value_by_name(&self, name: &str) -> Result<Value> {
        let position = self.schema().position_of(name).ok_or_else(|| {
            TabflowError::stream(
                self.schema_name(),
                format!("the column ({name}) is unknown"),
            )
        })?;
        self.value(position)
    }

    /// Return the cursor to "before first".
    fn reset(&mut self) -> Result<()>;

    /// 1-based count of records delivered so far; 0 before the first
    /// advance.
    fn position(&self) -> u64;

    /// True once the terminal state is reached: no more records exist and
    /// every further advance stays false.
    fn is_exhausted(&self) -> bool;

    /// Release any underlying handle. Idempotent.
    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// The schema of the records this stream yields.
    fn schema(&self) -> &Schema;

    /// The resource name used in errors and progress lines.
    fn schema_name(&self) -> String;

    /// The full current record, every column position in order.
    fn record(&self) -> Result<Vec<Value>> {
        (0..self.schema().column_count())
            .map(|position| self.value(position))
            .collect()
    }
}

/// Shared pull-side state: before-first position, delivered count, closed
/// flag. Implementations embed one and keep it honest.
#[derive(Debug, Default)]
pub struct Cursor {
    delivered: u64,
    exhausted: bool,
    closed: bool,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful advance.
    pub fn step(&mut self) {
        self.delivered += 1;
    }

    /// Record exhaustion; further advances stay false.
    pub fn finish(&mut self) {
        self.exhausted = true;
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// True after at least one successful advance and before exhaustion
    /// rewinds anything.
    pub fn on_record(&self) -> bool {
        self.delivered > 0 && !self.exhausted
    }

    pub fn position(&self) -> u64 {
        self.delivered
    }

    /// Back to "before first".
    pub fn reset(&mut self) {
        self.delivered = 0;
        self.exhausted = false;
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Guard for value reads: error when no record is current.
    pub fn require_record(&self, resource: &str) -> Result<()> {
        if self.delivered == 0 {
            return Err(TabflowError::stream(
                resource,
                "the cursor is before the first record; call advance first",
            ));
        }
        if self.exhausted {
            return Err(TabflowError::stream(
                resource,
                "the cursor is past the last record",
            ));
        }
        Ok(())
    }
}
