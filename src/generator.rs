//! Generator resources: tables that manufacture synthetic records on demand
//! instead of reading persisted data.
//!
//! A generator is a full [`TabularResource`]: it has a logical name and a
//! schema, and its select stream yields up to a configured number of
//! records. The values come from per-column [`ColumnGenerator`]s, which are
//! deterministic functions of the record index so that a reset replays the
//! same data. Writing into a generator is an unsupported operation.

use std::sync::Arc;

use crate::error::{Result, TabflowError};
use crate::resource::{ResourceHandle, TabularResource};
use crate::schema::{Column, ColumnType, Schema};
use crate::stream::{Cursor, InsertOptions, InsertStream, SelectStream};
use crate::{Record, Value};

/// Fallback record cap when neither the generator nor the scheduler set one.
pub const DEFAULT_RECORD_COUNT: u64 = 10;

/// A deterministic per-column value source, indexed by record number.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnGenerator {
    /// `start`, `start + step`, `start + 2*step`, ...
    Sequence { start: i64, step: i64 },
    /// A scattered but reproducible pick from `min..=max`. Used for
    /// foreign-key columns, whose domain is the parent key sequence.
    Uniform { min: i64, max: i64 },
    /// The given values, repeated in order.
    Cycle(Vec<Value>),
    /// The same value for every record.
    Constant(Value),
    /// `prefix` followed by the 1-based record number.
    Pattern { prefix: String },
}

impl ColumnGenerator {
    /// The default generator for a column of the given type: a key sequence
    /// for integers, a numbered label for text.
    pub fn default_for(column: &Column) -> Self {
        match column.column_type {
            ColumnType::Integer => ColumnGenerator::Sequence { start: 1, step: 1 },
            ColumnType::Float => ColumnGenerator::Sequence { start: 1, step: 1 },
            ColumnType::Boolean => {
                ColumnGenerator::Cycle(vec![Value::Bool(true), Value::Bool(false)])
            }
            ColumnType::Text => ColumnGenerator::Pattern {
                prefix: format!("{}-", column.name),
            },
        }
    }

    /// The value for the 0-based record `index`, shaped for `column_type`.
    pub fn value_at(&self, index: u64, column_type: ColumnType) -> Value {
        match self {
            ColumnGenerator::Sequence { start, step } => {
                let n = start + step * index as i64;
                numeric(n, column_type)
            }
            ColumnGenerator::Uniform { min, max } => {
                let span = (max - min).unsigned_abs() + 1;
                // Fibonacci hashing scatters the index over the domain while
                // staying reproducible across resets.
                let scattered = index.wrapping_mul(0x9E37_79B9_7F4A_7C15) % span;
                numeric((*min).min(*max) + scattered as i64, column_type)
            }
            ColumnGenerator::Cycle(values) => {
                if values.is_empty() {
                    Value::Null
                } else {
                    values[(index % values.len() as u64) as usize].clone()
                }
            }
            ColumnGenerator::Constant(value) => value.clone(),
            ColumnGenerator::Pattern { prefix } => Value::String(format!("{prefix}{}", index + 1)),
        }
    }
}

fn numeric(n: i64, column_type: ColumnType) -> Value {
    match column_type {
        ColumnType::Float => {
            Value::Number(serde_json::Number::from_f64(n as f64).unwrap_or_else(|| 0.into()))
        }
        _ => Value::Number(n.into()),
    }
}

/// A synthetic-record resource bound to a schema.
#[derive(Clone)]
pub struct GeneratorResource {
    name: String,
    schema: Schema,
    generators: Vec<ColumnGenerator>,
    max_record_count: Option<u64>,
}

impl GeneratorResource {
    /// A generator bound to `schema` with default per-type column
    /// generators. This is the "dummy" generator the fill planner
    /// synthesizes for a target that has columns but no matching generator.
    pub fn from_schema(name: impl Into<String>, schema: Schema, max_record_count: Option<u64>) -> Self {
        let generators = schema.columns.iter().map(ColumnGenerator::default_for).collect();
        Self {
            name: name.into(),
            schema,
            generators,
            max_record_count,
        }
    }

    /// Replace the generator of the named column.
    pub fn with_generator(
        mut self,
        column: &str,
        generator: ColumnGenerator,
    ) -> Result<Self> {
        let position = self.schema.position_of(column).ok_or_else(|| {
            TabflowError::stream(&self.name, format!("the column ({column}) is unknown"))
        })?;
        self.generators[position] = generator;
        Ok(self)
    }

    /// The explicit record cap, when one was set.
    pub fn max_record_count(&self) -> Option<u64> {
        self.max_record_count
    }

    #[must_use]
    pub fn with_max_record_count(mut self, cap: u64) -> Self {
        self.max_record_count = Some(cap);
        self
    }

    /// This generator, capped at `default` when it has no explicit cap.
    #[must_use]
    pub fn capped_or(&self, default: u64) -> Self {
        let mut capped = self.clone();
        if capped.max_record_count.is_none() {
            capped.max_record_count = Some(default);
        }
        capped
    }

    pub fn into_handle(self) -> ResourceHandle {
        Arc::new(self)
    }

    fn cap(&self) -> u64 {
        self.max_record_count.unwrap_or(DEFAULT_RECORD_COUNT)
    }

    fn record_at(&self, index: u64) -> Record {
        self.schema
            .columns
            .iter()
            .zip(&self.generators)
            .map(|(column, generator)| generator.value_at(index, column.column_type))
            .collect()
    }
}

impl TabularResource for GeneratorResource {
    fn logical_name(&self) -> &str {
        &self.name
    }

    fn connection(&self) -> &str {
        "generator"
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn open_select(&self) -> Result<Box<dyn SelectStream>> {
        Ok(Box::new(GenSelectStream {
            generator: self.clone(),
            cursor: Cursor::new(),
            current: None,
        }))
    }

    fn open_insert(&self, _options: InsertOptions) -> Result<Box<dyn InsertStream>> {
        Err(TabflowError::unsupported(&self.name, "inserting into a generator"))
    }

    /// The number of records the generator will produce.
    fn row_count(&self) -> Result<u64> {
        Ok(self.cap())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

struct GenSelectStream {
    generator: GeneratorResource,
    cursor: Cursor,
    current: Option<Record>,
}

impl SelectStream for GenSelectStream {
    fn advance(&mut self) -> Result<bool> {
        if self.cursor.is_exhausted() {
            return Ok(false);
        }
        let index = self.cursor.position();
        if index >= self.generator.cap() {
            self.current = None;
            self.cursor.finish();
            return Ok(false);
        }
        self.current = Some(self.generator.record_at(index));
        self.cursor.step();
        Ok(true)
    }

    fn value(&self, position: usize) -> Result<Value> {
        self.cursor.require_record(&self.generator.name)?;
        let record = self.current.as_ref().expect("cursor is on a record");
        record.get(position).cloned().ok_or_else(|| {
            TabflowError::stream(
                &self.generator.name,
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
        &self.generator.schema
    }

    fn schema_name(&self) -> String {
        self.generator.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sequence_and_pattern_defaults() {
        let schema = Schema::new(vec![
            Column::new("id", ColumnType::Integer).primary_key(),
            Column::new("label", ColumnType::Text),
        ]);
        let generator = GeneratorResource::from_schema("g", schema, Some(3));
        assert_eq!(generator.record_at(0), vec![json!(1), json!("label-1")]);
        assert_eq!(generator.record_at(2), vec![json!(3), json!("label-3")]);
    }

    #[test]
    fn uniform_stays_in_domain_and_replays() {
        let generator = ColumnGenerator::Uniform { min: 1, max: 5 };
        for index in 0..50 {
            let value = generator.value_at(index, ColumnType::Integer);
            let n = value.as_i64().expect("integer value");
            assert!((1..=5).contains(&n), "value {n} escaped the domain");
            assert_eq!(value, generator.value_at(index, ColumnType::Integer));
        }
    }
}
