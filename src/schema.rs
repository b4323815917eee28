//! Column model shared by every tabular resource.
//!
//! A [`Schema`] is an ordered column list plus the foreign keys that tie the
//! resource to other resources' primary keys. Column positions are 0-based
//! throughout the crate; the select/insert contracts read and write records
//! as ordered vectors matching this column order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TabflowError};
use crate::Value;

/// The value domain a column accepts.
///
/// `Value::Null` passes every check; nullability is not modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    Integer,
    Float,
    Text,
}

impl ColumnType {
    /// Whether `value` fits this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ColumnType::Boolean, Value::Bool(_)) => true,
            (ColumnType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            // An integer widens into a float column.
            (ColumnType::Float, Value::Number(_)) => true,
            (ColumnType::Text, Value::String(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Boolean => "boolean",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
        };
        f.write_str(s)
    }
}

/// One column of a schema. The position is the index in [`Schema::columns`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(default)]
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
        }
    }

    /// Mark this column as (part of) the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

/// A single-column foreign key: `column` references `parent_column` of the
/// resource whose logical name is `parent_table`.
///
/// Multi-column relationships are not supported, matching the generation
/// machinery downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub parent_table: String,
    pub parent_column: String,
}

impl ForeignKey {
    pub fn new(
        column: impl Into<String>,
        parent_table: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            parent_table: parent_table.into(),
            parent_column: parent_column.into(),
        }
    }
}

/// Ordered column list plus foreign keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// An empty schema (zero columns). A fill target with an empty schema
    /// cannot receive a synthesized generator.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            foreign_keys: Vec::new(),
        }
    }

    /// Append a column.
    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Append a foreign key.
    #[must_use]
    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// 0-based position of the named column.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// The columns flagged as primary key.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Check one value against the column at `position`.
    pub fn check(&self, resource: &str, position: usize, value: &Value) -> Result<()> {
        let column = self.columns.get(position).ok_or_else(|| {
            TabflowError::stream(
                resource,
                format!(
                    "the column position ({position}) does not exist; the resource has ({}) columns",
                    self.columns.len()
                ),
            )
        })?;
        if column.column_type.accepts(value) {
            Ok(())
        } else {
            Err(TabflowError::SchemaMismatch {
                resource: resource.to_string(),
                column: column.name.clone(),
                expected: column.column_type.to_string(),
                value: value.to_string(),
            })
        }
    }

    /// Check an entire record, column by column.
    pub fn check_record(&self, resource: &str, record: &[Value]) -> Result<()> {
        if record.len() != self.columns.len() {
            return Err(TabflowError::stream(
                resource,
                format!(
                    "the record has ({}) values but the resource declares ({}) columns",
                    record.len(),
                    self.columns.len()
                ),
            ));
        }
        for (position, value) in record.iter().enumerate() {
            self.check(resource, position, value)?;
        }
        Ok(())
    }
}
