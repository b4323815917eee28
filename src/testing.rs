//! Shared builders and fixtures for the integration tests.
//!
//! Everything here is ordinary public API usage: a handful of schemas and
//! pre-seeded tables that the tests (and doc examples) keep reaching for.

use serde_json::json;

use crate::error::Result;
use crate::memory::MemoryTable;
use crate::resource::ResourceHandle;
use crate::schema::{Column, ColumnType, ForeignKey, Schema};
use crate::Record;

/// `id integer (pk), name text, score float`
pub fn people_schema() -> Schema {
    Schema::new(vec![
        Column::new("id", ColumnType::Integer).primary_key(),
        Column::new("name", ColumnType::Text),
        Column::new("score", ColumnType::Float),
    ])
}

/// Three people rows matching [`people_schema`].
pub fn people_rows() -> Vec<Record> {
    vec![
        vec![json!(1), json!("ada"), json!(9.5)],
        vec![json!(2), json!("grace"), json!(8.0)],
        vec![json!(3), json!("edsger"), json!(7.25)],
    ]
}

/// A seeded in-memory `people` table.
pub fn people_table() -> Result<ResourceHandle> {
    Ok(MemoryTable::new("people", people_schema())
        .with_rows(people_rows())?
        .into_handle())
}

/// An empty in-memory table with the given name and schema.
pub fn empty_table(name: &str, schema: Schema) -> ResourceHandle {
    MemoryTable::new(name, schema).into_handle()
}

/// `customers (id pk, name)` — the parent side of the classic pair.
pub fn customers_schema() -> Schema {
    Schema::new(vec![
        Column::new("id", ColumnType::Integer).primary_key(),
        Column::new("name", ColumnType::Text),
    ])
}

/// `orders (id pk, customer_id -> customers.id, amount)`.
pub fn orders_schema() -> Schema {
    Schema::new(vec![
        Column::new("id", ColumnType::Integer).primary_key(),
        Column::new("customer_id", ColumnType::Integer),
        Column::new("amount", ColumnType::Float),
    ])
    .with_foreign_key(ForeignKey::new("customer_id", "customers", "id"))
}
