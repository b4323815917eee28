//! # Tabflow
//!
//! A **data-movement engine** for Rust: read and write tabular resources —
//! in-memory tables, files, queues, generators — through one uniform
//! abstraction, and move records between them while respecting structural
//! dependencies (a child table is populated after its parent).
//!
//! ## Key Features
//!
//! - **Uniform resource contract** - one trait for anything tabular, with a
//!   pull-based select stream and a batched push-based insert stream
//! - **Dependency graph** - creation/deletion orderings with cycle
//!   detection, generic over any node kind that can name its dependencies
//! - **Transfer orchestrator** - drives one select stream into one insert
//!   stream, optionally decoupled through a background producer thread and
//!   a bounded queue
//! - **Fill scheduling** - pairs generators with targets by logical name,
//!   synthesizes schema-bound generators for targets without one, and
//!   sequences foreign-key-dependent fills parents-first
//! - **Table loading** - populates whole foreign-key graphs with synthetic
//!   data, diamond-safe and cycle-checked
//! - **Typed errors** - every failure names the offending resource, table,
//!   or generator
//!
//! ## Quick Start
//!
//! ```
//! use tabflow::*;
//! use serde_json::json;
//!
//! # fn main() -> tabflow::Result<()> {
//! let schema = Schema::new(vec![
//!     Column::new("id", ColumnType::Integer).primary_key(),
//!     Column::new("name", ColumnType::Text),
//! ]);
//!
//! let source = MemoryTable::new("people", schema.clone())
//!     .with_rows(vec![
//!         vec![json!(1), json!("ada")],
//!         vec![json!(2), json!("grace")],
//!     ])?
//!     .into_handle();
//! let target = MemoryTable::new("people_copy", schema).into_handle();
//!
//! let report = Transfer::new(source, target).run()?;
//! assert_eq!(report.rows, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Tabular resources
//!
//! A [`TabularResource`] is any addressable object the engine can read
//! and/or write as an ordered sequence of records. It exposes a stable
//! logical name, a [`Schema`] (ordered columns plus foreign keys), and
//! hands out the two streams on demand. The engine never parses formats or
//! speaks dialects itself — it only sequences and drives the streams a
//! resource already knows how to open.
//!
//! ### The two stream contracts
//!
//! [`SelectStream`] is the pull side: a cursor that starts before the first
//! record, advances one record at a time, and can be reset and re-iterated.
//! [`InsertStream`] is the push side: batched appends with per-batch
//! bookkeeping on a [`StreamListener`], periodic progress lines, and a
//! close that flushes the final partial batch.
//!
//! ### Dependency ordering
//!
//! [`DependencyGraph`] turns any set of nodes implementing
//! [`DependencyNode`] into creation and deletion orderings, failing fast on
//! cycles. The fill scheduler uses it to populate parents before children.
//!
//! ### Moving records
//!
//! [`Transfer`] drives one source into one target. `run` stays on the
//! calling thread; `run_decoupled` puts the producer on its own thread
//! behind a bounded FIFO [`QueueTable`] so a slow source and a slow target
//! don't block each other.
//!
//! ### Generating data
//!
//! [`GeneratorResource`] manufactures synthetic records from per-column
//! [`ColumnGenerator`]s. [`FillPlanner`] resolves which generator feeds
//! which target; [`TableLoader`] walks foreign keys to populate a whole
//! table graph.
//!
//! ## Module Overview
//!
//! - [`resource`] - the tabular-resource capability contract
//! - [`stream`] - select/insert contracts and shared cursor/batch state
//! - [`graph`] - the generic dependency graph
//! - [`transfer`] - the transfer orchestrator and producer thread
//! - [`fill`] - record-level generator-to-target resolution
//! - [`loader`] - table-level foreign-key-ordered population
//! - [`generator`] - synthetic-record resources
//! - [`memory`], [`queue`] - in-memory and queue-shaped resources
//! - [`io`] - file-backed resources (feature-gated)
//! - [`catalog`] - resource registry and name selectors
//! - [`config`] - typed options consumed from step definitions
//! - [`testing`] - builders and fixtures shared by the tests

pub mod catalog;
pub mod config;
pub mod error;
pub mod fill;
pub mod generator;
pub mod graph;
pub mod io;
pub mod loader;
pub mod memory;
pub mod queue;
pub mod resource;
pub mod schema;
pub mod stream;
pub mod testing;
pub mod transfer;

/// A single column value. Records are ordered vectors of these, matching
/// the schema's column order.
pub type Value = serde_json::Value;

/// One ordered record.
pub type Record = Vec<Value>;

// General re-exports
pub use catalog::{Catalog, Selection, Selector};
pub use config::{FillOptions, ProcessingType, StreamGranularity};
pub use error::{Result, TabflowError};
pub use fill::{FillPair, FillPlan, FillPlanner};
pub use generator::{ColumnGenerator, GeneratorResource};
pub use graph::{DependencyGraph, DependencyNode};
pub use loader::{LoadReport, TableLoader, TableOverride};
pub use memory::MemoryTable;
pub use queue::QueueTable;
pub use resource::{ResourceHandle, TabularResource};
pub use schema::{Column, ColumnType, ForeignKey, Schema};
pub use stream::{InsertOptions, InsertStream, SelectStream, StreamListener};
pub use transfer::{Transfer, TransferOptions, TransferReport};

// Gated re-exports
#[cfg(feature = "io-csv")]
pub use io::csv::CsvTable;
