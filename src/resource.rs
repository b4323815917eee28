//! The narrow capability the engine requires from anything tabular.
//!
//! A tabular resource is any addressable object the engine can read and/or
//! write as an ordered sequence of records: an in-memory table, a file, a
//! database table, a queue, a generator. The engine only sequences and
//! drives streams; each resource knows how to open its own.

use std::any::Any;
use std::sync::Arc;

use crate::error::Result;
use crate::schema::Schema;
use crate::stream::{InsertOptions, InsertStream, SelectStream};

/// Capability contract for a readable/writable tabular resource.
pub trait TabularResource: Send + Sync {
    /// Stable, storage-independent identifier. Generator-to-target matching
    /// and the loaded-table set key on this.
    fn logical_name(&self) -> &str;

    /// Identifier of the connection/system this resource lives in. A fill
    /// never spans more than one.
    fn connection(&self) -> &str;

    /// The ordered column list and foreign keys.
    fn schema(&self) -> Schema;

    /// Open a pull stream over the records.
    fn open_select(&self) -> Result<Box<dyn SelectStream>>;

    /// Open a batched push stream into the resource.
    fn open_insert(&self, options: InsertOptions) -> Result<Box<dyn InsertStream>>;

    /// Current record count.
    fn row_count(&self) -> Result<u64>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.row_count()? == 0)
    }

    /// Cast to `Any` for downcasting to a concrete resource kind.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a resource. Identity (pointer) equality is the resource
/// equality the engine relies on; name-keyed maps use the logical name.
pub type ResourceHandle = Arc<dyn TabularResource>;
